use anyhow::{Context, anyhow};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::errors::{ErrorContext, QuizError};
use crate::models::{Difficulty, Question, QuestionKind};
use crate::{log_service_success, log_validation};

const BUILTIN_QUESTIONS: &str = include_str!("../data/questions.json");

/// Read-only, ordered collection of validated questions
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank after checking every record
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        Self::validated(questions).map_err(|err| source_error("question_bank.new", err))
    }

    /// The ten-question bank shipped with the game
    pub fn builtin() -> Result<Self, QuizError> {
        Self::parse(BUILTIN_QUESTIONS)
            .context("built-in question bank is corrupt")
            .map_err(|err| source_error("question_bank.builtin", err))
    }

    pub fn from_json_str(json: &str) -> Result<Self, QuizError> {
        Self::parse(json).map_err(|err| source_error("question_bank.from_json_str", err))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let bank = Self::read(path).map_err(|err| source_error("question_bank.from_path", err))?;
        log_service_success!(
            "question_bank",
            "load",
            format!("loaded {} questions from {}", bank.len(), path.display())
        );
        Ok(bank)
    }

    fn validated(questions: Vec<Question>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(anyhow!("duplicate question id {}", question.id));
            }
            validate_question(question)
                .with_context(|| format!("question {} is invalid", question.id))?;
        }

        log_validation!(success, "question_bank", format!("{} questions valid", questions.len()));
        Ok(Self { questions })
    }

    fn parse(json: &str) -> anyhow::Result<Self> {
        let questions: Vec<Question> =
            serde_json::from_str(json).context("failed to parse question bank JSON")?;
        Self::validated(questions)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank {}", path.display()))?;
        Self::parse(&json)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions of one tier, in bank order
    pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .cloned()
            .collect()
    }

    pub fn count_by_difficulty(&self) -> BTreeMap<Difficulty, usize> {
        let mut counts: BTreeMap<Difficulty, usize> =
            Difficulty::ALL.iter().map(|&d| (d, 0)).collect();
        for question in &self.questions {
            *counts.entry(question.difficulty).or_insert(0) += 1;
        }
        counts
    }
}

fn validate_question(question: &Question) -> anyhow::Result<()> {
    if question.prompt.trim().is_empty() {
        return Err(anyhow!("prompt is empty"));
    }

    match &question.kind {
        QuestionKind::Single {
            options,
            correct_index,
        } => {
            if options.len() < 2 {
                return Err(anyhow!("single-choice question needs at least 2 options"));
            }
            if *correct_index >= options.len() {
                return Err(anyhow!(
                    "correct_index {} out of range for {} options",
                    correct_index,
                    options.len()
                ));
            }
        }
        QuestionKind::Multi {
            options,
            correct_indices,
        } => {
            if options.is_empty() {
                return Err(anyhow!("multi-choice question has no options"));
            }
            if correct_indices.is_empty() {
                return Err(anyhow!("multi-choice question has no correct indices"));
            }
            if let Some(bad) = correct_indices.iter().find(|&&i| i >= options.len()) {
                return Err(anyhow!(
                    "correct index {} out of range for {} options",
                    bad,
                    options.len()
                ));
            }
        }
        QuestionKind::Fill { correct_text } => {
            if correct_text.trim().is_empty() {
                return Err(anyhow!("fill-in question has empty correct_text"));
            }
        }
    }

    Ok(())
}

/// Wrap a load failure as a data-source error and log it
fn source_error(operation: &str, err: anyhow::Error) -> QuizError {
    QuizError::from(err).log_with_context(ErrorContext::new(operation))
}

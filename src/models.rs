use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific part of a question; exactly one answer shape per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Single {
        options: Vec<String>,
        correct_index: usize,
    },
    Multi {
        options: Vec<String>,
        correct_indices: BTreeSet<usize>,
    },
    Fill {
        correct_text: String,
    },
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::Single { .. } => "single",
            QuestionKind::Multi { .. } => "multi",
            QuestionKind::Fill { .. } => "fill",
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::Single { options, .. } | QuestionKind::Multi { options, .. } => {
                Some(options)
            }
            QuestionKind::Fill { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub explanation: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// A question as presented in one session, with options possibly reordered.
///
/// `option_origin[i]` is the index in the source question of the option now shown at `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub question: Question,
    pub option_origin: Vec<usize>,
}

impl SessionQuestion {
    pub fn id(&self) -> u32 {
        self.question.id
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.question.kind
    }
}

/// A value submitted by the player; its shape must match the question kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AnswerValue {
    Single(usize),
    Multi(BTreeSet<usize>),
    Fill(String),
}

impl AnswerValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnswerValue::Single(_) => "single",
            AnswerValue::Multi(_) => "multi",
            AnswerValue::Fill(_) => "fill",
        }
    }
}

/// One stored answer per position. `submitted` is `None` when the timer ran out untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: u32,
    pub submitted: Option<AnswerValue>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HintResult {
    /// Wrong options that can be ruled out
    EliminatedOptions(Vec<String>),
    /// One of the correct options
    RevealedOption(String),
    /// Leading character of the expected text
    FirstCharacter(char),
}

impl fmt::Display for HintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HintResult::EliminatedOptions(options) => {
                write!(f, "Hint: The answer is NOT {}.", options.join(" or "))
            }
            HintResult::RevealedOption(option) => {
                write!(f, "Hint: {} is one of the correct answers.", option)
            }
            HintResult::FirstCharacter(c) => write!(f, "Hint: The answer starts with \"{}\".", c),
        }
    }
}

/// How the questions for a session are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionPolicy {
    SingleDifficulty { difficulty: Difficulty },
    Distribution { easy: usize, medium: usize, hard: usize },
    /// Whole bank, shuffled, regardless of difficulty
    Retake,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::SingleDifficulty { difficulty } => write!(f, "{}", difficulty),
            SelectionPolicy::Distribution { .. } => f.write_str("Mixed"),
            SelectionPolicy::Retake => f.write_str("Retake"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
}

impl Tier {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Tier::Gold
        } else if percentage >= 60.0 {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Tier::Gold => "Outstanding performance",
            Tier::Silver => "Good effort",
            Tier::Bronze => "Keep practicing",
        }
    }

    /// Gold results get the celebration treatment in the front end
    pub fn celebrate(&self) -> bool {
        matches!(self, Tier::Gold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub total: usize,
    pub hints_used: usize,
    pub penalty: f64,
    pub raw_score: f64,
    pub percentage: f64,
    pub tier: Tier,
}

impl ScoreResult {
    pub fn summary(&self) -> String {
        format!("{:.1}/{}", self.raw_score, self.total)
    }
}

/// Rendered answer text and its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedAnswer {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub position: usize,
    pub question_id: u32,
    pub prompt: String,
    pub image_ref: Option<String>,
    pub explanation: String,
    pub user_answer: RenderedAnswer,
    pub correct_answer: String,
    #[serde(skip)]
    pub warnings: Vec<crate::errors::DataIntegrityWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Ticked {
        remaining: u32,
    },
    /// Time ran out; the session has already advanced
    Expired {
        timed_out_position: usize,
        advance: Advance,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { position: usize },
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_json_shape() {
        let value = json!({
            "id": 4,
            "type": "multi",
            "prompt": "Which of the following are primary colors?",
            "difficulty": "medium",
            "explanation": "Red, Blue and Yellow.",
            "options": ["Red", "Green", "Blue", "Yellow"],
            "correct_indices": [0, 2, 3]
        });

        let question: Question = serde_json::from_value(value).unwrap();
        assert_eq!(question.difficulty, Difficulty::Medium);
        assert_eq!(question.image_ref, None);
        match &question.kind {
            QuestionKind::Multi { options, correct_indices } => {
                assert_eq!(options.len(), 4);
                assert_eq!(correct_indices.iter().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
            }
            other => panic!("expected multi question, got {:?}", other),
        }
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::from_percentage(100.0), Tier::Gold);
        assert_eq!(Tier::from_percentage(80.0), Tier::Gold);
        assert_eq!(Tier::from_percentage(79.9), Tier::Silver);
        assert_eq!(Tier::from_percentage(60.0), Tier::Silver);
        assert_eq!(Tier::from_percentage(59.9), Tier::Bronze);
        assert_eq!(Tier::from_percentage(0.0), Tier::Bronze);
        assert!(Tier::Gold.celebrate());
        assert!(!Tier::Silver.celebrate());
    }

    #[test]
    fn test_hint_display() {
        let hint = HintResult::EliminatedOptions(vec!["London".into(), "Berlin".into()]);
        assert_eq!(hint.to_string(), "Hint: The answer is NOT London or Berlin.");
        assert_eq!(
            HintResult::FirstCharacter('P').to_string(),
            "Hint: The answer starts with \"P\"."
        );
    }

    #[test]
    fn test_policy_labels() {
        let policy = SelectionPolicy::SingleDifficulty { difficulty: Difficulty::Hard };
        assert_eq!(policy.to_string(), "Hard");
        let mixed = SelectionPolicy::Distribution { easy: 3, medium: 4, hard: 3 };
        assert_eq!(mixed.to_string(), "Mixed");
    }
}

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::errors::{ErrorContext, QuizError};
use crate::log_session_event;
use crate::models::{
    Advance, AnswerRecord, AnswerValue, HintResult, Question, QuestionKind, ScoreResult,
    SelectionPolicy, SessionQuestion, SessionState, TimerEvent,
};
use crate::question_bank::QuestionBank;
use crate::scorer;
use crate::selector::select_questions;
use crate::shuffler::shuffle_options_preserving_answer;

/// One attempt at a quiz: the question sequence, the answer log, hints and the countdown.
///
/// The session is driven by discrete events from a single owner. Positions only move
/// forward, and each position's options are shuffled once, the first time it is loaded.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: QuizConfig,
    rng: StdRng,
    state: SessionState,
    player_name: String,
    policy: Option<SelectionPolicy>,
    source: Vec<Question>,
    loaded: Vec<Option<SessionQuestion>>,
    current_index: usize,
    answers: BTreeMap<usize, AnswerRecord>,
    hinted_positions: BTreeSet<usize>,
    time_remaining: Option<u32>,
    final_score: Option<ScoreResult>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(config: QuizConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic session, used by tests and replays
    pub fn seeded(config: QuizConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: QuizConfig, rng: StdRng) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            rng,
            state: SessionState::NotStarted,
            player_name: String::new(),
            policy: None,
            source: Vec::new(),
            loaded: Vec::new(),
            current_index: 0,
            answers: BTreeMap::new(),
            hinted_positions: BTreeSet::new(),
            time_remaining: None,
            final_score: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Select the questions and move to the first position
    pub fn start(
        &mut self,
        player_name: &str,
        policy: SelectionPolicy,
        bank: &QuestionBank,
    ) -> Result<(), QuizError> {
        if self.state != SessionState::NotStarted {
            return Err(self.reject(
                "start",
                QuizError::invalid_operation("session has already been started"),
            ));
        }

        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(self.reject(
                "start",
                QuizError::validation("player name must not be empty"),
            ));
        }

        let questions = select_questions(bank, &policy, &mut self.rng);
        if questions.is_empty() {
            return Err(self.reject(
                "start",
                QuizError::validation(format!("no questions available for {}", policy)),
            ));
        }

        self.player_name = player_name.to_string();
        self.policy = Some(policy);
        self.loaded = vec![None; questions.len()];
        self.source = questions;
        self.current_index = 0;
        self.answers.clear();
        self.hinted_positions.clear();
        self.time_remaining = None;
        self.final_score = None;
        self.started_at = Some(Utc::now());
        self.state = SessionState::InProgress;

        log_session_event!(
            "start",
            session_id = self.id,
            format!("{} questions selected ({})", self.source.len(), policy)
        );
        Ok(())
    }

    /// Present the current position, shuffling it on first visit, and restart its countdown
    pub fn load_current(&mut self) -> Result<&SessionQuestion, QuizError> {
        self.ensure_in_progress("load_current")?;

        let position = self.current_index;
        self.time_remaining = Some(self.config.seconds_per_question);

        let source = &self.source[position];
        let rng = &mut self.rng;
        let question = self.loaded[position]
            .get_or_insert_with(|| shuffle_options_preserving_answer(source, rng));

        log_session_event!(
            "load_current",
            session_id = self.id,
            position = position,
            format!("question {} presented", question.id())
        );
        Ok(question)
    }

    /// Record (or overwrite) the answer for the current position and return whether it is correct
    pub fn submit_answer(&mut self, value: AnswerValue) -> Result<bool, QuizError> {
        let position = self.current_index;
        let question = self.loaded_current("submit_answer")?;
        let question_id = question.id();

        let (stored, is_correct) = match evaluate(question.kind(), value) {
            Ok(result) => result,
            Err(err) => return Err(self.reject("submit_answer", err)),
        };

        self.answers.insert(
            position,
            AnswerRecord {
                question_id,
                submitted: Some(stored),
                is_correct,
            },
        );

        log_session_event!(
            "submit_answer",
            session_id = self.id,
            position = position,
            format!("answer recorded, correct = {}", is_correct)
        );
        Ok(is_correct)
    }

    /// Spend the hint for the current position
    pub fn use_hint(&mut self) -> Result<HintResult, QuizError> {
        let position = self.current_index;
        self.loaded_current("use_hint")?;

        if self.hinted_positions.contains(&position) {
            return Err(self.reject(
                "use_hint",
                QuizError::invalid_operation("hint already used for this question"),
            ));
        }

        let hint = match self.loaded[position].as_ref() {
            Some(question) => generate_hint(question.kind(), &mut self.rng),
            None => Err(QuizError::invalid_operation("no question loaded")),
        };
        let hint = hint.map_err(|err| self.reject("use_hint", err))?;

        self.hinted_positions.insert(position);
        log_session_event!(
            "use_hint",
            session_id = self.id,
            position = position,
            format!("hint used ({} total)", self.hinted_positions.len())
        );
        Ok(hint)
    }

    /// One unit of countdown. At zero an unanswered position is recorded as missed and
    /// the session advances.
    pub fn tick(&mut self) -> Result<TimerEvent, QuizError> {
        self.ensure_in_progress("tick")?;

        let Some(remaining) = self.time_remaining else {
            return Err(self.reject(
                "tick",
                QuizError::invalid_operation("no question timer is running"),
            ));
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.time_remaining = Some(remaining);
            return Ok(TimerEvent::Ticked { remaining });
        }

        let position = self.current_index;
        if !self.answers.contains_key(&position) {
            let question_id = self.source[position].id;
            self.answers.insert(
                position,
                AnswerRecord {
                    question_id,
                    submitted: None,
                    is_correct: false,
                },
            );
        }

        log_session_event!(
            "tick",
            session_id = self.id,
            position = position,
            "time expired"
        );
        let advance = self.advance()?;
        Ok(TimerEvent::Expired {
            timed_out_position: position,
            advance,
        })
    }

    /// Leave the current position. Leaving the last one completes the session and scores it.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        self.ensure_in_progress("advance")?;
        self.time_remaining = None;

        if self.current_index + 1 >= self.source.len() {
            self.current_index = self.source.len();
            self.state = SessionState::Completed;
            self.completed_at = Some(Utc::now());

            let result = scorer::tally(
                &self.answers,
                &self.hinted_positions,
                self.source.len(),
                self.config.hint_penalty,
            );
            log_session_event!(
                "advance",
                session_id = self.id,
                format!("completed with {} ({:?})", result.summary(), result.tier)
            );
            self.final_score = Some(result);
            return Ok(Advance::Completed);
        }

        self.current_index += 1;
        log_session_event!(
            "advance",
            session_id = self.id,
            position = self.current_index,
            "moved to next question"
        );
        Ok(Advance::Next {
            position: self.current_index,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn policy(&self) -> Option<SelectionPolicy> {
        self.policy
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The loaded question at the current position, if any
    pub fn current_question(&self) -> Option<&SessionQuestion> {
        if self.state != SessionState::InProgress {
            return None;
        }
        self.loaded.get(self.current_index)?.as_ref()
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    pub fn is_hinted(&self, position: usize) -> bool {
        self.hinted_positions.contains(&position)
    }

    pub fn hinted_positions(&self) -> &BTreeSet<usize> {
        &self.hinted_positions
    }

    pub fn hints_used(&self) -> usize {
        self.hinted_positions.len()
    }

    pub fn answer(&self, position: usize) -> Option<&AnswerRecord> {
        self.answers.get(&position)
    }

    pub fn answers(&self) -> &BTreeMap<usize, AnswerRecord> {
        &self.answers
    }

    /// Fraction of positions already left behind, for a progress bar
    pub fn progress(&self) -> f64 {
        if self.source.is_empty() {
            return 0.0;
        }
        self.current_index as f64 / self.source.len() as f64
    }

    pub fn final_score(&self) -> Option<&ScoreResult> {
        self.final_score.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The question as the player saw it at each position; never-loaded positions fall
    /// back to the unshuffled source.
    pub fn presented_questions(&self) -> Vec<&Question> {
        self.source
            .iter()
            .zip(&self.loaded)
            .map(|(source, loaded)| loaded.as_ref().map(|q| &q.question).unwrap_or(source))
            .collect()
    }

    fn ensure_in_progress(&self, operation: &str) -> Result<(), QuizError> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::NotStarted => Err(self.reject(
                operation,
                QuizError::invalid_operation("session has not been started"),
            )),
            SessionState::Completed => Err(self.reject(
                operation,
                QuizError::invalid_operation("session is already completed"),
            )),
        }
    }

    fn loaded_current(&self, operation: &str) -> Result<&SessionQuestion, QuizError> {
        self.ensure_in_progress(operation)?;
        match self.loaded.get(self.current_index).and_then(Option::as_ref) {
            Some(question) => Ok(question),
            None => Err(self.reject(
                operation,
                QuizError::invalid_operation("no question loaded at the current position"),
            )),
        }
    }

    fn reject(&self, operation: &str, error: QuizError) -> QuizError {
        error.log_with_context(
            ErrorContext::new(operation)
                .with_session(self.id)
                .with_position(self.current_index),
        )
    }
}

/// Check the submitted shape against the question and grade it
fn evaluate(kind: &QuestionKind, value: AnswerValue) -> Result<(AnswerValue, bool), QuizError> {
    match (kind, value) {
        (
            QuestionKind::Single {
                options,
                correct_index,
            },
            AnswerValue::Single(index),
        ) => {
            if index >= options.len() {
                return Err(QuizError::validation(format!(
                    "option {} does not exist ({} options)",
                    index,
                    options.len()
                )));
            }
            Ok((AnswerValue::Single(index), index == *correct_index))
        }
        (
            QuestionKind::Multi {
                options,
                correct_indices,
            },
            AnswerValue::Multi(selected),
        ) => {
            if let Some(bad) = selected.iter().find(|&&i| i >= options.len()) {
                return Err(QuizError::validation(format!(
                    "option {} does not exist ({} options)",
                    bad,
                    options.len()
                )));
            }
            let is_correct = selected == *correct_indices;
            Ok((AnswerValue::Multi(selected), is_correct))
        }
        (QuestionKind::Fill { correct_text }, AnswerValue::Fill(text)) => {
            let text = text.trim().to_string();
            let is_correct = text.to_lowercase() == correct_text.trim().to_lowercase();
            Ok((AnswerValue::Fill(text), is_correct))
        }
        (kind, value) => Err(QuizError::validation(format!(
            "{} answer submitted for a {} question",
            value.kind_name(),
            kind.name()
        ))),
    }
}

fn generate_hint(kind: &QuestionKind, rng: &mut StdRng) -> Result<HintResult, QuizError> {
    match kind {
        QuestionKind::Single {
            options,
            correct_index,
        } => {
            let wrong: Vec<&String> = options
                .iter()
                .enumerate()
                .filter(|(i, _)| i != correct_index)
                .map(|(_, text)| text)
                .collect();
            let eliminated = wrong
                .choose_multiple(rng, 2)
                .map(|text| (*text).clone())
                .collect();
            Ok(HintResult::EliminatedOptions(eliminated))
        }
        QuestionKind::Multi {
            options,
            correct_indices,
        } => {
            let correct: Vec<usize> = correct_indices.iter().copied().collect();
            correct
                .choose(rng)
                .and_then(|&i| options.get(i))
                .map(|text| HintResult::RevealedOption(text.clone()))
                .ok_or_else(|| QuizError::validation("question has no usable correct option"))
        }
        QuestionKind::Fill { correct_text } => correct_text
            .trim()
            .chars()
            .next()
            .map(HintResult::FirstCharacter)
            .ok_or_else(|| QuizError::validation("question has an empty correct answer")),
    }
}

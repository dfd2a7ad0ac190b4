use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{ErrorContext, QuizError};
use crate::models::{AnswerRecord, ScoreResult, SessionState, Tier};
use crate::session::Session;

/// Score a completed session from its answer log and hint set.
///
/// Pure and repeatable: nothing in the session is modified.
pub fn score(session: &Session) -> Result<ScoreResult, QuizError> {
    if session.state() != SessionState::Completed {
        return Err(QuizError::invalid_operation("session is not completed")
            .log_with_context(ErrorContext::new("score").with_session(session.id())));
    }

    Ok(tally(
        session.answers(),
        session.hinted_positions(),
        session.len(),
        session.config().hint_penalty,
    ))
}

pub fn tally(
    answers: &BTreeMap<usize, AnswerRecord>,
    hinted_positions: &BTreeSet<usize>,
    total: usize,
    penalty_per_hint: f64,
) -> ScoreResult {
    let correct_count = answers.values().filter(|record| record.is_correct).count();
    let hints_used = hinted_positions.len();
    let penalty = penalty_per_hint * hints_used as f64;
    let raw_score = (correct_count as f64 - penalty).max(0.0);
    let percentage = if total == 0 {
        0.0
    } else {
        raw_score / total as f64 * 100.0
    };

    ScoreResult {
        correct_count,
        total,
        hints_used,
        penalty,
        raw_score,
        percentage,
        tier: Tier::from_percentage(percentage),
    }
}

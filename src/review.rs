use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::{DataIntegrityWarning, ErrorContext, QuizError};
use crate::models::{
    AnswerRecord, AnswerValue, Question, QuestionKind, RenderedAnswer, ReviewEntry, SessionState,
};
use crate::session::Session;

pub const NO_ANSWER: &str = "No answer provided";
pub const INVALID_SELECTION: &str = "Invalid selection";
pub const INVALID_QUESTION_DATA: &str = "Invalid answer in question data";

/// Rebuild what was asked, what was answered and what was correct for every position
pub fn build_review(session: &Session) -> Result<Vec<ReviewEntry>, QuizError> {
    if session.state() != SessionState::Completed {
        return Err(QuizError::invalid_operation("review is only available after completion")
            .log_with_context(ErrorContext::new("build_review").with_session(session.id())));
    }

    Ok(build_entries(&session.presented_questions(), session.answers()))
}

/// Assemble review entries from raw data. Malformed records degrade to fallback text.
pub fn build_entries(
    questions: &[&Question],
    answers: &BTreeMap<usize, AnswerRecord>,
) -> Vec<ReviewEntry> {
    questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let mut warnings = Vec::new();
            let record = answers.get(&position);
            let user_answer = render_user_answer(&question.kind, record, &mut warnings);
            let correct_answer = render_correct_answer(&question.kind, &mut warnings);

            for warning in &warnings {
                warn!(
                    component = "review",
                    position = position,
                    question_id = question.id,
                    warning = %warning,
                    "Data integrity warning"
                );
            }

            ReviewEntry {
                position,
                question_id: question.id,
                prompt: question.prompt.clone(),
                image_ref: question.image_ref.clone(),
                explanation: question.explanation.clone(),
                user_answer,
                correct_answer,
                warnings,
            }
        })
        .collect()
}

fn render_user_answer(
    kind: &QuestionKind,
    record: Option<&AnswerRecord>,
    warnings: &mut Vec<DataIntegrityWarning>,
) -> RenderedAnswer {
    let Some(record) = record else {
        return no_answer();
    };
    let Some(value) = &record.submitted else {
        return no_answer();
    };

    let text = match (kind, value) {
        (QuestionKind::Single { options, .. }, AnswerValue::Single(index)) => {
            match options.get(*index) {
                Some(text) => text.clone(),
                None => {
                    warnings.push(DataIntegrityWarning::AnswerOutOfRange {
                        index: *index,
                        option_count: options.len(),
                    });
                    return no_answer();
                }
            }
        }
        (QuestionKind::Multi { options, .. }, AnswerValue::Multi(selected)) => {
            if selected.is_empty() {
                return no_answer();
            }
            let mut texts = Vec::new();
            for &index in selected {
                match options.get(index) {
                    Some(text) => texts.push(text.as_str()),
                    None => warnings.push(DataIntegrityWarning::AnswerOutOfRange {
                        index,
                        option_count: options.len(),
                    }),
                }
            }
            if texts.is_empty() {
                INVALID_SELECTION.to_string()
            } else {
                texts.join(", ")
            }
        }
        (QuestionKind::Fill { .. }, AnswerValue::Fill(text)) => {
            if text.trim().is_empty() {
                return no_answer();
            }
            text.clone()
        }
        _ => {
            warnings.push(DataIntegrityWarning::AnswerMalformed);
            return no_answer();
        }
    };

    RenderedAnswer {
        text,
        is_correct: record.is_correct,
    }
}

fn render_correct_answer(kind: &QuestionKind, warnings: &mut Vec<DataIntegrityWarning>) -> String {
    match kind {
        QuestionKind::Single {
            options,
            correct_index,
        } => match options.get(*correct_index) {
            Some(text) => text.clone(),
            None => {
                warnings.push(DataIntegrityWarning::CorrectAnswerOutOfRange {
                    index: *correct_index,
                    option_count: options.len(),
                });
                INVALID_QUESTION_DATA.to_string()
            }
        },
        QuestionKind::Multi {
            options,
            correct_indices,
        } => {
            if correct_indices.is_empty() {
                warnings.push(DataIntegrityWarning::CorrectAnswerMissing);
                return INVALID_QUESTION_DATA.to_string();
            }
            let mut texts = Vec::new();
            for &index in correct_indices {
                match options.get(index) {
                    Some(text) => texts.push(text.as_str()),
                    None => warnings.push(DataIntegrityWarning::CorrectAnswerOutOfRange {
                        index,
                        option_count: options.len(),
                    }),
                }
            }
            if texts.is_empty() {
                INVALID_QUESTION_DATA.to_string()
            } else {
                texts.join(", ")
            }
        }
        QuestionKind::Fill { correct_text } => {
            if correct_text.trim().is_empty() {
                warnings.push(DataIntegrityWarning::CorrectAnswerMissing);
                INVALID_QUESTION_DATA.to_string()
            } else {
                correct_text.clone()
            }
        }
    }
}

fn no_answer() -> RenderedAnswer {
    RenderedAnswer {
        text: NO_ANSWER.to_string(),
        is_correct: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: 42,
            prompt: "prompt".to_string(),
            image_ref: Some("img.png".to_string()),
            difficulty: Difficulty::Medium,
            explanation: "because".to_string(),
            kind,
        }
    }

    fn record(submitted: Option<AnswerValue>, is_correct: bool) -> AnswerRecord {
        AnswerRecord {
            question_id: 42,
            submitted,
            is_correct,
        }
    }

    fn options() -> Vec<String> {
        ["Red", "Green", "Blue", "Yellow"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_absent_record_and_timeout_record_render_alike() {
        let q = question(QuestionKind::Single {
            options: options(),
            correct_index: 2,
        });
        let mut answers = BTreeMap::new();
        answers.insert(1, record(None, false));

        let entries = build_entries(&[&q, &q], &answers);
        assert_eq!(entries[0].user_answer.text, NO_ANSWER);
        assert_eq!(entries[1].user_answer.text, NO_ANSWER);
        assert!(!entries[0].user_answer.is_correct);
        assert_eq!(entries[0].correct_answer, "Blue");
        assert_eq!(entries[0].image_ref.as_deref(), Some("img.png"));
        assert_eq!(entries[0].explanation, "because");
    }

    #[test]
    fn test_out_of_range_answer_falls_back() {
        let q = question(QuestionKind::Single {
            options: options(),
            correct_index: 2,
        });
        let mut answers = BTreeMap::new();
        answers.insert(0, record(Some(AnswerValue::Single(9)), true));

        let entries = build_entries(&[&q], &answers);
        assert_eq!(entries[0].user_answer.text, NO_ANSWER);
        assert!(!entries[0].user_answer.is_correct);
        assert_eq!(
            entries[0].warnings,
            vec![DataIntegrityWarning::AnswerOutOfRange {
                index: 9,
                option_count: 4
            }]
        );
    }

    #[test]
    fn test_invalid_correct_index_does_not_panic() {
        let q = question(QuestionKind::Single {
            options: options(),
            correct_index: 12,
        });
        let entries = build_entries(&[&q], &BTreeMap::new());
        assert_eq!(entries[0].correct_answer, INVALID_QUESTION_DATA);
        assert_eq!(entries[0].warnings.len(), 1);
    }

    #[test]
    fn test_multi_correct_indices_all_out_of_range() {
        let q = question(QuestionKind::Multi {
            options: options(),
            correct_indices: [5, 9].into_iter().collect(),
        });
        let entries = build_entries(&[&q], &BTreeMap::new());
        assert_eq!(entries[0].correct_answer, INVALID_QUESTION_DATA);
        assert_eq!(entries[0].user_answer.text, NO_ANSWER);
        assert_eq!(
            entries[0].warnings,
            vec![
                DataIntegrityWarning::CorrectAnswerOutOfRange {
                    index: 5,
                    option_count: 4
                },
                DataIntegrityWarning::CorrectAnswerOutOfRange {
                    index: 9,
                    option_count: 4
                },
            ]
        );
    }

    #[test]
    fn test_multi_partially_out_of_range_keeps_valid_texts() {
        let q = question(QuestionKind::Multi {
            options: options(),
            correct_indices: [1, 6].into_iter().collect(),
        });
        let entries = build_entries(&[&q], &BTreeMap::new());
        assert_eq!(entries[0].correct_answer, "Green");
        assert_eq!(entries[0].warnings.len(), 1);
    }

    #[test]
    fn test_multi_without_correct_indices() {
        let q = question(QuestionKind::Multi {
            options: options(),
            correct_indices: Default::default(),
        });
        let entries = build_entries(&[&q], &BTreeMap::new());
        assert_eq!(entries[0].correct_answer, INVALID_QUESTION_DATA);
        assert_eq!(entries[0].warnings, vec![DataIntegrityWarning::CorrectAnswerMissing]);
    }

    #[test]
    fn test_fill_with_blank_correct_text() {
        let q = question(QuestionKind::Fill {
            correct_text: "  ".to_string(),
        });
        let mut answers = BTreeMap::new();
        answers.insert(0, record(Some(AnswerValue::Fill("guess".to_string())), false));

        let entries = build_entries(&[&q], &answers);
        assert_eq!(entries[0].correct_answer, INVALID_QUESTION_DATA);
        assert_eq!(entries[0].user_answer.text, "guess");
        assert_eq!(entries[0].warnings, vec![DataIntegrityWarning::CorrectAnswerMissing]);
    }

    #[test]
    fn test_multi_rendering() {
        let q = question(QuestionKind::Multi {
            options: options(),
            correct_indices: [0, 2, 3].into_iter().collect(),
        });
        let mut answers = BTreeMap::new();
        answers.insert(0, record(Some(AnswerValue::Multi([0, 2].into_iter().collect())), false));
        answers.insert(1, record(Some(AnswerValue::Multi([7, 8].into_iter().collect())), false));
        answers.insert(2, record(Some(AnswerValue::Multi(Default::default())), false));

        let entries = build_entries(&[&q, &q, &q], &answers);
        assert_eq!(entries[0].user_answer.text, "Red, Blue");
        assert_eq!(entries[0].correct_answer, "Red, Blue, Yellow");
        assert_eq!(entries[1].user_answer.text, INVALID_SELECTION);
        assert_eq!(entries[2].user_answer.text, NO_ANSWER);
    }

    #[test]
    fn test_mismatched_value_is_malformed() {
        let q = question(QuestionKind::Fill {
            correct_text: "Pacific".to_string(),
        });
        let mut answers = BTreeMap::new();
        answers.insert(0, record(Some(AnswerValue::Single(1)), false));

        let entries = build_entries(&[&q], &answers);
        assert_eq!(entries[0].user_answer.text, NO_ANSWER);
        assert_eq!(entries[0].warnings, vec![DataIntegrityWarning::AnswerMalformed]);
        assert_eq!(entries[0].correct_answer, "Pacific");
    }

    #[test]
    fn test_fill_answer_keeps_classification() {
        let q = question(QuestionKind::Fill {
            correct_text: "Yen".to_string(),
        });
        let mut answers = BTreeMap::new();
        answers.insert(0, record(Some(AnswerValue::Fill("yen".to_string())), true));

        let entries = build_entries(&[&q], &answers);
        assert_eq!(
            entries[0].user_answer,
            RenderedAnswer {
                text: "yen".to_string(),
                is_correct: true
            }
        );
    }
}

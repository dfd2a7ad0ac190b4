use tracing::{error, warn};
use uuid::Uuid;

/// Errors returned by the quiz core and its data sources
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Question source error: {0}")]
    DataSource(#[from] anyhow::Error),
}

impl QuizError {
    pub fn validation(message: impl Into<String>) -> Self {
        QuizError::ValidationError(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        QuizError::InvalidOperation(message.into())
    }

    /// Log the error with structured context and hand it back for propagation
    pub fn log_with_context(self, context: ErrorContext) -> Self {
        match &self {
            QuizError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    session_id = ?context.session_id,
                    position = ?context.position,
                    error = %self,
                    "Rejected invalid input"
                );
            }
            QuizError::InvalidOperation(_) => {
                warn!(
                    operation = %context.operation,
                    session_id = ?context.session_id,
                    position = ?context.position,
                    error = %self,
                    "Operation not permitted in current state"
                );
            }
            QuizError::DataSource(_) => {
                error!(
                    operation = %context.operation,
                    session_id = ?context.session_id,
                    error = %self,
                    "Question source failure"
                );
            }
        }
        self
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, QuizError::ValidationError(_))
    }

    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, QuizError::InvalidOperation(_))
    }

    pub fn is_data_source(&self) -> bool {
        matches!(self, QuizError::DataSource(_))
    }
}

/// Error context for structured logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub session_id: Option<Uuid>,
    pub position: Option<usize>,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            session_id: None,
            position: None,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// Non-fatal data problems found while assembling a review.
///
/// These are rendered as fallback text and logged; they are never returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataIntegrityWarning {
    #[error("answer index {index} is out of range for {option_count} options")]
    AnswerOutOfRange { index: usize, option_count: usize },

    #[error("answer value does not match the question kind")]
    AnswerMalformed,

    #[error("correct answer index {index} is out of range for {option_count} options")]
    CorrectAnswerOutOfRange { index: usize, option_count: usize },

    #[error("question has no correct answer recorded")]
    CorrectAnswerMissing,
}

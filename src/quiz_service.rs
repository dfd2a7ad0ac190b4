use rand::rngs::StdRng;

use crate::config::QuizConfig;
use crate::errors::QuizError;
use crate::models::{Difficulty, SelectionPolicy};
use crate::question_bank::QuestionBank;
use crate::session::Session;
use crate::{log_service_start, log_service_success, log_service_warn};

/// Entry point for the presentation layer: owns the bank and the quiz rules
#[derive(Debug, Clone)]
pub struct QuizService {
    bank: QuestionBank,
    config: QuizConfig,
}

impl QuizService {
    pub fn new(bank: QuestionBank, config: QuizConfig) -> Self {
        Self { bank, config }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Map a welcome-screen choice ("easy", "medium", "hard", "mixed") to a policy.
    /// Anything unrecognised is treated as mixed.
    pub fn policy_for(&self, choice: &str) -> SelectionPolicy {
        match choice.trim().to_lowercase().as_str() {
            "easy" => SelectionPolicy::SingleDifficulty {
                difficulty: Difficulty::Easy,
            },
            "medium" => SelectionPolicy::SingleDifficulty {
                difficulty: Difficulty::Medium,
            },
            "hard" => SelectionPolicy::SingleDifficulty {
                difficulty: Difficulty::Hard,
            },
            _ => self.config.mixed_policy(),
        }
    }

    pub fn start_session(
        &self,
        player_name: &str,
        policy: SelectionPolicy,
    ) -> Result<Session, QuizError> {
        self.start_with(Session::new(self.config.clone()), player_name, policy)
    }

    pub fn start_session_with_rng(
        &self,
        player_name: &str,
        policy: SelectionPolicy,
        rng: StdRng,
    ) -> Result<Session, QuizError> {
        self.start_with(Session::with_rng(self.config.clone(), rng), player_name, policy)
    }

    /// Fresh session for the same player over the whole bank.
    ///
    /// The previous difficulty choice is not carried over.
    pub fn retake(&self, previous: &Session) -> Result<Session, QuizError> {
        if previous.policy() != Some(SelectionPolicy::Retake) {
            log_service_warn!(
                "quiz_service",
                "retake",
                "retake reshuffles the whole bank and ignores the previous difficulty"
            );
        }
        self.start_session(previous.player_name(), SelectionPolicy::Retake)
    }

    fn start_with(
        &self,
        mut session: Session,
        player_name: &str,
        policy: SelectionPolicy,
    ) -> Result<Session, QuizError> {
        log_service_start!("quiz_service", "start_session", question_count = self.bank.len());
        session.start(player_name, policy, &self.bank)?;
        log_service_success!(
            "quiz_service",
            "start_session",
            session_id = session.id(),
            question_count = session.len()
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> QuizService {
        QuizService::new(QuestionBank::builtin().unwrap(), QuizConfig::default())
    }

    #[test]
    fn test_policy_for_choices() {
        let service = service();
        assert_eq!(
            service.policy_for("Hard"),
            SelectionPolicy::SingleDifficulty {
                difficulty: Difficulty::Hard
            }
        );
        assert_eq!(
            service.policy_for("mixed"),
            SelectionPolicy::Distribution {
                easy: 3,
                medium: 4,
                hard: 3
            }
        );
        assert_eq!(service.policy_for("whatever"), service.policy_for("mixed"));
    }

    #[test]
    fn test_mixed_session_on_builtin_bank() {
        let service = service();
        let session = service
            .start_session("Ada", service.policy_for("mixed"))
            .unwrap();
        // built-in bank holds only 3 medium questions
        assert_eq!(session.len(), 9);
    }

    #[test]
    fn test_retake_uses_whole_bank_and_same_player() {
        let service = service();
        let first = service
            .start_session("Ada", service.policy_for("easy"))
            .unwrap();
        assert_eq!(first.len(), 3);

        let second = service.retake(&first).unwrap();
        assert_eq!(second.len(), 10);
        assert_eq!(second.player_name(), "Ada");
        assert_eq!(second.policy(), Some(SelectionPolicy::Retake));
        assert_ne!(second.id(), first.id());
        assert_eq!(second.hints_used(), 0);
    }
}

use rand::Rng;

use crate::log_service_warn;
use crate::models::{Difficulty, Question, SelectionPolicy};
use crate::question_bank::QuestionBank;
use crate::shuffler::permute;

/// Choose the ordered question list for a session
pub fn select_questions<R: Rng + ?Sized>(
    bank: &QuestionBank,
    policy: &SelectionPolicy,
    rng: &mut R,
) -> Vec<Question> {
    match *policy {
        SelectionPolicy::SingleDifficulty { difficulty } => bank.by_difficulty(difficulty),
        SelectionPolicy::Distribution { easy, medium, hard } => {
            let mut picked = Vec::with_capacity(easy + medium + hard);
            for (difficulty, wanted) in [
                (Difficulty::Easy, easy),
                (Difficulty::Medium, medium),
                (Difficulty::Hard, hard),
            ] {
                let pool = permute(&bank.by_difficulty(difficulty), rng);
                if pool.len() < wanted {
                    log_service_warn!(
                        "selector",
                        "distribution",
                        format!(
                            "wanted {} {} questions, bank has {}",
                            wanted,
                            difficulty,
                            pool.len()
                        )
                    );
                }
                picked.extend(pool.into_iter().take(wanted));
            }
            permute(&picked, rng)
        }
        SelectionPolicy::Retake => permute(bank.questions(), rng),
    }
}

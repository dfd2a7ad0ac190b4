use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::{Question, QuestionKind, SessionQuestion};

/// Return a uniformly random permutation of `items`. The input is left untouched.
pub fn permute<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Shuffle a question's options and remap the correct answer(s) so their text is unchanged.
///
/// Fill questions pass through with an empty origin map.
pub fn shuffle_options_preserving_answer<R: Rng + ?Sized>(
    question: &Question,
    rng: &mut R,
) -> SessionQuestion {
    let mut shuffled = question.clone();

    let option_origin = match &question.kind {
        QuestionKind::Single {
            options,
            correct_index,
        } => {
            let origin = permute(&(0..options.len()).collect::<Vec<_>>(), rng);
            let new_options = origin.iter().map(|&from| options[from].clone()).collect();
            // An out-of-range source index stays out of range so review can flag it
            let new_correct = origin
                .iter()
                .position(|&from| from == *correct_index)
                .unwrap_or(*correct_index);
            shuffled.kind = QuestionKind::Single {
                options: new_options,
                correct_index: new_correct,
            };
            origin
        }
        QuestionKind::Multi {
            options,
            correct_indices,
        } => {
            let origin = permute(&(0..options.len()).collect::<Vec<_>>(), rng);
            let new_options = origin.iter().map(|&from| options[from].clone()).collect();
            let new_correct = correct_indices
                .iter()
                .map(|&correct| {
                    origin
                        .iter()
                        .position(|&from| from == correct)
                        .unwrap_or(correct)
                })
                .collect();
            shuffled.kind = QuestionKind::Multi {
                options: new_options,
                correct_indices: new_correct,
            };
            origin
        }
        QuestionKind::Fill { .. } => Vec::new(),
    };

    SessionQuestion {
        question: shuffled,
        option_origin,
    }
}

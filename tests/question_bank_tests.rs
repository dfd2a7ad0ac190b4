use quiz_game::{Difficulty, QuestionBank, QuestionKind, QuizError};
use uuid::Uuid;

#[test]
fn test_bank_from_json_file() {
    let path = std::env::temp_dir().join(format!("quiz-bank-{}.json", Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"[
            {
                "id": 100,
                "type": "single",
                "prompt": "2 + 2 = ?",
                "image_ref": "math.png",
                "difficulty": "easy",
                "options": ["3", "4"],
                "correct_index": 1,
                "explanation": "Basic arithmetic."
            },
            {
                "id": 101,
                "type": "fill",
                "prompt": "The chemical symbol for gold is _____.",
                "difficulty": "hard",
                "correct_text": "Au"
            }
        ]"#,
    )
    .unwrap();

    let bank = QuestionBank::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(bank.len(), 2);
    let first = &bank.questions()[0];
    assert_eq!(first.image_ref.as_deref(), Some("math.png"));
    assert!(matches!(first.kind, QuestionKind::Single { correct_index: 1, .. }));

    let hard = bank.by_difficulty(Difficulty::Hard);
    assert_eq!(hard.len(), 1);
    assert_eq!(hard[0].explanation, "");
}

#[test]
fn test_malformed_json_is_error() {
    let err = QuestionBank::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, QuizError::DataSource(_)));
    assert!(err.to_string().contains("failed to parse question bank JSON"));

    let err = QuestionBank::from_json_str(r#"[{"id": 1, "type": "essay", "prompt": "q", "difficulty": "easy"}]"#)
        .unwrap_err();
    assert!(err.to_string().contains("failed to parse"));
}

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod preferences;
pub mod question_bank;
pub mod quiz_service;
pub mod review;
pub mod scorer;
pub mod selector;
pub mod session;
pub mod shuffler;
pub mod timer;

pub use config::{Config, QuizConfig};
pub use errors::*;
pub use models::*;
pub use preferences::{PreferenceStore, Theme};
pub use question_bank::QuestionBank;
pub use quiz_service::QuizService;
pub use review::build_review;
pub use scorer::score;
pub use session::Session;
pub use timer::{QuestionTimer, TimerTick};

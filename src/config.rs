use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::SelectionPolicy;
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub quiz: QuizConfig,
    pub bank: BankConfig,
    pub preferences: PreferencesConfig,
    pub logging: LoggingConfig,
}

/// Rules applied to every session
#[derive(Debug, Clone, PartialEq)]
pub struct QuizConfig {
    pub seconds_per_question: u32,
    pub tick_interval: Duration,
    pub hint_penalty: f64,
    pub mixed_distribution: (usize, usize, usize),
}

/// Where questions come from; `None` means the built-in bank
#[derive(Debug, Clone)]
pub struct BankConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PreferencesConfig {
    pub path: PathBuf,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Runs before the log subscriber exists, so it emits nothing; call
    /// `log_configuration_summary` once logging is up.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            quiz: QuizConfig::from_env()?,
            bank: BankConfig::from_env(),
            preferences: PreferencesConfig::from_env(),
            logging: LoggingConfig::from_env(),
        })
    }

    pub fn log_configuration_summary(&self) {
        log_system_event!(config, "Configuration loaded from environment variables");
        info!(
            seconds_per_question = self.quiz.seconds_per_question,
            tick_interval_ms = self.quiz.tick_interval.as_millis() as u64,
            hint_penalty = self.quiz.hint_penalty,
            mixed_distribution = ?self.quiz.mixed_distribution,
            bank_path = ?self.bank.path,
            preferences_path = %self.preferences.path.display(),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.quiz.validate()?;

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Unrecognised log level '{}', the filter may fall back to defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            seconds_per_question: 30,
            tick_interval: Duration::from_secs(1),
            hint_penalty: 0.5,
            mixed_distribution: (3, 4, 3),
        }
    }
}

impl QuizConfig {
    fn from_env() -> Result<Self> {
        let defaults = QuizConfig::default();

        let seconds_per_question = match env::var("QUIZ_SECONDS_PER_QUESTION") {
            Ok(value) => value.trim().parse::<u32>().map_err(|_| {
                anyhow!("Invalid QUIZ_SECONDS_PER_QUESTION value: '{}'", value)
            })?,
            Err(_) => defaults.seconds_per_question,
        };

        let tick_interval = match env::var("QUIZ_TICK_MILLIS") {
            Ok(value) => Duration::from_millis(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid QUIZ_TICK_MILLIS value: '{}'", value))?,
            ),
            Err(_) => defaults.tick_interval,
        };

        let hint_penalty = match env::var("QUIZ_HINT_PENALTY") {
            Ok(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("Invalid QUIZ_HINT_PENALTY value: '{}'", value))?,
            Err(_) => defaults.hint_penalty,
        };

        let mixed_distribution = match env::var("QUIZ_MIXED_DISTRIBUTION") {
            Ok(value) => parse_distribution(&value)?,
            Err(_) => defaults.mixed_distribution,
        };

        let config = QuizConfig {
            seconds_per_question,
            tick_interval,
            hint_penalty,
            mixed_distribution,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seconds_per_question == 0 {
            return Err(anyhow!("Seconds per question must be greater than 0"));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("Tick interval must be greater than 0"));
        }
        if !self.hint_penalty.is_finite() || self.hint_penalty < 0.0 {
            return Err(anyhow!(
                "Hint penalty must be a non-negative number, got {}",
                self.hint_penalty
            ));
        }
        let (easy, medium, hard) = self.mixed_distribution;
        if easy + medium + hard == 0 {
            return Err(anyhow!("Mixed distribution must request at least one question"));
        }
        Ok(())
    }

    /// Policy used when the player picks "mixed"
    pub fn mixed_policy(&self) -> SelectionPolicy {
        let (easy, medium, hard) = self.mixed_distribution;
        SelectionPolicy::Distribution { easy, medium, hard }
    }
}

impl BankConfig {
    fn from_env() -> Self {
        let path = env::var("QUIZ_BANK_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        BankConfig { path }
    }
}

impl PreferencesConfig {
    fn from_env() -> Self {
        let path = env::var("QUIZ_PREFERENCES_PATH")
            .unwrap_or_else(|_| "quiz-preferences.json".to_string());
        PreferencesConfig {
            path: PathBuf::from(path),
        }
    }
}

impl LoggingConfig {
    fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,quiz_game=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        // stdout belongs to the quiz screen, so console logging is opt-in
        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

/// Parse "easy,medium,hard" counts such as `3,4,3`
pub fn parse_distribution(value: &str) -> Result<(usize, usize, usize)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(anyhow!(
            "Invalid QUIZ_MIXED_DISTRIBUTION value: '{}'. Expected three counts like 3,4,3",
            value
        ));
    }

    let mut counts = [0usize; 3];
    for (slot, part) in counts.iter_mut().zip(&parts) {
        *slot = part
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid count '{}' in QUIZ_MIXED_DISTRIBUTION", part))?;
    }

    Ok((counts[0], counts[1], counts[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture<F: FnOnce()>(f: F) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.text()
    }

    fn sample_config() -> Config {
        Config {
            quiz: QuizConfig::default(),
            bank: BankConfig { path: None },
            preferences: PreferencesConfig {
                path: PathBuf::from("quiz-preferences.json"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: false,
                console_enabled: false,
                log_directory: "logs".to_string(),
            },
        }
    }

    #[test]
    fn test_from_env_is_silent() {
        let output = capture(|| {
            Config::from_env().unwrap();
        });
        assert!(output.is_empty(), "unexpected output: {}", output);
    }

    #[test]
    fn test_configuration_summary_reaches_subscriber() {
        let output = capture(|| sample_config().log_configuration_summary());
        assert!(output.contains("Configuration summary"));
        assert!(output.contains("seconds_per_question=30"));
        assert!(output.contains("Configuration loaded from environment variables"));
    }

    #[test]
    fn test_quiz_config_defaults_are_valid() {
        let config = QuizConfig::default();
        assert_eq!(config.seconds_per_question, 30);
        assert_eq!(config.hint_penalty, 0.5);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.mixed_policy(),
            SelectionPolicy::Distribution {
                easy: 3,
                medium: 4,
                hard: 3
            }
        );
    }

    #[test]
    fn test_parse_distribution() {
        assert_eq!(parse_distribution("3,4,3").unwrap(), (3, 4, 3));
        assert_eq!(parse_distribution(" 1 , 0 ,2 ").unwrap(), (1, 0, 2));
        assert!(parse_distribution("3,4").is_err());
        assert!(parse_distribution("a,b,c").is_err());
        assert!(parse_distribution("1,-1,2").is_err());
    }

    #[test]
    fn test_quiz_config_validation() {
        let valid = QuizConfig::default();

        let mut invalid = valid.clone();
        invalid.seconds_per_question = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = valid.clone();
        invalid.hint_penalty = -0.5;
        assert!(invalid.validate().is_err());

        let mut invalid = valid.clone();
        invalid.hint_penalty = f64::NAN;
        assert!(invalid.validate().is_err());

        let mut invalid = valid.clone();
        invalid.tick_interval = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = valid;
        invalid.mixed_distribution = (0, 0, 0);
        assert!(invalid.validate().is_err());
    }
}

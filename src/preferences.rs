use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

/// The only state that outlives a session: a small JSON preference file
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files fall back to defaults
    pub fn load(&self) -> Preferences {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(_) => {
                debug!(path = %self.path.display(), "No preference file, using defaults");
                return Preferences::default();
            }
        };

        serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring corrupt preference file");
            Preferences::default()
        })
    }

    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        let json = serde_json::to_string_pretty(preferences)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write preferences to {}", self.path.display()))
    }

    /// Flip the theme and persist it
    pub fn toggle_theme(&self) -> Result<Theme> {
        let mut preferences = self.load();
        preferences.theme = preferences.theme.toggled();
        self.save(&preferences)?;
        Ok(preferences.theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> PreferenceStore {
        PreferenceStore::new(std::env::temp_dir().join(format!("quiz-prefs-{}.json", Uuid::new_v4())))
    }

    #[test]
    fn test_missing_file_defaults_to_light() {
        let store = temp_store();
        assert_eq!(store.load().theme, Theme::Light);
    }

    #[test]
    fn test_toggle_persists() {
        let store = temp_store();
        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(store.load().theme, Theme::Dark);
        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(store.load().theme, Theme::Light);
        std::fs::remove_file(store.path()).unwrap();
    }

    #[test]
    fn test_corrupt_file_defaults() {
        let store = temp_store();
        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load().theme, Theme::Light);
        std::fs::remove_file(store.path()).unwrap();
    }
}

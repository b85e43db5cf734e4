//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use cap_core::{LayoutOptions, WorkCalendar};
use chrono::NaiveDate;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Base URL of the remote estimate backend.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Bearer token for the remote backend.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Non-working days skipped when projecting slots onto dates.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Sizing of the shared timeline layout.
    #[serde(default)]
    pub layout: LayoutOptions,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("holidays", &self.holidays.len())
            .field("layout", &self.layout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("cap.db"),
            api_url: None,
            api_token: None,
            holidays: Vec::new(),
            layout: LayoutOptions::default(),
        }
    }
}

impl Config {
    /// Config with defaults and the given database, for tests and scripting.
    pub fn with_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // CAP_API_URL, CAP_LAYOUT__CONTAINER_WIDTH, ...
        figment = figment.merge(Env::prefixed("CAP_").split("__"));

        figment.extract()
    }

    /// Working-day calendar with the configured holidays.
    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar::with_holidays(self.holidays.iter().copied())
    }
}

/// Returns the platform-specific config directory for cap.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cap"))
}

/// Returns the platform-specific data directory for cap.
///
/// On Linux: `~/.local/share/cap`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("cap"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_cap() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "cap");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("cap.db"));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/tmp/plans.db"
api_url = "https://plan.example.com"
holidays = ["2026-01-01"]

[layout]
container_width = 900.0
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/plans.db"));
        assert_eq!(config.api_url.as_deref(), Some("https://plan.example.com"));
        assert_eq!(config.holidays.len(), 1);
        assert!((config.layout.container_width - 900.0).abs() < f64::EPSILON);
        assert!((config.layout.row_height - LayoutOptions::default().row_height).abs() < f64::EPSILON);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config {
            api_token: Some("secret-token".to_string()),
            ..Config::with_database("/tmp/cap.db")
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::log::DEFAULT_LOG_CAPACITY;
use crate::preferences::PreferenceStore;

pub const ENV_BASE_URL: &str = "INSIGHTS_GEMINI_BASE_URL";
pub const ENV_PREFERENCES_PATH: &str = "INSIGHTS_PREFERENCES_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub documents: DocumentConfig,
    pub log: LogConfig,
    pub preferences_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Environment variables searched for the API key, in order
    pub credential_vars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub max_file_bytes: u64,
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub capacity: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: extract::llm::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            credential_vars: extract::llm::DEFAULT_CREDENTIAL_VARS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: ingest::DEFAULT_MAX_FILE_BYTES,
            fetch_timeout_secs: 30,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            documents: DocumentConfig::default(),
            log: LogConfig::default(),
            preferences_path: None,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid by the JSON file if one is given, then by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(base_url = %url, "Base URL overridden from environment");
            self.model.base_url = url;
        }
        if let Some(path) = lookup(ENV_PREFERENCES_PATH).filter(|v| !v.trim().is_empty()) {
            self.preferences_path = Some(PathBuf::from(path));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.documents.fetch_timeout_secs)
    }

    /// Explicit path, else the platform config dir, else the working directory
    pub fn resolved_preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .or_else(PreferenceStore::default_path)
            .unwrap_or_else(|| PathBuf::from("preferences.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.documents.max_file_bytes, 5 * 1024 * 1024);
        assert_eq!(config.log.capacity, 10);
        assert_eq!(config.model.credential_vars, vec!["API_KEY", "GEMINI_API_KEY"]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model":{"request_timeout_secs":5},"log":{"capacity":3}}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.model.request_timeout_secs, 5);
        assert_eq!(config.model.base_url, extract::llm::DEFAULT_BASE_URL);
        assert_eq!(config.log.capacity, 3);
        assert_eq!(config.documents, DocumentConfig::default());
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            AppConfig::from_file(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            ENV_BASE_URL => Some("http://127.0.0.1:9999".to_string()),
            ENV_PREFERENCES_PATH => Some("/tmp/prefs.json".to_string()),
            _ => None,
        });
        assert_eq!(config.model.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.resolved_preferences_path(), PathBuf::from("/tmp/prefs.json"));

        let mut untouched = AppConfig::default();
        untouched.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(untouched, AppConfig::default());
    }
}

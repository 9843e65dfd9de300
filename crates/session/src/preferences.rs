use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use visualize::Appearance;

use crate::error::PreferenceError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

/// Models offered in settings
pub const KNOWN_MODELS: [&str; 1] = [DEFAULT_MODEL];

const APP_DIR: &str = "report-insights";
const FILE_NAME: &str = "preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub const ALL: [ThemeMode; 3] = [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }

    /// `System` follows the terminal's `COLORFGBG` hint, light when unknown.
    pub fn resolve(&self) -> Appearance {
        self.resolve_with(std::env::var("COLORFGBG").ok().as_deref())
    }

    pub fn resolve_with(&self, colorfgbg: Option<&str>) -> Appearance {
        match self {
            Self::Light => Appearance::Light,
            Self::Dark => Appearance::Dark,
            Self::System => {
                let background = colorfgbg
                    .and_then(|hint| hint.rsplit(';').next())
                    .and_then(|bg| bg.trim().parse::<u8>().ok());
                match background {
                    Some(0..=6 | 8) => Appearance::Dark,
                    _ => Appearance::Light,
                }
            }
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub theme: ThemeMode,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            model: default_model(),
            theme: ThemeMode::default(),
        }
    }
}

/// Preferences persisted as JSON; written on every change.
pub struct PreferenceStore {
    path: PathBuf,
    preferences: Preferences,
}

impl PreferenceStore {
    /// `$CONFIG_DIR/report-insights/preferences.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let preferences = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed preferences");
                Preferences::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No saved preferences, using defaults");
                Preferences::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read preferences");
                Preferences::default()
            }
        };
        Self { path, preferences }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), PreferenceError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(PreferenceError::EmptyModel);
        }
        if !KNOWN_MODELS.contains(&model) {
            tracing::warn!(model, "Model is not in the known list; requests may be rejected");
        }
        self.preferences.model = model.to_string();
        self.save()
    }

    pub fn set_theme(&mut self, theme: ThemeMode) -> Result<(), PreferenceError> {
        self.preferences.theme = theme;
        self.save()
    }

    fn save(&self) -> Result<(), PreferenceError> {
        let json = serde_json::to_string_pretty(&self.preferences)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferenceError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| PreferenceError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), model = %self.preferences.model, theme = %self.preferences.theme, "Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::load(dir.path().join("nope.json"));
        assert_eq!(store.preferences(), &Preferences::default());
        assert_eq!(store.preferences().model, DEFAULT_MODEL);
        assert_eq!(store.preferences().theme, ThemeMode::System);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(PreferenceStore::load(&path).preferences(), &Preferences::default());
    }

    #[test]
    fn test_changes_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        let mut store = PreferenceStore::load(&path);
        store.set_theme(ThemeMode::Dark).unwrap();
        store.set_model("gemini-custom").unwrap();

        let reloaded = PreferenceStore::load(&path);
        assert_eq!(reloaded.preferences().theme, ThemeMode::Dark);
        assert_eq!(reloaded.preferences().model, "gemini-custom");
    }

    #[test]
    fn test_empty_model_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PreferenceStore::load(dir.path().join("p.json"));
        assert!(matches!(store.set_model("  "), Err(PreferenceError::EmptyModel)));
        assert_eq!(store.preferences().model, DEFAULT_MODEL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, r#"{"theme":"light"}"#).unwrap();
        let store = PreferenceStore::load(&path);
        assert_eq!(store.preferences().theme, ThemeMode::Light);
        assert_eq!(store.preferences().model, DEFAULT_MODEL);
    }

    #[test]
    fn test_system_theme_resolution() {
        assert_eq!(ThemeMode::System.resolve_with(Some("15;0")), Appearance::Dark);
        assert_eq!(ThemeMode::System.resolve_with(Some("0;15")), Appearance::Light);
        assert_eq!(ThemeMode::System.resolve_with(Some("garbage")), Appearance::Light);
        assert_eq!(ThemeMode::System.resolve_with(None), Appearance::Light);
        assert_eq!(ThemeMode::Dark.resolve_with(Some("0;15")), Appearance::Dark);
        assert_eq!(ThemeMode::parse("DARK"), Some(ThemeMode::Dark));
    }
}

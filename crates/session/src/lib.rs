pub mod config;
pub mod error;
pub mod log;
pub mod preferences;
pub mod state;

pub use config::AppConfig;
pub use error::{ConfigError, PreferenceError, SessionError, ValidationError};
pub use log::{LogEntry, SessionLog};
pub use preferences::{DEFAULT_MODEL, KNOWN_MODELS, PreferenceStore, Preferences, ThemeMode};
pub use state::{AppState, DocumentStatus, LoadToken, SubmissionTicket, validate};

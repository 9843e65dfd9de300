use std::path::PathBuf;
use thiserror::Error;
use visualize::ChartType;

/// Input problems caught before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Query is required for this task.")]
    QueryRequired,

    #[error("Document text is required for this task.")]
    DocumentRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("An analysis is already running. Wait for it to finish.")]
    Busy,

    #[error("Submission {0} is no longer the active one.")]
    StaleSubmission(u64),

    #[error("The {chart} chart is not available for the current result.")]
    ChartUnavailable { chart: ChartType },

    #[error("There is no result to chart yet.")]
    NoResponse,
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Model name cannot be empty.")]
    EmptyModel,

    #[error("Could not write preferences to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

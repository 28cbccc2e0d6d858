//! Error types shared across the causex crates.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a stimulus model
#[derive(Debug, Error)]
pub enum StimulusError {
    #[error("invalid trial condition: {0}")]
    InvalidCondition(String),

    #[error("response already submitted for this trial")]
    AlreadySubmitted,

    #[error("stimulus state corrupted: {0}")]
    Corrupted(String),
}

/// Fatal session errors. Every variant ends the session.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("failed to initialize stimulus for trial {trial}: {source}")]
    StimulusInitialization {
        trial: usize,
        #[source]
        source: StimulusError,
    },

    #[error("stimulus update failed at {elapsed_ms} ms: {source}")]
    TickUpdate {
        elapsed_ms: u64,
        #[source]
        source: StimulusError,
    },

    #[error("response submission failed for trial {trial}: {source}")]
    ResponseSubmission {
        trial: usize,
        #[source]
        source: StimulusError,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Json(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

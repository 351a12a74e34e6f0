//! Error types for orchestration
//!
//! Every variant is a configuration fault detected before dispatch. Failures
//! inside an account unit never surface as errors; they are classified into
//! `Statistics` and the account report.

/// Errors from validating a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Range(#[from] common::Error),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("task '{task}' needs {input}, none provided")]
    MissingInput {
        task: &'static str,
        input: &'static str,
    },

    #[error("task '{task}' needs {needed} entries of {input}, only {available} provided")]
    InsufficientInput {
        task: &'static str,
        input: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Result alias for orchestration.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for client construction

/// Errors from building an account client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid proxy: {0}")]
    InvalidProxy(String),

    #[error("client setup failed: {0}")]
    Setup(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Runner-specific error types

use std::path::PathBuf;

use thiserror::Error;

/// Start-up errors raised while assembling run input.
///
/// Anything that goes wrong once accounts are dispatched is classified by the
/// orchestrator and reported in the run summary instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no pictures found in {}", .0.display())]
    NoPictures(PathBuf),
}

/// Result alias using the runner Error
pub type Result<T> = std::result::Result<T, Error>;

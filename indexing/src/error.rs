use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error taxonomy for the indexing engine.
///
/// Only contract violations (`InvalidInput`) and resource-acquisition failures (`Notify`,
/// `WalkDir`, the watcher's own `Io`) are returned as `Err`. Everyday indexing failures — a
/// missing file, a filtered extension, a transient read error that exhausts its retries — are
/// not represented here; they collapse to a boolean `false` at the [`crate::service`] boundary
/// instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller violated the contract of the operation it called: an unset path, unset
    /// metadata, or similar. Leaves index state untouched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// File watcher errors (failed registration, OS handle unavailable).
    #[error(transparent)]
    Notify(#[from] notify::Error),

    /// I/O errors that escaped a retry wrapper at an initialization boundary (as opposed to a
    /// per-file read, which never surfaces an `Err`).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Walkdir errors during directory traversal.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// `start()` was called with a root that does not exist or is not a directory.
    #[error("watch root {0:?} does not exist or is not a directory")]
    NotADirectory(PathBuf),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

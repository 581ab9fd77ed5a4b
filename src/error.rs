//! Error types for the places where a failure is allowed to surface.
//!
//! Resolution and indexing never fail; unresolved references, missing
//! directories and unreadable subtrees all degrade to empty results. The
//! variants here cover watcher setup and explicit reads of a caller's file.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CakeError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot watch {path:?}: {reason}")]
    Watch { path: PathBuf, reason: String },
}

pub type CakeResult<T> = Result<T, CakeError>;

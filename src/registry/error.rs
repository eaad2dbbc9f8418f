//! Error types for registry population.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from walking configured roots.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid root {root}: {reason}")]
    InvalidRoot { root: PathBuf, reason: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

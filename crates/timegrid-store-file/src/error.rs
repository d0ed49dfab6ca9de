//! Error types for timegrid file storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during `FileStore` operations.
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// The data file or its directory could not be accessed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The data file is not a task document.
    #[error("Failed to parse {path}: {source}")]
    Decode {
        /// Data file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The task document was written by an incompatible version.
    #[error("Unsupported data format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version recorded in the file.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// Failed to serialize the task document.
    #[error("Failed to serialize tasks: {0}")]
    Encode(#[from] serde_json::Error),

    /// The temporary file could not replace the data file.
    #[error("Failed to replace {path}: {source}")]
    Persist {
        /// Data file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: tempfile::PersistError,
    },
}

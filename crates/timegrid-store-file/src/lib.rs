//! JSON file storage for timegrid tasks.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use timegrid_core::Task;
use tracing::{debug, info};

mod error;

pub use error::FileStoreError;

/// Format version written into every data file.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    tasks: &'a [Task],
}

#[derive(Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Task collection kept in a single JSON document on disk.
///
/// Saves go through a temporary file in the same directory followed by a
/// rename, so a crash never leaves a half-written document behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the document at `path`, creating its parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = parent_dir(&path) {
            fs::create_dir_all(dir).map_err(|source| FileStoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(Self { path })
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored task. A missing or blank file holds no tasks.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a task document.
    pub fn load_tasks(&self) -> Result<Vec<Task>, FileStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(FileStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Document = serde_json::from_str(&raw).map_err(|source| FileStoreError::Decode {
            path: self.path.clone(),
            source,
        })?;
        if document.version != FORMAT_VERSION {
            return Err(FileStoreError::UnsupportedVersion {
                found: document.version,
                expected: FORMAT_VERSION,
            });
        }
        debug!(path = %self.path.display(), count = document.tasks.len(), "loaded tasks");
        Ok(document.tasks)
    }

    /// Replace the stored document with `tasks`.
    ///
    /// # Errors
    /// Returns an error if serialization, the temporary write or the final
    /// rename fails. The previous document is left intact on error.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), FileStoreError> {
        let body = serde_json::to_vec_pretty(&DocumentRef {
            version: FORMAT_VERSION,
            tasks,
        })?;

        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let io_err = |source| FileStoreError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|source| FileStoreError::Persist {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

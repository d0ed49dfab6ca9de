//! Storage port for the task collection.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;

use timegrid_core::Task;
use timegrid_store_file::{FileStore, FileStoreError};
use tracing::warn;

/// Where the task collection lives between sessions.
pub trait TaskPersistence {
    /// Error reported by [`save`](Self::save).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Previously saved tasks. Missing or unreadable data yields an empty list.
    fn load(&self) -> Vec<Task>;

    /// Replace the saved collection.
    ///
    /// # Errors
    /// Returns the backend error; the saved collection is unchanged on error.
    fn save(&self, tasks: &[Task]) -> Result<(), Self::Error>;
}

impl TaskPersistence for FileStore {
    type Error = FileStoreError;

    fn load(&self) -> Vec<Task> {
        self.load_tasks().unwrap_or_else(|err| {
            warn!(path = %self.path().display(), "starting from an empty collection: {err}");
            Vec::new()
        })
    }

    fn save(&self, tasks: &[Task]) -> Result<(), Self::Error> {
        self.save_tasks(tasks)
    }
}

/// In-memory persistence holding the serialized collection, for tests and
/// embedding hosts that manage storage themselves.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    raw: RefCell<Option<String>>,
    saves: Cell<usize>,
}

impl MemoryPersistence {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with a raw document (which may be corrupt).
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: RefCell::new(Some(raw.into())),
            saves: Cell::new(0),
        }
    }

    /// The currently stored document.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw.borrow().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl TaskPersistence for MemoryPersistence {
    type Error = Infallible;

    fn load(&self) -> Vec<Task> {
        let Some(raw) = self.raw.borrow().clone() else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("discarding unreadable stored tasks: {err}");
            Vec::new()
        })
    }

    fn save(&self, tasks: &[Task]) -> Result<(), Self::Error> {
        // Serializing plain tasks into a string cannot fail.
        let raw = serde_json::to_string(tasks).unwrap_or_default();
        *self.raw.borrow_mut() = Some(raw);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

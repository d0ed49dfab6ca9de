use thiserror::Error;
use timegrid_core::{Task, TaskId};
use tracing::{info, warn};

use crate::interchange::{self, ExportError, ParseError};
use crate::persistence::TaskPersistence;
use crate::task_store::{Accepted, OptionLists, StoreError, TaskStore};

/// An imported record rejected by the store, with its line in the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {error}")]
pub struct RejectedLine {
    /// Physical line of the record.
    pub line: u64,
    /// Why the store refused it.
    pub error: StoreError,
}

/// Why an import applied nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The text did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The records parsed but conflict with each other or with stored tasks.
    #[error("{} imported task(s) rejected: {}", .0.len(), summarize(.0))]
    Rejected(Vec<RejectedLine>),
}

fn summarize(lines: &[RejectedLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Service façade that owns the task store and keeps persistence in sync.
///
/// Every successful mutation is saved immediately. A failed save is logged and
/// retried on the next mutation or [`flush`](Self::flush); the in-memory state
/// stays authoritative either way.
pub struct Planner<P> {
    store: TaskStore,
    persistence: P,
    saved_revision: u64,
}

impl<P: TaskPersistence> Planner<P> {
    /// Load the saved collection (empty when missing or unreadable).
    pub fn open(persistence: P) -> Self {
        let store = TaskStore::from_tasks(persistence.load());
        info!(count = store.len(), "planner opened");
        Self {
            saved_revision: store.revision(),
            store,
            persistence,
        }
    }

    /// Read access to the tasks.
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// The persistence backend.
    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    /// True when the store has changes that are not saved yet.
    pub const fn is_dirty(&self) -> bool {
        self.store.revision() != self.saved_revision
    }

    /// Add a task from a create form under a freshly minted id.
    ///
    /// # Errors
    /// Returns the validation or conflict error; nothing is stored.
    pub fn create(&mut self, task: Task) -> Result<Task, StoreError> {
        let task = Task {
            id: TaskId::new(),
            ..task
        }
        .normalized();
        self.store.upsert(task.clone())?;
        self.autosave();
        Ok(task)
    }

    /// Save an edited task under its existing id.
    ///
    /// # Errors
    /// Returns the validation or conflict error; the stored task is unchanged.
    pub fn update(&mut self, task: Task) -> Result<Accepted, StoreError> {
        let accepted = self.store.upsert(task)?;
        self.autosave();
        Ok(accepted)
    }

    /// Remove a task. Unknown ids are ignored.
    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        let removed = self.store.delete(id);
        if removed.is_some() {
            self.autosave();
        }
        removed
    }

    /// Parse interchange text and add every record, or nothing.
    ///
    /// # Errors
    /// Returns [`ImportError::Parse`] for format problems and
    /// [`ImportError::Rejected`] when any record overlaps another record or a
    /// stored task.
    pub fn import_text(&mut self, text: &str) -> Result<usize, ImportError> {
        let parsed = interchange::parse_records(text)?;
        let lines: Vec<u64> = parsed.iter().map(|record| record.line).collect();
        let imported = self
            .store
            .import_all(parsed.into_iter().map(|record| record.task))
            .map_err(|batch| {
                ImportError::Rejected(
                    batch
                        .rejected
                        .into_iter()
                        .map(|(position, error)| RejectedLine {
                            line: lines.get(position).copied().unwrap_or_default(),
                            error,
                        })
                        .collect(),
                )
            })?;
        info!(count = imported, "imported tasks");
        self.autosave();
        Ok(imported)
    }

    /// Render every task in the interchange format.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn export_text(&self) -> Result<String, ExportError> {
        interchange::export(self.store.iter())
    }

    /// Distinct clients, types, projects and quotes for form dropdowns.
    pub fn options(&self) -> OptionLists {
        self.store.options()
    }

    /// Run an interaction against the store and save if it changed anything.
    pub fn interact<R>(&mut self, f: impl FnOnce(&mut TaskStore) -> R) -> R {
        let result = f(&mut self.store);
        if self.is_dirty() {
            self.autosave();
        }
        result
    }

    /// Save pending changes.
    ///
    /// # Errors
    /// Returns the backend error; the changes stay pending.
    pub fn flush(&mut self) -> Result<(), P::Error> {
        if !self.is_dirty() {
            return Ok(());
        }
        self.persistence.save(&self.store.to_vec())?;
        self.saved_revision = self.store.revision();
        Ok(())
    }

    fn autosave(&mut self) {
        if let Err(err) = self.flush() {
            warn!("failed to save tasks, keeping changes in memory: {err}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::interchange::HEADER;
    use crate::persistence::MemoryPersistence;
    use crate::task_store::ConflictError;
    use std::cell::Cell;
    use std::io;
    use time::macros::{date, time};
    use timegrid_core::TaskKind;

    fn acme(start: time::Time, end: time::Time) -> Task {
        Task::new(date!(2025 - 01 - 06), start, end, TaskKind::billable("Acme"))
    }

    #[derive(Default)]
    struct FlakyPersistence {
        failing: Cell<bool>,
        saved: Cell<usize>,
    }

    impl TaskPersistence for FlakyPersistence {
        type Error = io::Error;

        fn load(&self) -> Vec<Task> {
            Vec::new()
        }

        fn save(&self, tasks: &[Task]) -> Result<(), Self::Error> {
            if self.failing.get() {
                return Err(io::Error::other("disk full"));
            }
            self.saved.set(tasks.len());
            Ok(())
        }
    }

    #[test]
    fn mutations_are_saved_immediately() {
        let mut planner = Planner::open(MemoryPersistence::new());
        let created = planner.create(acme(time!(9:00), time!(10:00))).expect("fits");
        assert_eq!(planner.persistence().save_count(), 1);
        assert!(!planner.is_dirty());

        let reopened = Planner::open(MemoryPersistence::with_raw(
            planner.persistence().raw().unwrap_or_default(),
        ));
        assert_eq!(reopened.store().get(created.id), Some(&created));
    }

    #[test]
    fn create_mints_a_fresh_id() {
        let mut planner = Planner::open(MemoryPersistence::new());
        let draft = acme(time!(9:00), time!(10:00));
        let created = planner.create(draft.clone()).expect("fits");
        assert_ne!(created.id, draft.id);
        assert!(planner.store().get(draft.id).is_none());
    }

    #[test]
    fn rejected_mutation_is_not_saved() {
        let mut planner = Planner::open(MemoryPersistence::new());
        planner.create(acme(time!(9:00), time!(10:00))).expect("fits");
        let result = planner.create(acme(time!(9:30), time!(10:30)));
        assert!(matches!(result, Err(StoreError::Conflict(ConflictError { .. }))));
        assert_eq!(planner.persistence().save_count(), 1);
    }

    #[test]
    fn update_keeps_the_id() {
        let mut planner = Planner::open(MemoryPersistence::new());
        let created = planner.create(acme(time!(9:00), time!(10:00))).expect("fits");
        let moved = Task {
            start: time!(11:00),
            end: time!(12:00),
            ..created.clone()
        };
        assert_eq!(planner.update(moved.clone()), Ok(Accepted::Replaced));
        assert_eq!(planner.store().get(created.id), Some(&moved));
    }

    #[test]
    fn deleting_unknown_id_does_not_save() {
        let mut planner = Planner::open(MemoryPersistence::new());
        assert!(planner.delete(TaskId::new()).is_none());
        assert_eq!(planner.persistence().save_count(), 0);
    }

    #[test]
    fn corrupt_storage_opens_empty() {
        let planner = Planner::open(MemoryPersistence::with_raw("{{{"));
        assert!(planner.store().is_empty());
        assert!(!planner.is_dirty());
    }

    #[test]
    fn import_is_checked_against_existing_tasks() {
        let mut planner = Planner::open(MemoryPersistence::new());
        planner.create(acme(time!(9:00), time!(10:00))).expect("fits");

        let text = format!(
            "{HEADER}\n\
             2025-01-06;10:00;11:00;BILLABLE;Acme;;;;;1;no\n\
             2025-01-06;09:30;10:00;BILLABLE;Acme;;;;;0.5;no"
        );
        let Err(ImportError::Rejected(lines)) = planner.import_text(&text) else {
            panic!("overlapping import must be rejected");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line, 3);
        assert!(matches!(lines[0].error, StoreError::Conflict(_)));
        assert_eq!(planner.store().len(), 1);
    }

    #[test]
    fn rejected_import_lines_follow_the_input_text() {
        let mut planner = Planner::open(MemoryPersistence::new());
        planner.create(acme(time!(12:00), time!(13:00))).expect("fits");

        let text = format!(
            "{HEADER}\n\
             2025-01-06;09:00;10:00;BILLABLE;Acme;;;;\"notes\non two lines\";1;no\n\
             \n\
             2025-01-06;12:30;13:30;BILLABLE;Acme;;;;;1;no"
        );
        let Err(ImportError::Rejected(lines)) = planner.import_text(&text) else {
            panic!("overlapping import must be rejected");
        };
        assert_eq!(lines.iter().map(|line| line.line).collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn import_then_export() {
        let mut planner = Planner::open(MemoryPersistence::new());
        let text = format!(
            "{HEADER}\n\
             2025-01-07;07:00;08:00;NON_BILLABLE;;;;Admin;;1;\n\
             2025-01-06;10:00;11:30;BILLABLE;Acme;Site;;;Kick-off;1.5;yes"
        );
        assert_eq!(planner.import_text(&text), Ok(2));
        assert_eq!(planner.persistence().save_count(), 1);

        let exported = planner.export_text().expect("export");
        let mut lines = exported.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some("2025-01-06;10:00;11:30;BILLABLE;Acme;Site;;;Kick-off;1.5;yes")
        );
        assert_eq!(lines.next(), Some("2025-01-07;07:00;08:00;NON_BILLABLE;;;;Admin;;1;"));

        let options = planner.options();
        assert!(options.clients.contains("Acme"));
        assert!(options.types.contains("Admin"));
        assert!(options.projects.contains("Site"));
    }

    #[test]
    fn parse_errors_surface_unchanged() {
        let mut planner = Planner::open(MemoryPersistence::new());
        assert_eq!(planner.import_text(HEADER), Err(ImportError::Parse(ParseError::Empty)));
    }

    #[test]
    fn failed_save_is_retried_on_flush() {
        let mut planner = Planner::open(FlakyPersistence::default());
        planner.persistence().failing.set(true);
        planner.create(acme(time!(9:00), time!(10:00))).expect("in-memory insert still succeeds");
        assert!(planner.is_dirty());
        assert_eq!(planner.store().len(), 1);
        assert!(planner.flush().is_err());

        planner.persistence().failing.set(false);
        assert!(planner.flush().is_ok());
        assert!(!planner.is_dirty());
        assert_eq!(planner.persistence().saved.get(), 1);
    }

    #[test]
    fn interact_saves_only_when_the_store_changed() {
        let mut planner = Planner::open(MemoryPersistence::new());
        let len = planner.interact(|store| store.len());
        assert_eq!(len, 0);
        assert_eq!(planner.persistence().save_count(), 0);

        let accepted = planner.interact(|store| store.upsert(acme(time!(9:00), time!(10:00))));
        assert_eq!(accepted, Ok(Accepted::Inserted));
        assert_eq!(planner.persistence().save_count(), 1);
    }
}

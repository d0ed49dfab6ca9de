//! Authoritative in-memory task collection for the current session.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use time::{Date, Time};
use timegrid_core::clock::format_hhmm;
use timegrid_core::{Task, TaskId, TaskQuery, ValidationError};
use tracing::{debug, warn};

/// A candidate overlaps an already stored task on the same date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "overlaps an existing task on {date} ({}–{})",
    hhmm(.existing_start),
    hhmm(.existing_end)
)]
pub struct ConflictError {
    /// The stored task the candidate collides with.
    pub existing: TaskId,
    /// Shared date.
    pub date: Date,
    /// Start of the stored task.
    pub existing_start: Time,
    /// End of the stored task.
    pub existing_end: Time,
}

fn hhmm(time: &Time) -> String {
    format_hhmm(*time)
}

/// Why a candidate task was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Range, granularity, required fields or description length.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Overlap with another task on the same date.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// How an accepted upsert changed the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// The id was new.
    Inserted,
    /// An existing task with the same id was replaced.
    Replaced,
}

/// A bulk insert where at least one candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of the tasks were rejected", .rejected.len())]
pub struct BatchRejected {
    /// Position in the submitted batch and the reason, in submission order.
    pub rejected: Vec<(usize, StoreError)>,
}

/// Distinct non-empty values used to populate form dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionLists {
    /// Client names of billable tasks.
    pub clients: BTreeSet<String>,
    /// Work types of non-billable tasks.
    pub types: BTreeSet<String>,
    /// Project names.
    pub projects: BTreeSet<String>,
    /// Quote references.
    pub quotes: BTreeSet<String>,
}

/// Validated task collection.
///
/// Every stored task satisfies the per-task invariants and no two tasks on the
/// same date overlap. Tasks are kept ordered by `(date, start, id)`.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    task_index: HashMap<TaskId, usize>,
    revision: u64,
}

impl TaskStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted tasks, dropping entries that no longer
    /// satisfy the invariants.
    #[must_use]
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut store = Self::new();
        for task in tasks {
            let id = task.id;
            if let Err(err) = store.upsert(task) {
                warn!(task = %id, "dropping persisted task: {err}");
            }
        }
        store.revision = 0;
        store
    }

    /// Validate a candidate and insert or replace it. Empty optional text is
    /// stored as absent.
    ///
    /// # Errors
    /// Returns [`StoreError::Validation`] when the task itself is invalid and
    /// [`StoreError::Conflict`] when it overlaps another task on its date. The
    /// store is unchanged on error.
    pub fn upsert(&mut self, task: Task) -> Result<Accepted, StoreError> {
        let task = task.normalized();
        task.validate()?;
        if let Some(existing) = self.conflict_for(&task) {
            return Err(ConflictError {
                existing: existing.id,
                date: existing.date,
                existing_start: existing.start,
                existing_end: existing.end,
            }
            .into());
        }

        let id = task.id;
        let accepted = match self.task_index.get(&id).and_then(|&idx| self.tasks.get_mut(idx)) {
            Some(slot) => {
                *slot = task;
                Accepted::Replaced
            }
            None => {
                self.tasks.push(task);
                Accepted::Inserted
            }
        };
        self.reindex();
        self.revision += 1;
        debug!(task = %id, ?accepted, "task accepted");
        Ok(accepted)
    }

    /// Remove a task. Unknown ids are ignored.
    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        let idx = self.task_index.get(&id).copied()?;
        let removed = self.tasks.remove(idx);
        self.reindex();
        self.revision += 1;
        debug!(task = %id, "task deleted");
        Some(removed)
    }

    /// Insert a batch atomically: each candidate is validated against the
    /// store and the candidates accepted before it. Nothing is applied unless
    /// every candidate is accepted.
    ///
    /// # Errors
    /// Returns every rejection, keyed by position in the batch.
    pub fn import_all(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<usize, BatchRejected> {
        let mut scratch = self.clone();
        let mut rejected = Vec::new();
        let mut accepted = 0;
        for (position, task) in tasks.into_iter().enumerate() {
            match scratch.upsert(task) {
                Ok(_) => accepted += 1,
                Err(err) => rejected.push((position, err)),
            }
        }
        if !rejected.is_empty() {
            return Err(BatchRejected { rejected });
        }
        scratch.revision = self.revision + 1;
        *self = scratch;
        Ok(accepted)
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.task_index.get(&id).and_then(|&idx| self.tasks.get(idx))
    }

    /// Iterate over every task in `(date, start)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Lazily filter tasks with a query.
    pub fn query<'a>(&'a self, query: &'a TaskQuery) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |task| query.matches(task))
    }

    /// Lazily filter tasks with an arbitrary predicate.
    pub fn select<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a Task> + 'a
    where
        P: FnMut(&Task) -> bool + 'a,
    {
        self.tasks.iter().filter(move |task| predicate(task))
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Counter bumped by every successful mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Snapshot of every stored task.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Distinct non-empty clients, types, projects and quotes across all tasks.
    #[must_use]
    pub fn options(&self) -> OptionLists {
        let mut lists = OptionLists::default();
        for task in &self.tasks {
            insert_non_empty(&mut lists.clients, task.client());
            insert_non_empty(&mut lists.types, task.work_type());
            insert_non_empty(&mut lists.projects, task.project());
            insert_non_empty(&mut lists.quotes, task.quote_ref());
        }
        lists
    }

    fn conflict_for(&self, candidate: &Task) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|other| other.id != candidate.id && other.overlaps(candidate))
    }

    fn reindex(&mut self) {
        self.tasks
            .sort_by(|a, b| (a.date, a.start, a.id).cmp(&(b.date, b.start, b.id)));
        self.task_index.clear();
        for (idx, task) in self.tasks.iter().enumerate() {
            self.task_index.insert(task.id, idx);
        }
    }
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        set.insert(value.to_owned());
    }
}

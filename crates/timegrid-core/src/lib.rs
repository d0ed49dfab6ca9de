//! Domain types, invariants and grid geometry for timegrid.

/// Planning window constants and time helpers.
pub mod clock;
/// Identifier types.
pub mod id;
/// Screen geometry of the weekly grid.
pub mod layout;
/// Read-only task filters.
pub mod query;
/// The task model and its validation.
pub mod task;

pub use crate::id::TaskId;
pub use crate::layout::{CardRect, GridLayout};
pub use crate::query::TaskQuery;
pub use crate::task::{
    Billing, Category, DESCRIPTION_MAX_CHARS, Task, TaskKind, UnknownCategory, ValidationError,
};

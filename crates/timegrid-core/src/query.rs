use std::collections::BTreeSet;

use time::Date;

use crate::clock;
use crate::task::{Category, Task};

/// Read-only predicate over stored tasks.
///
/// Empty fields do not restrict the result; `clients` and `types` match any of
/// their members (logical OR) and are compared case-insensitively after trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Earliest date (inclusive).
    pub from: Option<Date>,
    /// Latest date (inclusive).
    pub until: Option<Date>,
    /// Restrict to one category.
    pub category: Option<Category>,
    /// Accepted client names.
    pub clients: BTreeSet<String>,
    /// Accepted work types.
    pub types: BTreeSet<String>,
}

impl TaskQuery {
    /// Query matching every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Query matching the visible week that contains `date`.
    #[must_use]
    pub fn week_of(date: Date) -> Self {
        let dates = clock::week_dates(clock::week_start(date));
        Self {
            from: dates.first().copied(),
            until: dates.last().copied(),
            ..Self::default()
        }
    }

    /// Restrict to a date range.
    #[must_use]
    pub const fn between(mut self, from: Option<Date>, until: Option<Date>) -> Self {
        self.from = from;
        self.until = until;
        self
    }

    /// Restrict to a category.
    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Add accepted client names (blank entries are ignored).
    #[must_use]
    pub fn with_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.clients.extend(clients.into_iter().filter_map(normalize));
        self
    }

    /// Add accepted work types (blank entries are ignored).
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.types.extend(types.into_iter().filter_map(normalize));
        self
    }

    /// True when no restriction is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.until.is_none()
            && self.category.is_none()
            && self.clients.is_empty()
            && self.types.is_empty()
    }

    /// Evaluate the predicate against a task.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.from.is_some_and(|from| task.date < from) {
            return false;
        }
        if self.until.is_some_and(|until| task.date > until) {
            return false;
        }
        if self.category.is_some_and(|category| task.category() != category) {
            return false;
        }
        if !self.clients.is_empty()
            && !task
                .client()
                .and_then(normalize)
                .is_some_and(|client| self.clients.contains(&client))
        {
            return false;
        }
        if !self.types.is_empty()
            && !task
                .work_type()
                .and_then(normalize)
                .is_some_and(|kind| self.types.contains(&kind))
        {
            return false;
        }
        true
    }
}

fn normalize(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

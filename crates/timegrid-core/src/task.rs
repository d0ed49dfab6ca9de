//! The scheduled unit of work and its invariants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, Duration, Time};
use unicode_segmentation::UnicodeSegmentation;

use crate::clock::{self, DAY_END, DAY_START, format_hhmm};
use crate::id::TaskId;

/// Longest accepted description, in user-perceived characters.
pub const DESCRIPTION_MAX_CHARS: usize = 140;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(hh_mm, Time, "[hour]:[minute]");

/// Billing classification of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Client work that can be invoiced.
    Billable,
    /// Internal work (admin, training, ...).
    NonBillable,
}

impl Category {
    /// Literal used by the interchange format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Billable => "BILLABLE",
            Self::NonBillable => "NON_BILLABLE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category literal is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}` (expected BILLABLE or NON_BILLABLE)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BILLABLE" => Ok(Self::Billable),
            "NON_BILLABLE" => Ok(Self::NonBillable),
            other => Err(UnknownCategory(other.to_owned())),
        }
    }
}

/// Invoicing details carried by billable tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Billing {
    /// Client the work is billed to.
    pub client: String,
    /// Optional project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Optional quote reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_ref: Option<String>,
    /// Whether the work has already been invoiced.
    #[serde(default)]
    pub billed: bool,
}

impl Billing {
    /// Billing details for a client with every optional field empty.
    #[must_use]
    pub fn for_client(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            ..Self::default()
        }
    }
}

/// Category-conditioned fields of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// Client work.
    Billable(Billing),
    /// Internal work of a named type.
    NonBillable {
        /// Work type label.
        #[serde(rename = "type")]
        kind: String,
    },
}

impl TaskKind {
    /// Billable kind for a client with no project, quote or billed flag.
    #[must_use]
    pub fn billable(client: impl Into<String>) -> Self {
        Self::Billable(Billing::for_client(client))
    }

    /// Non-billable kind of the given type.
    #[must_use]
    pub fn non_billable(kind: impl Into<String>) -> Self {
        Self::NonBillable { kind: kind.into() }
    }

    /// Category of this kind.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Billable(_) => Category::Billable,
            Self::NonBillable { .. } => Category::NonBillable,
        }
    }
}

/// Violations of the per-task invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Start is not strictly before end.
    #[error("start time {} must be before end time {}", hhmm(.start), hhmm(.end))]
    EmptyRange {
        /// Proposed start.
        start: Time,
        /// Proposed end.
        end: Time,
    },
    /// A time is not on a half-hour boundary.
    #[error("{} is not on a half-hour boundary", hhmm(.0))]
    OffSlot(Time),
    /// The task leaves the 07:00–20:00 window.
    #[error(
        "task {}–{} must stay between {} and {}",
        hhmm(.start),
        hhmm(.end),
        hhmm(&DAY_START),
        hhmm(&DAY_END)
    )]
    OutOfHours {
        /// Proposed start.
        start: Time,
        /// Proposed end.
        end: Time,
    },
    /// Billable task without a client.
    #[error("billable tasks need a client")]
    MissingClient,
    /// Non-billable task without a type.
    #[error("non-billable tasks need a type")]
    MissingType,
    /// Description exceeds the length bound.
    #[error("description is {len} characters long (max {max})", max = DESCRIPTION_MAX_CHARS)]
    DescriptionTooLong {
        /// Measured length.
        len: usize,
    },
}

fn hhmm(time: &Time) -> String {
    format_hhmm(*time)
}

/// A task placed on the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier.
    pub id: TaskId,
    /// Calendar day of the task.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Start time of day (inclusive).
    #[serde(with = "hh_mm")]
    pub start: Time,
    /// End time of day (exclusive).
    #[serde(with = "hh_mm")]
    pub end: Time,
    /// Category and its conditioned fields.
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Optional free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Task {
    /// Build a task with a freshly minted id. The result is not validated.
    #[must_use]
    pub fn new(date: Date, start: Time, end: Time, kind: TaskKind) -> Self {
        Self {
            id: TaskId::new(),
            date,
            start,
            end,
            kind,
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fold empty optional text (project, quote, description) into `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let TaskKind::Billable(billing) = &mut self.kind {
            billing.project = billing.project.take().filter(|text| !text.is_empty());
            billing.quote_ref = billing.quote_ref.take().filter(|text| !text.is_empty());
        }
        self.description = self.description.filter(|text| !text.is_empty());
        self
    }

    /// Copy every field except the id, which is minted afresh.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: TaskId::new(),
            ..self.clone()
        }
    }

    /// Category of the task.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.kind.category()
    }

    /// Billing details when billable.
    #[must_use]
    pub const fn billing(&self) -> Option<&Billing> {
        match &self.kind {
            TaskKind::Billable(billing) => Some(billing),
            TaskKind::NonBillable { .. } => None,
        }
    }

    /// Client name when billable.
    #[must_use]
    pub fn client(&self) -> Option<&str> {
        self.billing().map(|billing| billing.client.as_str())
    }

    /// Project name when billable and set.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.billing().and_then(|billing| billing.project.as_deref())
    }

    /// Quote reference when billable and set.
    #[must_use]
    pub fn quote_ref(&self) -> Option<&str> {
        self.billing().and_then(|billing| billing.quote_ref.as_deref())
    }

    /// Billed flag when billable.
    #[must_use]
    pub fn billed(&self) -> Option<bool> {
        self.billing().map(|billing| billing.billed)
    }

    /// Work type when non-billable.
    #[must_use]
    pub fn work_type(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::NonBillable { kind } => Some(kind.as_str()),
            TaskKind::Billable(_) => None,
        }
    }

    /// Length of the task.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(clock::minutes_between(self.start, self.end)))
    }

    /// Length of the task in hours (fractional for half hours).
    #[must_use]
    pub fn duration_hours(&self) -> f64 {
        f64::from(clock::minutes_between(self.start, self.end)) / 60.0
    }

    /// True when both tasks share a date and their half-open intervals intersect.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }

    /// Check range, granularity, required fields and description length.
    ///
    /// # Errors
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start >= self.end {
            return Err(ValidationError::EmptyRange {
                start: self.start,
                end: self.end,
            });
        }
        for time in [self.start, self.end] {
            if !clock::is_slot_aligned(time) {
                return Err(ValidationError::OffSlot(time));
            }
        }
        if self.start < DAY_START || self.end > DAY_END {
            return Err(ValidationError::OutOfHours {
                start: self.start,
                end: self.end,
            });
        }
        match &self.kind {
            TaskKind::Billable(billing) if billing.client.trim().is_empty() => {
                return Err(ValidationError::MissingClient);
            }
            TaskKind::NonBillable { kind } if kind.trim().is_empty() => {
                return Err(ValidationError::MissingType);
            }
            _ => {}
        }
        if let Some(description) = &self.description {
            let len = description.graphemes(true).count();
            if len > DESCRIPTION_MAX_CHARS {
                return Err(ValidationError::DescriptionTooLong { len });
            }
        }
        Ok(())
    }
}

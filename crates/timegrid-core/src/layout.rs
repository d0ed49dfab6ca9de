//! Geometry of the weekly grid.
//!
//! Offsets are measured from the top-left corner of the first day column at
//! [`DAY_START`]; `y` grows downwards one [`GridLayout::slot_px`] per slot and
//! `x` grows rightwards one [`GridLayout::day_column_width`] per day.

use serde::{Deserialize, Serialize};
use time::Time;

use crate::clock::{self, DAY_COUNT, DAY_END, DAY_START, SLOT_COUNT, SLOT_MINUTES};
use crate::task::Task;

/// Default height of one half-hour slot in pixels.
pub const DEFAULT_SLOT_PX: f32 = 24.0;
/// Default width of one day column in pixels.
pub const DEFAULT_DAY_COLUMN_WIDTH: f32 = 160.0;

/// Pixel sizes of the grid. The time window itself is fixed (see [`crate::clock`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Height of one slot.
    pub slot_px: f32,
    /// Width of one day column.
    pub day_column_width: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            slot_px: DEFAULT_SLOT_PX,
            day_column_width: DEFAULT_DAY_COLUMN_WIDTH,
        }
    }
}

/// Screen rectangle of a task card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl GridLayout {
    /// Layout with explicit pixel sizes.
    #[must_use]
    pub const fn new(slot_px: f32, day_column_width: f32) -> Self {
        Self {
            slot_px,
            day_column_width,
        }
    }

    /// Vertical offset of a time of day.
    #[must_use]
    pub fn time_to_offset(&self, time: Time) -> f32 {
        let minutes = clock::minutes_between(DAY_START, time);
        f32::from(i16::try_from(minutes).unwrap_or(i16::MAX)) / f32::from(SLOT_MINUTES)
            * self.slot_px
    }

    /// Time of day at a vertical offset, snapped to the nearest slot and kept
    /// within `[DAY_START, DAY_END - slot]`.
    #[must_use]
    pub fn offset_to_time(&self, offset: f32) -> Time {
        let slot = self.snap_duration(offset).clamp(0, SLOT_COUNT - 1);
        clock::time_at_slot(slot)
    }

    /// Number of whole slots nearest to a pixel delta, bounded by the grid height.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn snap_duration(&self, delta: f32) -> i32 {
        if self.slot_px <= 0.0 {
            return 0;
        }
        ((delta / self.slot_px).round() as i32).clamp(-SLOT_COUNT, SLOT_COUNT)
    }

    /// Number of whole days nearest to a horizontal pixel delta, bounded by the week.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn day_shift(&self, delta: f32) -> i32 {
        if self.day_column_width <= 0.0 {
            return 0;
        }
        let days = i32::from(DAY_COUNT);
        ((delta / self.day_column_width).round() as i32).clamp(-days, days)
    }

    /// Day column under a horizontal offset, clamped to the visible week.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn day_at(&self, x: f32) -> u8 {
        if self.day_column_width <= 0.0 {
            return 0;
        }
        let column = (x / self.day_column_width).floor();
        column.clamp(0.0, f32::from(DAY_COUNT - 1)) as u8
    }

    /// Horizontal offset of a day column's left edge.
    #[must_use]
    pub fn day_offset(&self, day: u8) -> f32 {
        f32::from(day) * self.day_column_width
    }

    /// Number of slot rows.
    #[must_use]
    pub const fn slot_count(&self) -> i32 {
        SLOT_COUNT
    }

    /// Total height of the grid body.
    #[must_use]
    pub fn grid_height(&self) -> f32 {
        self.time_to_offset(DAY_END)
    }

    /// Rectangle of a task card, or `None` for a date without a column (Sunday).
    #[must_use]
    pub fn card_rect(&self, task: &Task) -> Option<CardRect> {
        let day = clock::day_index(task.date)?;
        let y = self.time_to_offset(task.start);
        Some(CardRect {
            x: self.day_offset(day),
            y,
            width: self.day_column_width,
            height: self.time_to_offset(task.end) - y,
        })
    }
}

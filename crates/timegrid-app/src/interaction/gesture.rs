use time::{Date, Time};
use timegrid_core::{Task, TaskId};

use super::capture::PointerGrab;
use crate::task_store::StoreError;

/// Movement (in pixels, either axis) a press must exceed to become a drag or resize.
pub const DRAG_THRESHOLD_PX: f32 = 3.0;

/// Pointer position relative to the top-left corner of the grid body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPos {
    /// Horizontal offset.
    pub x: f32,
    /// Vertical offset.
    pub y: f32,
}

impl PointerPos {
    /// Position at `(x, y)`.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Cumulative pointer displacement since the gesture started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerDelta {
    /// Horizontal displacement.
    pub dx: f32,
    /// Vertical displacement.
    pub dy: f32,
}

impl PointerDelta {
    fn between(from: PointerPos, to: PointerPos) -> Self {
        Self {
            dx: to.x - from.x,
            dy: to.y - from.y,
        }
    }

    /// True when the displacement exceeds [`DRAG_THRESHOLD_PX`] in either axis.
    #[must_use]
    pub fn exceeds_threshold(self) -> bool {
        self.dx.abs() > DRAG_THRESHOLD_PX || self.dy.abs() > DRAG_THRESHOLD_PX
    }
}

/// Resize handle of a task card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Top handle: moves the start, keeps the end.
    Top,
    /// Bottom handle: moves the end, keeps the start.
    Bottom,
}

/// What the pointer went down on, as hit-tested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The body of a task card.
    TaskBody(TaskId),
    /// A resize handle of a task card.
    ResizeHandle(TaskId, Edge),
    /// A grid cell without a task.
    EmptyCell,
    /// Anything outside the grid body.
    Outside,
}

/// Date and slot-aligned time under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverTarget {
    /// Day column under the pointer.
    pub date: Date,
    /// Slot under the pointer.
    pub time: Time,
}

/// A gesture in progress, keyed by the task it started on.
#[derive(Debug)]
pub struct Gesture {
    origin: Task,
    start: PointerPos,
    delta: PointerDelta,
    _grab: PointerGrab,
}

impl Gesture {
    pub(super) fn begin(origin: Task, start: PointerPos, grab: PointerGrab) -> Self {
        Self {
            origin,
            start,
            delta: PointerDelta { dx: 0.0, dy: 0.0 },
            _grab: grab,
        }
    }

    pub(super) fn track(&mut self, pos: PointerPos) {
        self.delta = PointerDelta::between(self.start, pos);
    }

    /// Id of the task the gesture started on.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.origin.id
    }

    /// Task as it was when the gesture started.
    #[must_use]
    pub const fn origin(&self) -> &Task {
        &self.origin
    }

    /// Pointer position at pointer-down.
    #[must_use]
    pub const fn start(&self) -> PointerPos {
        self.start
    }

    /// Accumulated displacement.
    #[must_use]
    pub const fn delta(&self) -> PointerDelta {
        self.delta
    }
}

/// Interaction state machine.
#[derive(Debug, Default)]
pub enum GestureState {
    /// No gesture.
    #[default]
    Idle,
    /// Pressed on a card body, still within the click threshold.
    PotentiallyDragging(Gesture),
    /// Moving a card.
    Dragging(Gesture),
    /// Pressed on a resize handle, still within the click threshold.
    PotentiallyResizing(Gesture, Edge),
    /// Resizing a card.
    Resizing(Gesture, Edge),
}

/// Discriminant of [`GestureState`] for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    /// See [`GestureState::Idle`].
    Idle,
    /// See [`GestureState::PotentiallyDragging`].
    PotentiallyDragging,
    /// See [`GestureState::Dragging`].
    Dragging,
    /// See [`GestureState::PotentiallyResizing`].
    PotentiallyResizing,
    /// See [`GestureState::Resizing`].
    Resizing,
}

impl GestureState {
    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        match self {
            Self::Idle => GesturePhase::Idle,
            Self::PotentiallyDragging(_) => GesturePhase::PotentiallyDragging,
            Self::Dragging(_) => GesturePhase::Dragging,
            Self::PotentiallyResizing(..) => GesturePhase::PotentiallyResizing,
            Self::Resizing(..) => GesturePhase::Resizing,
        }
    }

    /// The active gesture, if any.
    #[must_use]
    pub const fn gesture(&self) -> Option<&Gesture> {
        match self {
            Self::Idle => None,
            Self::PotentiallyDragging(gesture)
            | Self::Dragging(gesture)
            | Self::PotentiallyResizing(gesture, _)
            | Self::Resizing(gesture, _) => Some(gesture),
        }
    }
}

/// Visual feedback for an active gesture. Never applied to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    /// Translate the card by the raw pointer displacement.
    Translate {
        /// Card being dragged.
        task: TaskId,
        /// Horizontal translation.
        dx: f32,
        /// Vertical translation.
        dy: f32,
    },
    /// Draw the card with snapped bounds.
    Resize {
        /// Card being resized.
        task: TaskId,
        /// Snapped start.
        start: Time,
        /// Snapped end.
        end: Time,
    },
}

/// Result of a pointer or clipboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing for the host to do.
    Nothing,
    /// Open the create-task form at this slot.
    OpenCreate(HoverTarget),
    /// A card was clicked without moving: open its edit form.
    OpenEdit(TaskId),
    /// The candidate was accepted and stored.
    Committed(Task),
    /// The candidate was rejected; the store is unchanged.
    Rejected {
        /// Id of the discarded candidate.
        task: TaskId,
        /// Why it was rejected.
        error: StoreError,
    },
}

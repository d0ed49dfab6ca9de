//! Pointer-driven move / resize / duplicate gestures on the weekly grid.
//!
//! The controller never touches the store while a gesture is in flight. On
//! release it builds a candidate task and submits it through
//! [`TaskStore::upsert`]; a rejected candidate is simply dropped.

use std::mem;
use std::rc::Rc;

use time::{Date, Duration};
use timegrid_core::clock::{self, DAY_COUNT, SLOT_COUNT};
use timegrid_core::{GridLayout, Task, TaskId};
use tracing::{debug, warn};

use crate::task_store::TaskStore;

mod capture;
mod gesture;
#[cfg(test)]
mod tests;

pub use capture::{PassiveCapture, PointerCapture, PointerGrab};
pub use gesture::{
    DRAG_THRESHOLD_PX, Edge, Gesture, GesturePhase, GestureState, HoverTarget, Outcome,
    PointerDelta, PointerPos, PointerTarget, Preview,
};

/// Single-pointer interaction state for one visible week.
pub struct InteractionController {
    layout: GridLayout,
    week: Date,
    capture: Rc<dyn PointerCapture>,
    state: GestureState,
    hover: Option<HoverTarget>,
    hovered_task: Option<TaskId>,
    clipboard: Option<Task>,
}

impl InteractionController {
    /// Controller for the week containing `week_of`.
    #[must_use]
    pub fn new(layout: GridLayout, week_of: Date, capture: Rc<dyn PointerCapture>) -> Self {
        Self {
            layout,
            week: clock::week_start(week_of),
            capture,
            state: GestureState::Idle,
            hover: None,
            hovered_task: None,
            clipboard: None,
        }
    }

    /// Grid geometry in use.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Monday of the visible week.
    #[must_use]
    pub const fn week(&self) -> Date {
        self.week
    }

    /// Switch to the week containing `date`. Clears the hover target.
    pub fn show_week(&mut self, date: Date) {
        self.week = clock::week_start(date);
        self.hover = None;
        self.hovered_task = None;
    }

    /// Current state machine.
    #[must_use]
    pub const fn state(&self) -> &GestureState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GesturePhase {
        self.state.phase()
    }

    /// Slot under the pointer, if the pointer is over the grid.
    #[must_use]
    pub const fn hover_target(&self) -> Option<HoverTarget> {
        self.hover
    }

    /// Task copied last, if any.
    #[must_use]
    pub const fn clipboard(&self) -> Option<&Task> {
        self.clipboard.as_ref()
    }

    /// Slot at a grid position.
    #[must_use]
    pub fn target_at(&self, pos: PointerPos) -> HoverTarget {
        let day = self.layout.day_at(pos.x);
        let date = self
            .week
            .checked_add(Duration::days(i64::from(day)))
            .unwrap_or(self.week);
        HoverTarget {
            date,
            time: self.layout.offset_to_time(pos.y),
        }
    }

    /// Pointer pressed.
    ///
    /// A press on a card body or handle starts a gesture and acquires the
    /// pointer capture; a press on an empty cell asks the host to open the
    /// create form there.
    pub fn pointer_down(&mut self, target: PointerTarget, pos: PointerPos, store: &TaskStore) -> Outcome {
        if self.state.gesture().is_some() {
            warn!("pointer down while a gesture is active; cancelling it");
            self.cancel();
        }

        match target {
            PointerTarget::TaskBody(id) => {
                let Some(task) = store.get(id) else {
                    return Outcome::Nothing;
                };
                let gesture = Gesture::begin(task.clone(), pos, PointerGrab::acquire(&self.capture));
                self.state = GestureState::PotentiallyDragging(gesture);
                debug!(task = %id, "press on card");
                Outcome::Nothing
            }
            PointerTarget::ResizeHandle(id, edge) => {
                let Some(task) = store.get(id) else {
                    return Outcome::Nothing;
                };
                let gesture = Gesture::begin(task.clone(), pos, PointerGrab::acquire(&self.capture));
                self.state = GestureState::PotentiallyResizing(gesture, edge);
                debug!(task = %id, ?edge, "press on resize handle");
                Outcome::Nothing
            }
            PointerTarget::EmptyCell => Outcome::OpenCreate(self.target_at(pos)),
            PointerTarget::Outside => Outcome::Nothing,
        }
    }

    /// Pointer moved over the grid; `under` is the card below the pointer.
    ///
    /// Updates the hover target and, during a gesture, the accumulated delta.
    /// Returns the visual feedback for an active drag or resize.
    pub fn pointer_move(&mut self, pos: PointerPos, under: Option<TaskId>) -> Option<Preview> {
        self.hover = Some(self.target_at(pos));
        self.hovered_task = under;

        self.state = match mem::take(&mut self.state) {
            GestureState::PotentiallyDragging(mut gesture) => {
                gesture.track(pos);
                if gesture.delta().exceeds_threshold() {
                    debug!(task = %gesture.task_id(), "drag started");
                    GestureState::Dragging(gesture)
                } else {
                    GestureState::PotentiallyDragging(gesture)
                }
            }
            GestureState::Dragging(mut gesture) => {
                gesture.track(pos);
                GestureState::Dragging(gesture)
            }
            GestureState::PotentiallyResizing(mut gesture, edge) => {
                gesture.track(pos);
                if gesture.delta().exceeds_threshold() {
                    debug!(task = %gesture.task_id(), ?edge, "resize started");
                    GestureState::Resizing(gesture, edge)
                } else {
                    GestureState::PotentiallyResizing(gesture, edge)
                }
            }
            GestureState::Resizing(mut gesture, edge) => {
                gesture.track(pos);
                GestureState::Resizing(gesture, edge)
            }
            GestureState::Idle => GestureState::Idle,
        };

        self.preview()
    }

    /// Pointer left the grid body. Active gestures keep tracking.
    pub const fn pointer_leave(&mut self) {
        self.hover = None;
        self.hovered_task = None;
    }

    /// Visual feedback for the active gesture.
    #[must_use]
    pub fn preview(&self) -> Option<Preview> {
        match &self.state {
            GestureState::Dragging(gesture) => {
                let delta = gesture.delta();
                Some(Preview::Translate {
                    task: gesture.task_id(),
                    dx: delta.dx,
                    dy: delta.dy,
                })
            }
            GestureState::Resizing(gesture, edge) => {
                let candidate = self.resized(gesture.origin(), *edge, gesture.delta().dy);
                Some(Preview::Resize {
                    task: gesture.task_id(),
                    start: candidate.start,
                    end: candidate.end,
                })
            }
            _ => None,
        }
    }

    /// Pointer released: ends the gesture and releases the capture.
    ///
    /// A drag or resize submits its candidate to the store. A press that never
    /// crossed the threshold is a click: on a card body it opens the edit form,
    /// on a handle it does nothing.
    pub fn pointer_up(&mut self, pos: PointerPos, store: &mut TaskStore) -> Outcome {
        let candidate = match mem::take(&mut self.state) {
            GestureState::Idle => return Outcome::Nothing,
            GestureState::PotentiallyDragging(mut gesture) => {
                gesture.track(pos);
                if !gesture.delta().exceeds_threshold() {
                    return Outcome::OpenEdit(gesture.task_id());
                }
                self.moved(gesture.origin(), gesture.delta())
            }
            GestureState::Dragging(mut gesture) => {
                gesture.track(pos);
                self.moved(gesture.origin(), gesture.delta())
            }
            GestureState::PotentiallyResizing(mut gesture, edge) => {
                gesture.track(pos);
                if !gesture.delta().exceeds_threshold() {
                    return Outcome::Nothing;
                }
                self.resized(gesture.origin(), edge, gesture.delta().dy)
            }
            GestureState::Resizing(mut gesture, edge) => {
                gesture.track(pos);
                self.resized(gesture.origin(), edge, gesture.delta().dy)
            }
        };
        // The gesture (and its grab) is gone by now; only the candidate survives.
        Self::commit(store, candidate)
    }

    /// Abort the active gesture without committing anything.
    pub fn cancel(&mut self) {
        if let Some(gesture) = self.state.gesture() {
            debug!(task = %gesture.task_id(), "gesture cancelled");
        }
        self.state = GestureState::Idle;
    }

    /// Copy the card under the pointer into the clipboard.
    ///
    /// Returns the copied task, or `None` (clipboard untouched) when the
    /// pointer is not over a card.
    pub fn copy(&mut self, store: &TaskStore) -> Option<&Task> {
        let task = self.hovered_task.and_then(|id| store.get(id))?;
        debug!(task = %task.id, "task copied");
        self.clipboard = Some(task.clone());
        self.clipboard.as_ref()
    }

    /// Paste the clipboard task at the hover target under a fresh id.
    ///
    /// The start is pulled earlier when needed so the copied duration still
    /// ends by closing time.
    pub fn paste(&mut self, store: &mut TaskStore) -> Outcome {
        let (Some(template), Some(target)) = (&self.clipboard, self.hover) else {
            debug!("paste ignored: empty clipboard or no hover target");
            return Outcome::Nothing;
        };
        let length = slot_length(template);
        let start = clock::slot_of(target.time).clamp(0, SLOT_COUNT - length);
        let candidate = Task {
            id: TaskId::new(),
            date: target.date,
            start: clock::time_at_slot(start),
            end: clock::time_at_slot(start + length),
            ..template.clone()
        };
        Self::commit(store, candidate)
    }

    fn moved(&self, origin: &Task, delta: PointerDelta) -> Task {
        let day = i32::from(clock::day_index(origin.date).unwrap_or(0));
        let target_day = day
            .saturating_add(self.layout.day_shift(delta.dx))
            .clamp(0, i32::from(DAY_COUNT) - 1);
        let date = origin
            .date
            .checked_add(Duration::days(i64::from(target_day - day)))
            .unwrap_or(origin.date);

        let length = slot_length(origin);
        let start = clock::slot_of(origin.start)
            .saturating_add(self.layout.snap_duration(delta.dy))
            .clamp(0, SLOT_COUNT - length);
        Task {
            date,
            start: clock::time_at_slot(start),
            end: clock::time_at_slot(start + length),
            ..origin.clone()
        }
    }

    fn resized(&self, origin: &Task, edge: Edge, dy: f32) -> Task {
        let shift = self.layout.snap_duration(dy);
        let start = clock::slot_of(origin.start);
        let end = clock::slot_of(origin.end);
        let (start, end) = match edge {
            Edge::Bottom => {
                let length = (end - start).saturating_add(shift).clamp(1, SLOT_COUNT - start);
                (start, start + length)
            }
            Edge::Top => (start.saturating_add(shift).clamp(0, end - 1), end),
        };
        Task {
            start: clock::time_at_slot(start),
            end: clock::time_at_slot(end),
            ..origin.clone()
        }
    }

    fn commit(store: &mut TaskStore, candidate: Task) -> Outcome {
        let id = candidate.id;
        match store.upsert(candidate.clone()) {
            Ok(_) => Outcome::Committed(candidate),
            Err(error) => {
                warn!(task = %id, "mutation rejected: {error}");
                Outcome::Rejected { task: id, error }
            }
        }
    }
}

fn slot_length(task: &Task) -> i32 {
    (clock::slot_of(task.end) - clock::slot_of(task.start)).max(1)
}

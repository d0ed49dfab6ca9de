use std::cell::Cell;
use std::rc::Rc;

use time::macros::{date, time};
use time::Time;
use timegrid_core::{Task, TaskKind};

use super::*;
use crate::task_store::{StoreError, TaskStore};

const MONDAY: time::Date = date!(2025 - 01 - 06);
const SLOT: f32 = 24.0;
const COLUMN: f32 = 160.0;

#[derive(Default)]
struct CountingCapture {
    acquired: Cell<u32>,
    released: Cell<u32>,
}

impl PointerCapture for CountingCapture {
    fn acquire(&self) {
        self.acquired.set(self.acquired.get() + 1);
    }

    fn release(&self) {
        self.released.set(self.released.get() + 1);
    }
}

fn harness() -> (InteractionController, Rc<CountingCapture>) {
    let capture = Rc::new(CountingCapture::default());
    let shared: Rc<dyn PointerCapture> = capture.clone();
    let controller = InteractionController::new(GridLayout::new(SLOT, COLUMN), MONDAY, shared);
    (controller, capture)
}

fn acme(date: time::Date, start: Time, end: Time) -> Task {
    Task::new(date, start, end, TaskKind::billable("Acme"))
}

fn store_with(tasks: &[Task]) -> TaskStore {
    let mut store = TaskStore::new();
    for task in tasks {
        store.upsert(task.clone()).expect("fixture task fits");
    }
    store
}

/// Centre of the card's day column, a few pixels below its top edge.
fn grip(task: &Task) -> PointerPos {
    let layout = GridLayout::new(SLOT, COLUMN);
    let rect = layout.card_rect(task).expect("weekday task");
    PointerPos::new(rect.x + COLUMN / 2.0, rect.y + 4.0)
}

fn offset(pos: PointerPos, dx: f32, dy: f32) -> PointerPos {
    PointerPos::new(pos.x + dx, pos.y + dy)
}

#[test]
fn click_on_card_opens_edit_form() {
    let (mut controller, capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    controller.pointer_down(PointerTarget::TaskBody(task.id), at, &store);
    assert_eq!(controller.phase(), GesturePhase::PotentiallyDragging);
    assert!(controller.pointer_move(offset(at, 2.0, -2.0), Some(task.id)).is_none());
    assert_eq!(controller.phase(), GesturePhase::PotentiallyDragging);

    let outcome = controller.pointer_up(offset(at, 2.0, -2.0), &mut store);
    assert_eq!(outcome, Outcome::OpenEdit(task.id));
    assert_eq!(controller.phase(), GesturePhase::Idle);
    assert_eq!(capture.acquired.get(), 1);
    assert_eq!(capture.released.get(), 1);
    assert_eq!(store.revision(), 1);
}

#[test]
fn drag_moves_card_across_days_and_slots() {
    let (mut controller, capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    controller.pointer_down(PointerTarget::TaskBody(task.id), at, &store);
    let preview = controller.pointer_move(offset(at, COLUMN, 2.0 * SLOT), Some(task.id));
    assert_eq!(controller.phase(), GesturePhase::Dragging);
    assert_eq!(
        preview,
        Some(Preview::Translate {
            task: task.id,
            dx: COLUMN,
            dy: 2.0 * SLOT,
        })
    );
    // The store only changes on release.
    assert_eq!(store.get(task.id), Some(&task));

    let Outcome::Committed(moved) = controller.pointer_up(offset(at, COLUMN, 2.0 * SLOT), &mut store) else {
        panic!("drag should commit");
    };
    assert_eq!(moved.id, task.id);
    assert_eq!(moved.date, date!(2025 - 01 - 07));
    assert_eq!((moved.start, moved.end), (time!(10:00), time!(11:00)));
    assert_eq!(store.get(task.id), Some(&moved));
    assert_eq!(capture.released.get(), 1);
}

#[test]
fn drag_snaps_to_nearest_slot_and_clamps_to_the_window() {
    let (mut controller, _capture) = harness();
    let task = acme(date!(2025 - 01 - 10), time!(18:00), time!(19:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    controller.pointer_down(PointerTarget::TaskBody(task.id), at, &store);
    controller.pointer_move(offset(at, 5.0 * COLUMN, 10.0 * SLOT), None);
    let Outcome::Committed(moved) = controller.pointer_up(offset(at, 5.0 * COLUMN, 10.0 * SLOT), &mut store)
    else {
        panic!("clamped drag should commit");
    };
    assert_eq!(moved.date, date!(2025 - 01 - 11));
    assert_eq!((moved.start, moved.end), (time!(19:00), time!(20:00)));
}

#[test]
fn pointer_far_outside_the_grid_still_clamps() {
    let (mut controller, capture) = harness();
    let task = acme(date!(2025 - 01 - 08), time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    let far = PointerPos::new(1e12, 1e12);
    controller.pointer_down(PointerTarget::TaskBody(task.id), at, &store);
    controller.pointer_move(far, None);
    let Outcome::Committed(moved) = controller.pointer_up(far, &mut store) else {
        panic!("far drag should commit");
    };
    assert_eq!(moved.date, date!(2025 - 01 - 11));
    assert_eq!((moved.start, moved.end), (time!(19:00), time!(20:00)));

    let near = PointerPos::new(-1e12, -1e12);
    let at = grip(&moved);
    controller.pointer_down(PointerTarget::TaskBody(task.id), at, &store);
    controller.pointer_move(near, None);
    let Outcome::Committed(back) = controller.pointer_up(near, &mut store) else {
        panic!("far drag should commit");
    };
    assert_eq!(back.date, MONDAY);
    assert_eq!((back.start, back.end), (time!(7:00), time!(8:00)));

    let at = grip(&back);
    controller.pointer_down(PointerTarget::ResizeHandle(task.id, Edge::Bottom), at, &store);
    controller.pointer_move(far, None);
    let Outcome::Committed(tall) = controller.pointer_up(far, &mut store) else {
        panic!("far resize should commit");
    };
    assert_eq!((tall.start, tall.end), (time!(7:00), time!(20:00)));

    controller.pointer_down(PointerTarget::ResizeHandle(task.id, Edge::Top), at, &store);
    controller.pointer_move(far, None);
    let Outcome::Committed(short) = controller.pointer_up(far, &mut store) else {
        panic!("far resize should commit");
    };
    assert_eq!((short.start, short.end), (time!(19:30), time!(20:00)));
    assert_eq!(capture.released.get(), 4);
}

#[test]
fn rejected_drag_leaves_store_untouched_and_releases_capture() {
    let (mut controller, capture) = harness();
    let dragged = acme(MONDAY, time!(9:00), time!(10:00));
    let blocker = acme(MONDAY, time!(10:00), time!(11:00));
    let mut store = store_with(&[dragged.clone(), blocker.clone()]);
    let revision = store.revision();
    let at = grip(&dragged);

    controller.pointer_down(PointerTarget::TaskBody(dragged.id), at, &store);
    controller.pointer_move(offset(at, 0.0, SLOT), Some(blocker.id));
    let outcome = controller.pointer_up(offset(at, 0.0, SLOT), &mut store);

    let Outcome::Rejected {
        task,
        error: StoreError::Conflict(conflict),
    } = outcome
    else {
        panic!("expected a conflict, got {outcome:?}");
    };
    assert_eq!(task, dragged.id);
    assert_eq!(conflict.existing, blocker.id);
    assert_eq!(store.get(dragged.id), Some(&dragged));
    assert_eq!(store.revision(), revision);
    assert_eq!(capture.acquired.get(), 1);
    assert_eq!(capture.released.get(), 1);
}

#[test]
fn bottom_handle_resizes_end_and_keeps_one_slot_minimum() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);
    let target = PointerTarget::ResizeHandle(task.id, Edge::Bottom);

    controller.pointer_down(target, at, &store);
    let preview = controller.pointer_move(offset(at, 0.0, 3.0 * SLOT), None);
    assert_eq!(controller.phase(), GesturePhase::Resizing);
    assert_eq!(
        preview,
        Some(Preview::Resize {
            task: task.id,
            start: time!(9:00),
            end: time!(11:30),
        })
    );
    let Outcome::Committed(longer) = controller.pointer_up(offset(at, 0.0, 3.0 * SLOT), &mut store) else {
        panic!("resize should commit");
    };
    assert_eq!((longer.start, longer.end), (time!(9:00), time!(11:30)));

    controller.pointer_down(target, at, &store);
    controller.pointer_move(offset(at, 0.0, -20.0 * SLOT), None);
    let Outcome::Committed(shortest) = controller.pointer_up(offset(at, 0.0, -20.0 * SLOT), &mut store) else {
        panic!("resize should commit");
    };
    assert_eq!((shortest.start, shortest.end), (time!(9:00), time!(9:30)));
}

#[test]
fn bottom_handle_stops_at_closing_time() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(18:00), time!(19:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    controller.pointer_down(PointerTarget::ResizeHandle(task.id, Edge::Bottom), at, &store);
    controller.pointer_move(offset(at, 0.0, 8.0 * SLOT), None);
    let Outcome::Committed(resized) = controller.pointer_up(offset(at, 0.0, 8.0 * SLOT), &mut store) else {
        panic!("resize should commit");
    };
    assert_eq!(resized.end, time!(20:00));
}

#[test]
fn top_handle_moves_start_but_never_past_end() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(11:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);
    let target = PointerTarget::ResizeHandle(task.id, Edge::Top);

    controller.pointer_down(target, at, &store);
    controller.pointer_move(offset(at, 0.0, -2.0 * SLOT), None);
    let Outcome::Committed(earlier) = controller.pointer_up(offset(at, 0.0, -2.0 * SLOT), &mut store) else {
        panic!("resize should commit");
    };
    assert_eq!((earlier.start, earlier.end), (time!(8:00), time!(11:00)));

    controller.pointer_down(target, at, &store);
    controller.pointer_move(offset(at, 0.0, 30.0 * SLOT), None);
    let Outcome::Committed(squeezed) = controller.pointer_up(offset(at, 0.0, 30.0 * SLOT), &mut store) else {
        panic!("resize should commit");
    };
    assert_eq!((squeezed.start, squeezed.end), (time!(10:30), time!(11:00)));
}

#[test]
fn handle_click_without_movement_does_nothing() {
    let (mut controller, capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    let at = grip(&task);

    controller.pointer_down(PointerTarget::ResizeHandle(task.id, Edge::Top), at, &store);
    assert_eq!(controller.pointer_up(at, &mut store), Outcome::Nothing);
    assert_eq!(store.get(task.id), Some(&task));
    assert_eq!(capture.released.get(), 1);
}

#[test]
fn empty_cell_opens_create_form_at_snapped_slot() {
    let (mut controller, capture) = harness();
    let store = TaskStore::new();
    let outcome = controller.pointer_down(
        PointerTarget::EmptyCell,
        PointerPos::new(2.5 * COLUMN, 6.2 * SLOT),
        &store,
    );
    assert_eq!(
        outcome,
        Outcome::OpenCreate(HoverTarget {
            date: date!(2025 - 01 - 08),
            time: time!(10:00),
        })
    );
    assert_eq!(controller.phase(), GesturePhase::Idle);
    assert_eq!(capture.acquired.get(), 0);
}

#[test]
fn unknown_task_or_outside_press_is_ignored() {
    let (mut controller, capture) = harness();
    let store = TaskStore::new();
    let ghost = acme(MONDAY, time!(9:00), time!(10:00));
    assert_eq!(
        controller.pointer_down(PointerTarget::TaskBody(ghost.id), PointerPos::default(), &store),
        Outcome::Nothing
    );
    assert_eq!(
        controller.pointer_down(PointerTarget::Outside, PointerPos::default(), &store),
        Outcome::Nothing
    );
    assert_eq!(controller.phase(), GesturePhase::Idle);
    assert_eq!(capture.acquired.get(), 0);
}

#[test]
fn second_press_cancels_the_active_gesture() {
    let (mut controller, capture) = harness();
    let first = acme(MONDAY, time!(9:00), time!(10:00));
    let second = acme(MONDAY, time!(12:00), time!(13:00));
    let mut store = store_with(&[first.clone(), second.clone()]);

    controller.pointer_down(PointerTarget::TaskBody(first.id), grip(&first), &store);
    controller.pointer_move(offset(grip(&first), 0.0, 2.0 * SLOT), None);
    controller.pointer_down(PointerTarget::TaskBody(second.id), grip(&second), &store);
    assert_eq!(capture.acquired.get(), 2);
    assert_eq!(capture.released.get(), 1);

    controller.cancel();
    assert_eq!(controller.phase(), GesturePhase::Idle);
    assert_eq!(capture.released.get(), 2);
    assert_eq!(controller.pointer_up(grip(&second), &mut store), Outcome::Nothing);
    assert_eq!(store.get(first.id), Some(&first));
}

#[test]
fn paste_duplicates_hovered_task_under_a_fresh_id() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(11:00)).with_description("Review");
    let mut store = store_with(std::slice::from_ref(&task));

    assert!(controller.copy(&store).is_none());
    controller.pointer_move(grip(&task), Some(task.id));
    assert_eq!(controller.copy(&store).map(|copied| copied.id), Some(task.id));

    // Late in the day: the start is pulled back so the two hours still fit.
    controller.pointer_move(PointerPos::new(3.5 * COLUMN, 25.0 * SLOT), None);
    let Outcome::Committed(copy) = controller.paste(&mut store) else {
        panic!("paste should commit");
    };
    assert_ne!(copy.id, task.id);
    assert_eq!(copy.date, date!(2025 - 01 - 09));
    assert_eq!((copy.start, copy.end), (time!(18:00), time!(20:00)));
    assert_eq!(copy.description, task.description);
    assert_eq!(copy.kind, task.kind);
    assert_eq!(store.len(), 2);
}

#[test]
fn paste_onto_occupied_slot_is_rejected() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));

    controller.pointer_move(grip(&task), Some(task.id));
    controller.copy(&store);
    let outcome = controller.paste(&mut store);
    assert!(matches!(
        outcome,
        Outcome::Rejected {
            error: StoreError::Conflict(_),
            ..
        }
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn paste_needs_clipboard_and_hover() {
    let (mut controller, _capture) = harness();
    let task = acme(MONDAY, time!(9:00), time!(10:00));
    let mut store = store_with(std::slice::from_ref(&task));
    assert_eq!(controller.paste(&mut store), Outcome::Nothing);

    controller.pointer_move(grip(&task), Some(task.id));
    controller.copy(&store);
    controller.pointer_leave();
    assert!(controller.hover_target().is_none());
    assert_eq!(controller.paste(&mut store), Outcome::Nothing);
    assert!(controller.clipboard().is_some());
}

#[test]
fn showing_another_week_retargets_hover() {
    let (mut controller, _capture) = harness();
    controller.show_week(date!(2025 - 01 - 15));
    assert_eq!(controller.week(), date!(2025 - 01 - 13));
    controller.pointer_move(PointerPos::new(10.0, 0.0), None);
    assert_eq!(
        controller.hover_target(),
        Some(HoverTarget {
            date: date!(2025 - 01 - 13),
            time: time!(7:00),
        })
    );
}

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use taskdeck_core::bulk::{BulkAction, BulkActions};
use taskdeck_core::drag::{DragOutcome, DragSession, DropTarget, apply_drop, commit};
use taskdeck_core::filter::TaskFilter;
use taskdeck_core::snapshot::SnapshotStore;
use taskdeck_core::views::calendar::{CalendarRange, CalendarView};
use taskdeck_core::views::kanban::KanbanBoard;
use taskdeck_core::{Status, Task, TaskId, TaskStore};
use tempfile::tempdir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).single().expect("valid time")
}

fn scenario_store() -> TaskStore {
    let now = t0();
    let make = |id: &str, status| {
        let mut t = Task::new(TaskId::new(id), format!("task {id}"), now);
        t.status = status;
        t
    };
    TaskStore::with_tasks(vec![
        make("1", Status::Todo),
        make("2", Status::Todo),
        make("3", Status::Done),
    ])
}

fn ids(board: &KanbanBoard, status: Status) -> Vec<String> {
    board
        .column_ids(status)
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

#[test]
fn drag_onto_column_appends_and_updates_status() {
    let mut store = scenario_store();
    let later = t0() + Duration::minutes(1);

    let mut board = KanbanBoard::from_store(&store);
    let mut session = DragSession::new();
    session.start(TaskId::new("2"));
    let outcome = session.drop_on(&mut board, DropTarget::Lane(Status::Done.into()));
    commit(&mut store, &board, &outcome, later);

    let rebuilt = KanbanBoard::from_store(&store);
    assert_eq!(ids(&rebuilt, Status::Todo), vec!["1"]);
    assert_eq!(ids(&rebuilt, Status::Done), vec!["3", "2"]);

    let moved = store.get(&TaskId::new("2")).expect("task 2");
    assert_eq!(moved.status, Status::Done);
    assert_eq!(moved.updated_at, later);
}

#[test]
fn drag_onto_task_inserts_before_it() {
    let mut store = scenario_store();
    let later = t0() + Duration::minutes(1);

    let mut board = KanbanBoard::from_store(&store);
    let outcome = apply_drop(&mut board, &TaskId::new("2"), &DropTarget::Task(TaskId::new("3")));
    commit(&mut store, &board, &outcome, later);

    let rebuilt = KanbanBoard::from_store(&store);
    assert_eq!(ids(&rebuilt, Status::Todo), vec!["1"]);
    assert_eq!(ids(&rebuilt, Status::Done), vec!["2", "3"]);
}

#[test]
fn in_column_reorder_keeps_every_task() {
    let mut store = scenario_store();
    let mut board = KanbanBoard::from_store(&store);
    let outcome = apply_drop(&mut board, &TaskId::new("1"), &DropTarget::Task(TaskId::new("2")));
    commit(&mut store, &board, &outcome, t0());

    let mut seen: Vec<String> = store.tasks().iter().map(|t| t.id.to_string()).collect();
    assert_eq!(seen, vec!["2", "1", "3"]);
    seen.sort();
    assert_eq!(seen, vec!["1", "2", "3"]);
    assert!(store.tasks().iter().all(|t| t.updated_at == t0()));
}

#[test]
fn drop_on_own_column_moves_task_last() {
    let mut store = scenario_store();
    let mut board = KanbanBoard::from_store(&store);
    let outcome = apply_drop(&mut board, &TaskId::new("1"), &DropTarget::Lane(Status::Todo.into()));
    assert!(matches!(outcome, DragOutcome::Reordered { .. }));
    commit(&mut store, &board, &outcome, t0());

    let rebuilt = KanbanBoard::from_store(&store);
    assert_eq!(ids(&rebuilt, Status::Todo), vec!["2", "1"]);
    assert_eq!(ids(&rebuilt, Status::Done), vec!["3"]);
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
}

/// a, b due Mar 2; c due Mar 4; x due outside the week; y undated.
fn calendar_store() -> TaskStore {
    let make = |id: &str, due: Option<NaiveDate>| {
        let mut t = Task::new(TaskId::new(id), format!("task {id}"), t0());
        t.due_date = due;
        t
    };
    TaskStore::with_tasks(vec![
        make("a", Some(day(2))),
        make("x", Some(day(20))),
        make("b", Some(day(2))),
        make("y", None),
        make("c", Some(day(4))),
    ])
}

fn store_ids(store: &TaskStore) -> Vec<&str> {
    store.tasks().iter().map(|t| t.id.as_str()).collect()
}

#[test]
fn calendar_drag_writes_due_date_through_store() {
    let mut store = calendar_store();
    let later = t0() + Duration::minutes(5);

    let mut view = CalendarView::build(CalendarRange::Week, day(2), day(2), store.tasks());
    let outcome = apply_drop(&mut view, &TaskId::new("c"), &DropTarget::Task(TaskId::new("a")));
    assert_eq!(
        outcome,
        DragOutcome::Moved {
            task: TaskId::new("c"),
            from: day(4),
            to: day(2)
        }
    );
    commit(&mut store, &view, &outcome, later);

    let moved = store.get(&TaskId::new("c")).expect("task c");
    assert_eq!(moved.due_date, Some(day(2)));
    assert_eq!(moved.updated_at, later);
    assert_eq!(store.get(&TaskId::new("a")).expect("task a").updated_at, t0());
    assert_eq!(store_ids(&store), vec!["c", "x", "a", "y", "b"]);

    let rebuilt = CalendarView::build(CalendarRange::Week, day(2), day(2), store.tasks());
    let on_day: Vec<&str> = rebuilt
        .day(day(2))
        .expect("Mar 2 in view")
        .tasks
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(on_day, vec!["c", "a", "b"]);
    assert!(rebuilt.day(day(4)).expect("Mar 4 in view").tasks.is_empty());
}

#[test]
fn calendar_same_day_reorder_keeps_other_slots() {
    let mut store = calendar_store();
    let mut view = CalendarView::build(CalendarRange::Week, day(2), day(2), store.tasks());
    let outcome = apply_drop(&mut view, &TaskId::new("a"), &DropTarget::Lane(day(2)));
    assert!(matches!(outcome, DragOutcome::Reordered { .. }));
    commit(&mut store, &view, &outcome, t0() + Duration::minutes(5));

    assert_eq!(store_ids(&store), vec!["b", "x", "a", "y", "c"]);
    assert!(store.tasks().iter().all(|t| t.updated_at == t0()));
    assert_eq!(store.get(&TaskId::new("a")).expect("task a").due_date, Some(day(2)));
}

#[test]
fn filter_bulk_and_snapshot_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let snapshots = SnapshotStore::open(temp.path()).expect("open snapshots");
    let mut store = scenario_store();
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");

    store.set_filter(TaskFilter::status(Status::Todo));
    let visible = store.visible_tasks(today);
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|t| t.status == Status::Todo));

    store.select_all_tasks();
    let mut bulk = BulkActions::new();
    assert!(bulk.request(&store, BulkAction::SetDueDate(today)));
    let report = bulk.confirm(&mut store, t0()).expect("pending action");
    assert_eq!(report.affected, 3);

    snapshots.save_store(&store).expect("save");
    let reloaded = snapshots.load_store().expect("load");
    assert_eq!(reloaded.tasks(), store.tasks());
    assert!(reloaded.tasks().iter().all(|t| t.due_date == Some(today)));
}

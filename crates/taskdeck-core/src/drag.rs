use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskPatch};

/// A board made of ordered lanes of tasks. Kanban columns are lanes keyed
/// by status; calendar days are lanes keyed by date.
pub trait Lanes {
    type Key: Clone + PartialEq + fmt::Debug;

    fn lane_count(&self) -> usize;

    fn lane_key(&self, idx: usize) -> Option<Self::Key>;

    fn lane_tasks(&self, idx: usize) -> &[Task];

    fn lane_tasks_mut(&mut self, idx: usize) -> Option<&mut Vec<Task>>;

    /// The field change that makes a task belong to the lane `key`.
    fn membership_patch(key: &Self::Key) -> TaskPatch;

    fn lane_index(&self, key: &Self::Key) -> Option<usize> {
        (0..self.lane_count()).find(|idx| self.lane_key(*idx).as_ref() == Some(key))
    }

    /// Lane index and position of a task.
    fn locate(&self, id: &TaskId) -> Option<(usize, usize)> {
        (0..self.lane_count()).find_map(|lane| {
            self.lane_tasks(lane)
                .iter()
                .position(|t| &t.id == id)
                .map(|pos| (lane, pos))
        })
    }

    /// All task ids, lane by lane.
    fn task_order(&self) -> Vec<TaskId> {
        (0..self.lane_count())
            .flat_map(|lane| self.lane_tasks(lane).iter().map(|t| t.id.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget<K> {
    Lane(K),
    Task(TaskId),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome<K> {
    NoChange,
    Reordered { task: TaskId, lane: K },
    Moved { task: TaskId, from: K, to: K },
}

impl<K> DragOutcome<K> {
    pub fn changed(&self) -> bool {
        !matches!(self, DragOutcome::NoChange)
    }
}

/// Resolves a drop on the board in place.
///
/// Dropping on a task in the same lane moves the dragged task into the
/// target's slot. Dropping on a task in another lane inserts before that
/// task and reassigns lane membership. Dropping on a lane appends to its
/// end, including the task's own lane. Everything else leaves the board
/// untouched.
#[tracing::instrument(skip(lanes, active), fields(active = %active))]
pub fn apply_drop<L: Lanes>(lanes: &mut L, active: &TaskId, target: &DropTarget<L::Key>) -> DragOutcome<L::Key> {
    let Some((from_lane, from_pos)) = lanes.locate(active) else {
        debug!("dragged task is not on the board");
        return DragOutcome::NoChange;
    };
    let Some(from_key) = lanes.lane_key(from_lane) else {
        return DragOutcome::NoChange;
    };

    let (to_lane, to_pos) = match target {
        DropTarget::Nothing => return DragOutcome::NoChange,
        DropTarget::Task(id) if id == active => return DragOutcome::NoChange,
        DropTarget::Task(id) => match lanes.locate(id) {
            Some(found) => found,
            None => {
                debug!(target = %id, "drop on unknown task ignored");
                return DragOutcome::NoChange;
            }
        },
        DropTarget::Lane(key) => match lanes.lane_index(key) {
            Some(idx) if idx == from_lane && from_pos + 1 == lanes.lane_tasks(idx).len() => {
                return DragOutcome::NoChange;
            }
            Some(idx) => (idx, lanes.lane_tasks(idx).len()),
            None => {
                debug!(lane = ?key, "drop on unknown lane ignored");
                return DragOutcome::NoChange;
            }
        },
    };
    let Some(to_key) = lanes.lane_key(to_lane) else {
        return DragOutcome::NoChange;
    };

    let Some(source) = lanes.lane_tasks_mut(from_lane) else {
        return DragOutcome::NoChange;
    };
    let mut task = source.remove(from_pos);

    if to_lane == from_lane {
        let lane = lanes.lane_tasks_mut(to_lane);
        if let Some(lane) = lane {
            let slot = to_pos.min(lane.len());
            lane.insert(slot, task);
        }
        return DragOutcome::Reordered {
            task: active.clone(),
            lane: from_key,
        };
    }

    L::membership_patch(&to_key).apply_to(&mut task);
    match lanes.lane_tasks_mut(to_lane) {
        Some(lane) => {
            let slot = to_pos.min(lane.len());
            lane.insert(slot, task);
        }
        None => {
            // Unreachable in practice: the lane index was resolved above.
            if let Some(source) = lanes.lane_tasks_mut(from_lane) {
                source.insert(from_pos, task);
            }
            return DragOutcome::NoChange;
        }
    }

    DragOutcome::Moved {
        task: active.clone(),
        from: from_key,
        to: to_key,
    }
}

/// Writes a drop result back to the store: lane membership through
/// `update_task`, then the board order.
#[tracing::instrument(skip(store, lanes, outcome, now))]
pub fn commit<L: Lanes>(store: &mut TaskStore, lanes: &L, outcome: &DragOutcome<L::Key>, now: DateTime<Utc>) {
    match outcome {
        DragOutcome::NoChange => return,
        DragOutcome::Moved { task, to, .. } => {
            store.update_task(task, &L::membership_patch(to), now);
            info!(id = %task, lane = ?to, "moved task");
        }
        DragOutcome::Reordered { task, lane } => {
            debug!(id = %task, lane = ?lane, "reordered task");
        }
    }
    store.reorder(&lanes.task_order());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState<K> {
    Idle,
    Dragging { active: TaskId, over: DropTarget<K> },
}

/// One pointer gesture. Only one drag can be in flight per session.
#[derive(Debug, Clone)]
pub struct DragSession<K> {
    state: DragState<K>,
}

impl<K> Default for DragSession<K> {
    fn default() -> Self {
        Self { state: DragState::Idle }
    }
}

impl<K: Clone + PartialEq + fmt::Debug> DragSession<K> {
    pub fn new() -> Self {
        Self { state: DragState::Idle }
    }

    pub fn state(&self) -> &DragState<K> {
        &self.state
    }

    pub fn active(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { active, .. } => Some(active),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    /// Starting a new gesture replaces one that was never finished.
    pub fn start(&mut self, task: TaskId) {
        self.state = DragState::Dragging {
            active: task,
            over: DropTarget::Nothing,
        };
    }

    pub fn hover(&mut self, target: DropTarget<K>) {
        if let DragState::Dragging { over, .. } = &mut self.state {
            *over = target;
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// The lane under the pointer: the hovered lane itself, or the lane
    /// holding the hovered task.
    pub fn hovered_lane<L: Lanes<Key = K>>(&self, lanes: &L) -> Option<K> {
        let DragState::Dragging { over, .. } = &self.state else {
            return None;
        };
        match over {
            DropTarget::Lane(key) => lanes.lane_index(key).map(|_| key.clone()),
            DropTarget::Task(id) => lanes.locate(id).and_then(|(lane, _)| lanes.lane_key(lane)),
            DropTarget::Nothing => None,
        }
    }

    /// Finishes the gesture on the currently hovered target.
    pub fn end<L: Lanes<Key = K>>(&mut self, lanes: &mut L) -> DragOutcome<K> {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => DragOutcome::NoChange,
            DragState::Dragging { active, over } => apply_drop(lanes, &active, &over),
        }
    }

    /// Finishes the gesture on an explicit target.
    pub fn drop_on<L: Lanes<Key = K>>(&mut self, lanes: &mut L, target: DropTarget<K>) -> DragOutcome<K> {
        self.hover(target);
        self.end(lanes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::task::Status;

    /// Minimal two-lane board used to exercise the drop rules.
    struct Board {
        lanes: Vec<(Status, Vec<Task>)>,
    }

    impl Lanes for Board {
        type Key = Status;

        fn lane_count(&self) -> usize {
            self.lanes.len()
        }

        fn lane_key(&self, idx: usize) -> Option<Status> {
            self.lanes.get(idx).map(|(s, _)| *s)
        }

        fn lane_tasks(&self, idx: usize) -> &[Task] {
            self.lanes.get(idx).map(|(_, t)| t.as_slice()).unwrap_or(&[])
        }

        fn lane_tasks_mut(&mut self, idx: usize) -> Option<&mut Vec<Task>> {
            self.lanes.get_mut(idx).map(|(_, t)| t)
        }

        fn membership_patch(key: &Status) -> TaskPatch {
            TaskPatch::status(*key)
        }
    }

    fn board() -> Board {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let task = |id: &str, status| {
            let mut t = Task::new(TaskId::new(id), id, now);
            t.status = status;
            t
        };
        Board {
            lanes: vec![
                (
                    Status::Todo,
                    vec![task("a", Status::Todo), task("b", Status::Todo), task("c", Status::Todo)],
                ),
                (Status::Done, vec![task("d", Status::Done)]),
            ],
        }
    }

    fn ids(board: &Board, lane: usize) -> Vec<&str> {
        board.lane_tasks(lane).iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn same_lane_drop_moves_into_target_slot() {
        let mut b = board();
        let out = apply_drop(&mut b, &TaskId::new("a"), &DropTarget::Task(TaskId::new("c")));
        assert!(matches!(out, DragOutcome::Reordered { .. }));
        assert_eq!(ids(&b, 0), vec!["b", "c", "a"]);

        apply_drop(&mut b, &TaskId::new("a"), &DropTarget::Task(TaskId::new("b")));
        assert_eq!(ids(&b, 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn cross_lane_drop_on_task_inserts_before_it() {
        let mut b = board();
        let out = apply_drop(&mut b, &TaskId::new("b"), &DropTarget::Task(TaskId::new("d")));
        assert_eq!(
            out,
            DragOutcome::Moved {
                task: TaskId::new("b"),
                from: Status::Todo,
                to: Status::Done
            }
        );
        assert_eq!(ids(&b, 0), vec!["a", "c"]);
        assert_eq!(ids(&b, 1), vec!["b", "d"]);
        assert_eq!(b.lane_tasks(1)[0].status, Status::Done);
    }

    #[test]
    fn ignored_drops_leave_board_alone() {
        let mut b = board();
        let a = TaskId::new("a");
        assert_eq!(apply_drop(&mut b, &a, &DropTarget::Nothing), DragOutcome::NoChange);
        assert_eq!(apply_drop(&mut b, &a, &DropTarget::Task(a.clone())), DragOutcome::NoChange);
        assert_eq!(
            apply_drop(&mut b, &a, &DropTarget::Task(TaskId::new("zz"))),
            DragOutcome::NoChange
        );
        assert_eq!(
            apply_drop(&mut b, &a, &DropTarget::Lane(Status::Review)),
            DragOutcome::NoChange
        );
        let c = TaskId::new("c");
        assert_eq!(apply_drop(&mut b, &c, &DropTarget::Lane(Status::Todo)), DragOutcome::NoChange);
        assert_eq!(ids(&b, 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn drop_on_own_lane_moves_to_end() {
        let mut b = board();
        let out = apply_drop(&mut b, &TaskId::new("a"), &DropTarget::Lane(Status::Todo));
        assert_eq!(
            out,
            DragOutcome::Reordered {
                task: TaskId::new("a"),
                lane: Status::Todo
            }
        );
        assert_eq!(ids(&b, 0), vec!["b", "c", "a"]);
        assert_eq!(ids(&b, 1), vec!["d"]);
    }

    #[test]
    fn session_tracks_hovered_lane_and_cancels_cleanly() {
        let mut b = board();
        let mut session = DragSession::new();
        assert_eq!(session.hovered_lane(&b), None);
        session.start(TaskId::new("a"));
        session.hover(DropTarget::Task(TaskId::new("d")));
        assert_eq!(session.hovered_lane(&b), Some(Status::Done));
        session.cancel();
        assert!(!session.is_dragging());
        assert_eq!(session.end(&mut b), DragOutcome::NoChange);
        assert_eq!(ids(&b, 1), vec!["d"]);
    }

    #[test]
    fn session_drop_on_lane_appends() {
        let mut b = board();
        let mut session = DragSession::new();
        session.start(TaskId::new("c"));
        let out = session.drop_on(&mut b, DropTarget::Lane(Status::Done));
        assert!(out.changed());
        assert_eq!(ids(&b, 1), vec!["d", "c"]);
        assert!(session.active().is_none());
    }
}

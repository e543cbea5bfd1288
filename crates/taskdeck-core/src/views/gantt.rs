use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::store::TaskStore;
use crate::task::{Status, Task, TaskId, TaskPatch};

/// One task rendered as a one-day bar ending the day after its due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GanttBar {
    pub id: TaskId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub progress: u8,
    pub project: Option<String>,
}

impl GanttBar {
    pub fn from_task(task: &Task, today: NaiveDate) -> Self {
        let start = task.due_date.unwrap_or(today);
        Self {
            id: task.id.clone(),
            name: task.title.clone(),
            start,
            end: start.checked_add_days(Days::new(1)).unwrap_or(start),
            progress: progress_for(task.status),
            project: task.related_deal.as_ref().map(|deal| deal.name.clone()),
        }
    }
}

pub fn progress_for(status: Status) -> u8 {
    match status {
        Status::Done => 100,
        Status::InProgress | Status::Review => 50,
        Status::Todo => 0,
    }
}

pub fn status_for_progress(progress: u8) -> Status {
    match progress {
        100.. => Status::Done,
        1..=99 => Status::InProgress,
        0 => Status::Todo,
    }
}

pub fn gantt_bars(tasks: &[Task], today: NaiveDate) -> Vec<GanttBar> {
    tasks.iter().map(|task| GanttBar::from_task(task, today)).collect()
}

/// Bar was dragged: its new end date becomes the due date.
#[tracing::instrument(skip(store, now))]
pub fn apply_date_change(store: &mut TaskStore, id: &TaskId, end: NaiveDate, now: DateTime<Utc>) -> bool {
    store.update_task(id, &TaskPatch::due_date(end), now)
}

#[tracing::instrument(skip(store, now))]
pub fn apply_progress_change(store: &mut TaskStore, id: &TaskId, progress: u8, now: DateTime<Utc>) -> bool {
    let status = status_for_progress(progress);
    debug!(%status, "progress mapped to status");
    store.update_task(id, &TaskPatch::status(status), now)
}

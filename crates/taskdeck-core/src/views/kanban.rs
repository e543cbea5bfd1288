use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drag::Lanes;
use crate::store::TaskStore;
use crate::task::{Assignee, FormError, NewTask, Priority, Status, Task, TaskId, TaskPatch, User};
use crate::views::list::UNASSIGNED;

/// Field the board splits its columns on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanAxis {
    #[default]
    Status,
    Priority,
    Assignee,
}

impl fmt::Display for KanbanAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KanbanAxis::Status => "status",
            KanbanAxis::Priority => "priority",
            KanbanAxis::Assignee => "assignee",
        })
    }
}

impl FromStr for KanbanAxis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "status" => Ok(KanbanAxis::Status),
            "priority" => Ok(KanbanAxis::Priority),
            "assignee" | "assignedto" => Ok(KanbanAxis::Assignee),
            other => Err(anyhow::anyhow!("unknown kanban axis: {other}")),
        }
    }
}

/// Identity of one board column. `Assignee(None)` is the unassigned
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "axis", content = "value")]
pub enum ColumnKey {
    Status(Status),
    Priority(Priority),
    Assignee(Option<Assignee>),
}

impl ColumnKey {
    /// The column `task` belongs to on a board split along `axis`.
    pub fn of(axis: KanbanAxis, task: &Task) -> Self {
        match axis {
            KanbanAxis::Status => ColumnKey::Status(task.status),
            KanbanAxis::Priority => ColumnKey::Priority(task.priority),
            KanbanAxis::Assignee => ColumnKey::Assignee(task.assignee.clone()),
        }
    }

    pub fn title(&self, users: &[User]) -> String {
        match self {
            ColumnKey::Status(status) => status.label().to_string(),
            ColumnKey::Priority(priority) => priority_title(*priority).to_string(),
            ColumnKey::Assignee(Some(assignee)) => assignee.display_name(users),
            ColumnKey::Assignee(None) => UNASSIGNED.to_string(),
        }
    }
}

impl From<Status> for ColumnKey {
    fn from(status: Status) -> Self {
        ColumnKey::Status(status)
    }
}

impl From<Priority> for ColumnKey {
    fn from(priority: Priority) -> Self {
        ColumnKey::Priority(priority)
    }
}

impl From<Option<Assignee>> for ColumnKey {
    fn from(assignee: Option<Assignee>) -> Self {
        ColumnKey::Assignee(assignee)
    }
}

fn priority_title(priority: Priority) -> &'static str {
    match priority {
        Priority::Urgent => "Urgent",
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanColumn {
    pub key: ColumnKey,
    pub title: String,
    pub tasks: Vec<Task>,
}

/// Columns along one axis. Status columns follow board order, priority
/// columns run from most to least urgent, and assignee columns start with
/// the unassigned column followed by the known users and then any other
/// assignee found on a task. Every task lands in exactly one column and
/// columns keep store order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub axis: KanbanAxis,
    pub columns: Vec<KanbanColumn>,
}

impl KanbanBoard {
    /// Status board.
    pub fn build(tasks: &[Task]) -> Self {
        Self::build_for(KanbanAxis::Status, tasks, &[])
    }

    pub fn build_for(axis: KanbanAxis, tasks: &[Task], users: &[User]) -> Self {
        let columns = column_keys(axis, tasks, users)
            .into_iter()
            .map(|key| KanbanColumn {
                title: key.title(users),
                tasks: tasks
                    .iter()
                    .filter(|t| ColumnKey::of(axis, t) == key)
                    .cloned()
                    .collect(),
                key,
            })
            .collect();
        Self { axis, columns }
    }

    /// Board along the store's current axis. Assignee columns come from
    /// the tasks alone; use [`KanbanBoard::with_users`] to show every user.
    pub fn from_store(store: &TaskStore) -> Self {
        Self::build_for(store.kanban_axis(), store.tasks(), &[])
    }

    pub fn with_users(store: &TaskStore, users: &[User]) -> Self {
        Self::build_for(store.kanban_axis(), store.tasks(), users)
    }

    pub fn column(&self, key: impl Into<ColumnKey>) -> Option<&KanbanColumn> {
        let key = key.into();
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn column_ids(&self, key: impl Into<ColumnKey>) -> Vec<TaskId> {
        self.column(key)
            .map(|c| c.tasks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Flattened column-by-column order, suitable for `TaskStore::reorder`.
    pub fn into_task_order(self) -> Vec<TaskId> {
        self.columns
            .into_iter()
            .flat_map(|c| c.tasks.into_iter().map(|t| t.id))
            .collect()
    }
}

fn column_keys(axis: KanbanAxis, tasks: &[Task], users: &[User]) -> Vec<ColumnKey> {
    match axis {
        KanbanAxis::Status => Status::ALL.into_iter().map(ColumnKey::Status).collect(),
        KanbanAxis::Priority => Priority::ALL.into_iter().rev().map(ColumnKey::Priority).collect(),
        KanbanAxis::Assignee => {
            let mut keys = vec![ColumnKey::Assignee(None)];
            keys.extend(
                users
                    .iter()
                    .map(|user| ColumnKey::Assignee(Some(Assignee::User(user.id.clone())))),
            );
            for task in tasks {
                let key = ColumnKey::Assignee(task.assignee.clone());
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            keys
        }
    }
}

impl Lanes for KanbanBoard {
    type Key = ColumnKey;

    fn lane_count(&self) -> usize {
        self.columns.len()
    }

    fn lane_key(&self, idx: usize) -> Option<ColumnKey> {
        self.columns.get(idx).map(|c| c.key.clone())
    }

    fn lane_tasks(&self, idx: usize) -> &[Task] {
        self.columns.get(idx).map(|c| c.tasks.as_slice()).unwrap_or(&[])
    }

    fn lane_tasks_mut(&mut self, idx: usize) -> Option<&mut Vec<Task>> {
        self.columns.get_mut(idx).map(|c| &mut c.tasks)
    }

    fn membership_patch(key: &ColumnKey) -> TaskPatch {
        match key {
            ColumnKey::Status(status) => TaskPatch::status(*status),
            ColumnKey::Priority(priority) => TaskPatch {
                priority: Some(*priority),
                ..TaskPatch::default()
            },
            ColumnKey::Assignee(assignee) => TaskPatch {
                assignee: Some(assignee.clone()),
                ..TaskPatch::default()
            },
        }
    }
}

/// Quick-add from a column header: the new task starts in that column.
#[tracing::instrument(skip(store, description, now))]
pub fn add_task_to_column(
    store: &mut TaskStore,
    column: &ColumnKey,
    title: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TaskId, FormError> {
    let mut form = NewTask::titled(title);
    match column {
        ColumnKey::Status(status) => form.status = *status,
        ColumnKey::Priority(priority) => form.priority = *priority,
        ColumnKey::Assignee(assignee) => form.assignee = assignee.clone(),
    }
    form.description = description.map(str::to_string);
    store.create_task(form, now)
}

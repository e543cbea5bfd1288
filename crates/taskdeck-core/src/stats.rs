use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::task::{Status, Task, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    /// Rounded percentage, 0 when there are no tasks.
    pub completion_rate: u8,
}

impl DashboardStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.status == Status::Done).count();
        Self {
            total,
            completed,
            in_progress: tasks.iter().filter(|t| t.status == Status::InProgress).count(),
            overdue: tasks.iter().filter(|t| t.is_overdue(today)).count(),
            completion_rate: percent(completed, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeLoad {
    pub assignee: String,
    pub name: String,
    pub total: usize,
    pub completed: usize,
}

impl AssigneeLoad {
    pub fn completion_rate(&self) -> u8 {
        percent(self.completed, self.total)
    }
}

/// Most recently touched tasks first.
pub fn recent_tasks(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted.truncate(limit);
    sorted
}

/// Per-assignee workload, ordered by assignee key. Unassigned tasks are
/// not counted.
pub fn assignee_load(tasks: &[Task], users: &[User]) -> Vec<AssigneeLoad> {
    let mut by_key: BTreeMap<&str, AssigneeLoad> = BTreeMap::new();
    for task in tasks {
        let Some(assignee) = &task.assignee else {
            continue;
        };
        let entry = by_key.entry(assignee.key()).or_insert_with(|| AssigneeLoad {
            assignee: assignee.key().to_string(),
            name: assignee.display_name(users),
            total: 0,
            completed: 0,
        });
        entry.total += 1;
        if task.status == Status::Done {
            entry.completed += 1;
        }
    }
    by_key.into_values().collect()
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rate = (part as f64 / whole as f64 * 100.0).round();
    rate.clamp(0.0, 100.0) as u8
}

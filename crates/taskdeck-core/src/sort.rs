use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Id,
    Title,
    Status,
    Priority,
    Assignee,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "id" => Ok(SortKey::Id),
            "title" | "subject" => Ok(SortKey::Title),
            "status" => Ok(SortKey::Status),
            "priority" => Ok(SortKey::Priority),
            "assignee" | "assignedto" => Ok(SortKey::Assignee),
            "duedate" | "due" => Ok(SortKey::DueDate),
            "createdat" | "created" | "createdtime" => Ok(SortKey::CreatedAt),
            "updatedat" | "updated" | "modifiedtime" => Ok(SortKey::UpdatedAt),
            _ => Err(anyhow::anyhow!("unknown sort key: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: SortKey::DueDate,
            direction: SortDirection::Asc,
        }
    }
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Clicking the active column flips the direction; a new column starts
    /// ascending.
    pub fn toggled(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.key {
            SortKey::Id => Some(a.id.cmp(&b.id)),
            SortKey::Title => Some(compare_text(&a.title, &b.title)),
            SortKey::Status => Some(a.status.rank().cmp(&b.status.rank())),
            SortKey::Priority => Some(a.priority.rank().cmp(&b.priority.rank())),
            SortKey::Assignee => compare_present(
                a.assignee.as_ref().map(|x| x.key()),
                b.assignee.as_ref().map(|x| x.key()),
                compare_text,
            ),
            SortKey::DueDate => compare_present(a.due_date, b.due_date, |x, y| x.cmp(&y)),
            SortKey::CreatedAt => Some(a.created_at.cmp(&b.created_at)),
            SortKey::UpdatedAt => Some(a.updated_at.cmp(&b.updated_at)),
        };

        match ordering {
            Some(ord) => match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            },
            None => missing_last(self.key, a, b),
        }
    }

    /// Stable sort; tasks missing the key value stay at the end in either
    /// direction.
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }

    pub fn sort_refs(&self, tasks: &mut [&Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// `None` when at least one side is missing the value; the caller orders
/// those without regard to direction.
fn compare_present<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Option<Ordering>
where
    F: Fn(T, T) -> Ordering,
{
    match (a, b) {
        (Some(x), Some(y)) => Some(cmp(x, y)),
        _ => None,
    }
}

fn missing_last(key: SortKey, a: &Task, b: &Task) -> Ordering {
    let (has_a, has_b) = match key {
        SortKey::Assignee => (a.assignee.is_some(), b.assignee.is_some()),
        SortKey::DueDate => (a.due_date.is_some(), b.due_date.is_some()),
        _ => (true, true),
    };
    has_b.cmp(&has_a)
}

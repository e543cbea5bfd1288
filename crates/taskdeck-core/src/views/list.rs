use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

use crate::task::{
  Task,
  User
};

pub const UNASSIGNED: &str =
  "Unassigned";
pub const NO_DUE_DATE: &str =
  "No Due Date";

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GroupAxis {
  #[default]
  None,
  Status,
  Priority,
  Assignee,
  DueDate,
  RelatedDeal
}

impl fmt::Display for GroupAxis {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let name = match self {
      | GroupAxis::None => "none",
      | GroupAxis::Status => "status",
      | GroupAxis::Priority => {
        "priority"
      }
      | GroupAxis::Assignee => {
        "assignee"
      }
      | GroupAxis::DueDate => {
        "due_date"
      }
      | GroupAxis::RelatedDeal => {
        "related_deal"
      }
    };
    f.write_str(name)
  }
}

impl FromStr for GroupAxis {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let normalized: String = s
      .trim()
      .chars()
      .filter(|c| {
        *c != '_' && *c != '-'
      })
      .collect::<String>()
      .to_ascii_lowercase();
    match normalized.as_str() {
      | "" | "none" => {
        Ok(GroupAxis::None)
      }
      | "status" => {
        Ok(GroupAxis::Status)
      }
      | "priority" => {
        Ok(GroupAxis::Priority)
      }
      | "assignee" | "assignedto" => {
        Ok(GroupAxis::Assignee)
      }
      | "duedate" | "due" => {
        Ok(GroupAxis::DueDate)
      }
      | "relateddeal" | "deal" => {
        Ok(GroupAxis::RelatedDeal)
      }
      | _ => {
        Err(anyhow::anyhow!(
          "unknown group axis: {s}"
        ))
      }
    }
  }
}

/// A titled run of tasks in the list
/// view.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct TaskGroup {
  pub key:   String,
  pub title: String,
  pub tasks: Vec<Task>,
  #[serde(skip)]
  order:     (u8, String)
}

/// Groups tasks along `axis`, keeping
/// the incoming order inside each
/// group.
///
/// Status groups follow board order,
/// priority groups run from most to
/// least urgent, due date groups are
/// chronological, and everything else
/// is lexical. Buckets without a value
/// ("Unassigned", "No Due Date") always
/// come last.
#[tracing::instrument(skip(
  tasks, users
))]
pub fn group_tasks(
  tasks: &[Task],
  axis: GroupAxis,
  users: &[User]
) -> Vec<TaskGroup> {
  if axis == GroupAxis::None {
    return vec![TaskGroup {
      key:   "all".to_string(),
      title: "All Tasks".to_string(),
      tasks: tasks.to_vec(),
      order: (0, String::new())
    }];
  }

  let mut groups: Vec<TaskGroup> =
    Vec::new();
  for task in tasks {
    let (key, title, order) =
      classify(task, axis, users);
    match groups
      .iter_mut()
      .find(|g| g.key == key)
    {
      | Some(group) => {
        group.tasks.push(task.clone())
      }
      | None => {
        groups.push(TaskGroup {
          key,
          title,
          tasks: vec![task.clone()],
          order
        })
      }
    }
  }

  groups.sort_by(|a, b| {
    a.order.cmp(&b.order)
  });
  groups
}

fn classify(
  task: &Task,
  axis: GroupAxis,
  users: &[User]
) -> (String, String, (u8, String)) {
  match axis {
    | GroupAxis::None => {
      (
        "all".to_string(),
        "All Tasks".to_string(),
        (0, String::new())
      )
    }
    | GroupAxis::Status => {
      (
        task.status.as_str().to_string(),
        task.status.label().to_string(),
        (task.status.rank(), String::new())
      )
    }
    | GroupAxis::Priority => {
      let label = capitalize(
        task.priority.as_str()
      );
      (
        task
          .priority
          .as_str()
          .to_string(),
        label,
        (
          u8::MAX
            - task.priority.rank(),
          String::new()
        )
      )
    }
    | GroupAxis::Assignee => {
      match &task.assignee {
        | Some(assignee) => {
          (
            assignee.key().to_string(),
            assignee
              .display_name(users),
            (
              0,
              assignee
                .key()
                .to_lowercase()
            )
          )
        }
        | None => unassigned()
      }
    }
    | GroupAxis::DueDate => {
      match task.due_date {
        | Some(due) => {
          let key = due
            .format("%Y-%m-%d")
            .to_string();
          (
            key.clone(),
            due
              .format("%b %-d, %Y")
              .to_string(),
            (0, key)
          )
        }
        | None => {
          (
            NO_DUE_DATE.to_string(),
            NO_DUE_DATE.to_string(),
            (1, String::new())
          )
        }
      }
    }
    | GroupAxis::RelatedDeal => {
      match &task.related_deal {
        | Some(deal) => {
          (
            deal.id.clone(),
            deal.name.clone(),
            (0, deal.id.to_lowercase())
          )
        }
        | None => unassigned()
      }
    }
  }
}

fn unassigned()
-> (String, String, (u8, String)) {
  (
    UNASSIGNED.to_string(),
    UNASSIGNED.to_string(),
    (1, String::new())
  )
}

fn capitalize(raw: &str) -> String {
  let mut chars = raw.chars();
  match chars.next() {
    | Some(first) => {
      first
        .to_uppercase()
        .chain(chars)
        .collect()
    }
    | None => String::new()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;
  use crate::task::{
    Assignee,
    Priority,
    Status,
    TaskId,
    UserId,
    UserRole
  };

  fn tasks() -> Vec<Task> {
    let now = Utc
      .with_ymd_and_hms(
        2026, 3, 1, 9, 0, 0
      )
      .unwrap();
    let mut a = Task::new(
      TaskId::new("a"),
      "a",
      now
    );
    a.status = Status::Done;
    a.priority = Priority::Low;
    a.due_date =
      NaiveDate::from_ymd_opt(
        2026, 3, 9
      );
    a.assignee = Some(Assignee::User(
      UserId::new("u1")
    ));
    let mut b = Task::new(
      TaskId::new("b"),
      "b",
      now
    );
    b.priority = Priority::Urgent;
    let mut c = Task::new(
      TaskId::new("c"),
      "c",
      now
    );
    c.status = Status::Review;
    c.due_date =
      NaiveDate::from_ymd_opt(
        2026, 3, 2
      );
    c.assignee = Some(Assignee::Name(
      "Ito".to_string()
    ));
    vec![a, b, c]
  }

  fn keys(
    groups: &[TaskGroup]
  ) -> Vec<&str> {
    groups
      .iter()
      .map(|g| g.key.as_str())
      .collect()
  }

  #[test]
  fn status_and_priority_follow_rank()
  {
    let list = tasks();
    let by_status = group_tasks(
      &list,
      GroupAxis::Status,
      &[]
    );
    assert_eq!(
      keys(&by_status),
      vec!["todo", "review", "done"]
    );
    let by_priority = group_tasks(
      &list,
      GroupAxis::Priority,
      &[]
    );
    assert_eq!(
      keys(&by_priority),
      vec!["urgent", "medium", "low"]
    );
    assert_eq!(
      by_priority[0].title,
      "Urgent"
    );
  }

  #[test]
  fn missing_values_group_last() {
    let list = tasks();
    let by_due = group_tasks(
      &list,
      GroupAxis::DueDate,
      &[]
    );
    assert_eq!(
      keys(&by_due),
      vec![
        "2026-03-02",
        "2026-03-09",
        NO_DUE_DATE
      ]
    );
    assert_eq!(
      by_due[0].title,
      "Mar 2, 2026"
    );

    let users = vec![User {
      id:     UserId::new("u1"),
      name:   "Sato".to_string(),
      email:  "sato@example.com"
        .to_string(),
      avatar: None,
      role:   UserRole::Sales
    }];
    let by_assignee = group_tasks(
      &list,
      GroupAxis::Assignee,
      &users
    );
    assert_eq!(
      keys(&by_assignee),
      vec!["Ito", "u1", UNASSIGNED]
    );
    assert_eq!(
      by_assignee[1].title,
      "Sato"
    );
  }

  #[test]
  fn no_axis_is_single_group() {
    let list = tasks();
    let groups = group_tasks(
      &list,
      GroupAxis::None,
      &[]
    );
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].tasks.len(), 3);
    assert_eq!(
      "dueDate"
        .parse::<GroupAxis>()
        .unwrap(),
      GroupAxis::DueDate
    );
  }
}

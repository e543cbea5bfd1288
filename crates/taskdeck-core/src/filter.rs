use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  trace
};

use crate::datetime::{
  month_end,
  month_start,
  to_project_date,
  week_start
};
use crate::task::{
  Priority,
  Status,
  Task
};

/// Due-date predicate, evaluated
/// against a caller supplied `today`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DueFilter {
  On(NaiveDate),
  Range {
    from: Option<NaiveDate>,
    to:   Option<NaiveDate>
  },
  Today,
  ThisWeek,
  ThisMonth,
  Overdue,
  HasDue,
  NoDue
}

impl DueFilter {
  pub fn matches(
    &self,
    task: &Task,
    today: NaiveDate
  ) -> bool {
    match self {
      | DueFilter::HasDue => {
        task.due_date.is_some()
      }
      | DueFilter::NoDue => {
        task.due_date.is_none()
      }
      | DueFilter::Overdue => {
        task.is_overdue(today)
      }
      | _ => {
        let Some(due) = task.due_date
        else {
          return false;
        };
        match self {
          | DueFilter::On(date) => {
            due == *date
          }
          | DueFilter::Range {
            from,
            to
          } => {
            from
              .map(|f| due >= f)
              .unwrap_or(true)
              && to
                .map(|t| due <= t)
                .unwrap_or(true)
          }
          | DueFilter::Today => {
            due == today
          }
          | DueFilter::ThisWeek => {
            week_start(due)
              == week_start(today)
          }
          | DueFilter::ThisMonth => {
            due >= month_start(today)
              && due <= month_end(today)
          }
          | _ => false
        }
      }
    }
  }
}

/// Conjunction of per-field
/// predicates. An unset field matches
/// every task.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct TaskFilter {
  pub search:       Option<String>,
  pub title:        Option<String>,
  #[serde(default)]
  pub statuses:     Vec<Status>,
  #[serde(default)]
  pub priorities:   Vec<Priority>,
  pub assignee:     Option<String>,
  #[serde(default)]
  pub tags:         Vec<String>,
  pub due:          Option<DueFilter>,
  pub created_on:   Option<NaiveDate>,
  pub updated_on:   Option<NaiveDate>,
  pub related_deal: Option<String>
}

impl TaskFilter {
  pub fn status(
    status: Status
  ) -> Self {
    Self {
      statuses: vec![status],
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }

  pub fn matches(
    &self,
    task: &Task,
    today: NaiveDate
  ) -> bool {
    if let Some(query) = non_blank(
      self.search.as_deref()
    ) {
      let q = query.to_lowercase();
      let title_match = task
        .title
        .to_lowercase()
        .contains(&q);
      let description_match = task
        .description
        .as_deref()
        .map(|d| {
          d.to_lowercase().contains(&q)
        })
        .unwrap_or(false);
      if !title_match
        && !description_match
      {
        return false;
      }
    }

    if let Some(title) = non_blank(
      self.title.as_deref()
    ) && !task.title.contains(title)
    {
      return false;
    }

    if !self.statuses.is_empty()
      && !self
        .statuses
        .contains(&task.status)
    {
      return false;
    }

    if !self.priorities.is_empty()
      && !self
        .priorities
        .contains(&task.priority)
    {
      return false;
    }

    if let Some(assignee) = non_blank(
      self.assignee.as_deref()
    ) {
      let assigned = task
        .assignee
        .as_ref()
        .map(|a| a.matches(assignee))
        .unwrap_or(false);
      if !assigned {
        return false;
      }
    }

    if !self.tags.is_empty() {
      let joined = task.tags.join(",");
      if !self
        .tags
        .iter()
        .all(|tag| joined.contains(tag))
      {
        return false;
      }
    }

    if let Some(due) = &self.due
      && !due.matches(task, today)
    {
      return false;
    }

    if let Some(date) = self.created_on
      && to_project_date(task.created_at)
        != date
    {
      return false;
    }

    if let Some(date) = self.updated_on
      && to_project_date(task.updated_at)
        != date
    {
      return false;
    }

    if let Some(deal_id) = non_blank(
      self.related_deal.as_deref()
    ) && task
      .related_deal
      .as_ref()
      .map(|deal| deal.id.as_str())
      != Some(deal_id)
    {
      return false;
    }

    true
  }

  #[tracing::instrument(skip(
    self, tasks
  ))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [Task],
    today: NaiveDate
  ) -> Vec<&'a Task> {
    let out: Vec<&Task> = tasks
      .iter()
      .filter(|task| {
        self.matches(task, today)
      })
      .collect();
    trace!(
      total = tasks.len(),
      matched = out.len(),
      "applied task filter"
    );
    out
  }

  /// Overlays every field that is set
  /// in `other`.
  pub fn merge(
    &mut self,
    other: TaskFilter
  ) {
    if other.search.is_some() {
      self.search = other.search;
    }
    if other.title.is_some() {
      self.title = other.title;
    }
    if !other.statuses.is_empty() {
      self.statuses = other.statuses;
    }
    if !other.priorities.is_empty() {
      self.priorities =
        other.priorities;
    }
    if other.assignee.is_some() {
      self.assignee = other.assignee;
    }
    if !other.tags.is_empty() {
      self.tags = other.tags;
    }
    if other.due.is_some() {
      self.due = other.due;
    }
    if other.created_on.is_some() {
      self.created_on =
        other.created_on;
    }
    if other.updated_on.is_some() {
      self.updated_on =
        other.updated_on;
    }
    if other.related_deal.is_some() {
      self.related_deal =
        other.related_deal;
    }
  }

  /// Sets a list-view column filter
  /// from its raw text. An empty value
  /// clears the column; unknown keys
  /// and unparsable values leave the
  /// filter untouched and return
  /// `false`.
  pub fn set_column(
    &mut self,
    key: &str,
    value: &str
  ) -> bool {
    let value = value.trim();
    let clear = value.is_empty();
    match key {
      | "title" => {
        self.title = (!clear)
          .then(|| value.to_string());
      }
      | "search" => {
        self.search = (!clear)
          .then(|| value.to_string());
      }
      | "assignee" => {
        self.assignee = (!clear)
          .then(|| value.to_string());
      }
      | "status" => {
        if clear {
          self.statuses.clear();
        } else if let Ok(status) =
          value.parse::<Status>()
        {
          self.statuses = vec![status];
        } else {
          debug!(value, "ignoring unknown status filter");
          return false;
        }
      }
      | "priority" => {
        if clear {
          self.priorities.clear();
        } else if let Ok(priority) =
          value.parse::<Priority>()
        {
          self.priorities =
            vec![priority];
        } else {
          debug!(value, "ignoring unknown priority filter");
          return false;
        }
      }
      | "tags" => {
        self.tags = if clear {
          vec![]
        } else {
          vec![value.to_string()]
        };
      }
      | "dueDate" | "due_date"
      | "due" => {
        if clear {
          self.due = None;
        } else if let Some(date) =
          parse_day(value)
        {
          self.due =
            Some(DueFilter::On(date));
        } else {
          return false;
        }
      }
      | "createdAt" | "created_at" => {
        if clear {
          self.created_on = None;
        } else if let Some(date) =
          parse_day(value)
        {
          self.created_on = Some(date);
        } else {
          return false;
        }
      }
      | "updatedAt" | "updated_at" => {
        if clear {
          self.updated_on = None;
        } else if let Some(date) =
          parse_day(value)
        {
          self.updated_on = Some(date);
        } else {
          return false;
        }
      }
      | "relatedDeal"
      | "related_deal" => {
        self.related_deal = (!clear)
          .then(|| value.to_string());
      }
      | other => {
        debug!(key = other, "ignoring unknown filter key");
        return false;
      }
    }
    true
  }
}

fn non_blank(
  value: Option<&str>
) -> Option<&str> {
  value.filter(|v| !v.trim().is_empty())
}

fn parse_day(
  value: &str
) -> Option<NaiveDate> {
  let head = value.get(..10)?;
  NaiveDate::parse_from_str(
    head, "%Y-%m-%d"
  )
  .ok()
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    DueFilter,
    TaskFilter
  };
  use crate::task::{
    Assignee,
    Priority,
    Status,
    Task,
    TaskId
  };

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d)
      .unwrap()
  }

  fn sample() -> Vec<Task> {
    let now = Utc
      .with_ymd_and_hms(
        2026, 3, 10, 9, 0, 0
      )
      .unwrap();
    let mut a = Task::new(
      TaskId::new("1"),
      "Implement lead form",
      now
    );
    a.description = Some(
      "Validation and CRM sync"
        .to_string()
    );
    a.priority = Priority::High;
    a.assignee = Some(Assignee::Name(
      "Tanaka".to_string()
    ));
    a.due_date = Some(day(8));
    a.tags = vec![
      "crm".to_string(),
      "frontend".to_string(),
    ];

    let mut b = Task::new(
      TaskId::new("2"),
      "Quarterly report",
      now
    );
    b.status = Status::Done;
    b.due_date = Some(day(8));

    let mut c = Task::new(
      TaskId::new("3"),
      "Customer call",
      now
    );
    c.status = Status::InProgress;
    c.due_date = Some(day(12));
    vec![a, b, c]
  }

  fn ids(
    tasks: Vec<&Task>
  ) -> Vec<&str> {
    tasks
      .into_iter()
      .map(|t| t.id.as_str())
      .collect()
  }

  #[test]
  fn empty_filter_matches_everything()
  {
    let tasks = sample();
    let filter = TaskFilter::default();
    assert!(filter.is_empty());
    assert_eq!(
      filter.apply(&tasks, day(10)).len(),
      3
    );
  }

  #[test]
  fn status_filter_returns_subset() {
    let tasks = sample();
    let filter =
      TaskFilter::status(Status::Done);
    let out =
      filter.apply(&tasks, day(10));
    assert!(out.iter().all(|t| {
      t.status == Status::Done
    }));
    assert_eq!(ids(out), vec!["2"]);
  }

  #[test]
  fn search_covers_description_case_insensitively()
   {
    let tasks = sample();
    let filter = TaskFilter {
      search: Some("crm SYNC".to_string()),
      ..TaskFilter::default()
    };
    assert_eq!(
      ids(filter.apply(&tasks, day(10))),
      vec!["1"]
    );
  }

  #[test]
  fn predicates_are_conjunctive() {
    let tasks = sample();
    let filter = TaskFilter {
      due: Some(DueFilter::On(day(8))),
      priorities: vec![Priority::Medium],
      ..TaskFilter::default()
    };
    assert_eq!(
      ids(filter.apply(&tasks, day(10))),
      vec!["2"]
    );
  }

  #[test]
  fn overdue_skips_done_tasks() {
    let tasks = sample();
    let filter = TaskFilter {
      due: Some(DueFilter::Overdue),
      ..TaskFilter::default()
    };
    assert_eq!(
      ids(filter.apply(&tasks, day(10))),
      vec!["1"]
    );
  }

  #[test]
  fn column_filters_parse_and_ignore_unknown_keys()
   {
    let tasks = sample();
    let mut filter =
      TaskFilter::default();
    assert!(
      filter.set_column("tags", "front")
    );
    assert!(
      !filter.set_column("colour", "red")
    );
    assert!(
      !filter
        .set_column("status", "blocked")
    );
    assert_eq!(
      ids(filter.apply(&tasks, day(10))),
      vec!["1"]
    );

    assert!(filter.set_column(
      "dueDate",
      "2026-03-12T00:00:00Z"
    ));
    assert!(
      filter.set_column("tags", "")
    );
    assert_eq!(
      ids(filter.apply(&tasks, day(10))),
      vec!["3"]
    );
  }

  #[test]
  fn merge_overlays_set_fields() {
    let mut filter = TaskFilter {
      search: Some("report".to_string()),
      statuses: vec![Status::Done],
      ..TaskFilter::default()
    };
    filter.merge(TaskFilter {
      assignee: Some("Tanaka".to_string()),
      ..TaskFilter::default()
    });
    assert_eq!(
      filter.search.as_deref(),
      Some("report")
    );
    assert_eq!(
      filter.assignee.as_deref(),
      Some("Tanaka")
    );
    assert_eq!(
      filter.statuses,
      vec![Status::Done]
    );
  }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime::parse_date_expr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Client-side id derived from the creation timestamp.
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        Self(format!("task-{}", now.timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Review,
    Done,
}

impl Status {
    /// Board order, left to right.
    pub const ALL: [Status; 4] = [Status::Todo, Status::InProgress, Status::Review, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Done => "Done",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Review => 2,
            Status::Done => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "todo" | "to-do" | "not-started" => Ok(Status::Todo),
            "in-progress" | "inprogress" | "doing" => Ok(Status::InProgress),
            "review" | "in-review" => Ok(Status::Review),
            "done" | "completed" => Ok(Status::Done),
            other => Err(anyhow::anyhow!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            "urgent" | "u" => Ok(Priority::Urgent),
            other => Err(anyhow::anyhow!("unknown priority: {other}")),
        }
    }
}

/// Who a task is assigned to: either a free-form name or a reference to a
/// known user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    Name(String),
    User(UserId),
}

impl Assignee {
    /// Stable key used for filtering and grouping.
    pub fn key(&self) -> &str {
        match self {
            Assignee::Name(name) => name,
            Assignee::User(id) => id.as_str(),
        }
    }

    pub fn display_name(&self, users: &[User]) -> String {
        match self {
            Assignee::Name(name) => name.clone(),
            Assignee::User(id) => users
                .iter()
                .find(|user| &user.id == id)
                .map(|user| user.name.clone())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    pub fn matches(&self, needle: &str) -> bool {
        self.key() == needle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Sales,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub status: Status,

    pub priority: Priority,

    #[serde(default)]
    pub assignee: Option<Assignee>,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub related_deal: Option<DealRef>,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: Status::Todo,
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            tags: vec![],
            created_at: now,
            updated_at: now,
            related_deal: None,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != Status::Done && self.due_date.map(|due| due < today).unwrap_or(false)
    }
}

/// Partial update merged into a task. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee: Option<Option<Assignee>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub related_deal: Option<Option<DealRef>>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn due_date(date: NaiveDate) -> Self {
        Self {
            due_date: Some(Some(date)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = assignee.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(deal) = &self.related_deal {
            task.related_deal = deal.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("unrecognized due date: {0}")]
    InvalidDueDate(String),
}

/// Data captured by the task creation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_deal: Option<DealRef>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: Status::Todo,
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            tags: vec![],
            related_deal: None,
        }
    }

    /// Sets the due date from the form's text field. Blank input clears
    /// it; see [`parse_date_expr`] for the accepted forms.
    pub fn set_due_input(&mut self, raw: &str, now: DateTime<Utc>) -> Result<(), FormError> {
        if raw.trim().is_empty() {
            self.due_date = None;
            return Ok(());
        }
        let date = parse_date_expr(raw, now).map_err(|_| FormError::InvalidDueDate(raw.trim().to_string()))?;
        self.due_date = Some(date);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::EmptyTitle);
        }
        Ok(())
    }

    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Result<Task, FormError> {
        self.validate()?;
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(Task {
            id,
            title: self.title.trim().to_string(),
            description,
            status: self.status,
            priority: self.priority,
            assignee: self.assignee,
            due_date: self.due_date,
            tags: normalize_tags(self.tags),
            created_at: now,
            updated_at: now,
            related_deal: self.related_deal,
        })
    }
}

/// Splits a comma separated tag field, trimming and dropping blanks.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(',').map(str::to_string).collect())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if !trimmed.is_empty() && !out.iter().any(|t| t == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("in_progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("blocked".parse::<Status>().is_err());
    }

    #[test]
    fn empty_title_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let form = NewTask::titled("   ");
        assert_eq!(
            form.into_task(TaskId::from_timestamp(now), now),
            Err(FormError::EmptyTitle)
        );
    }

    #[test]
    fn due_input_parses_or_reports() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut form = NewTask::titled("Quote");
        form.set_due_input("2026-03-10", now).unwrap();
        assert_eq!(form.due_date, NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(
            form.set_due_input(" someday ", now),
            Err(FormError::InvalidDueDate("someday".to_string()))
        );
        form.set_due_input("", now).unwrap();
        assert_eq!(form.due_date, None);
    }

    #[test]
    fn form_trims_title_and_tags() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut form = NewTask::titled("  Call customer  ");
        form.tags = parse_tag_list("crm, ,sales,crm");
        form.description = Some("   ".to_string());
        let task = form.into_task(TaskId::new("t1"), now).unwrap();
        assert_eq!(task.title, "Call customer");
        assert_eq!(task.tags, vec!["crm".to_string(), "sales".to_string()]);
        assert_eq!(task.description, None);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn patch_clears_optional_fields() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut task = Task::new(TaskId::new("t1"), "x", now);
        task.assignee = Some(Assignee::Name("Tanaka".to_string()));
        let patch = TaskPatch {
            assignee: Some(None),
            priority: Some(Priority::Urgent),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut task);
        assert_eq!(task.assignee, None);
        assert_eq!(task.priority, Priority::Urgent);
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn assignee_resolves_user_names() {
        let users = vec![User {
            id: UserId::new("u1"),
            name: "Sato Hanako".to_string(),
            email: "sato@example.com".to_string(),
            avatar: None,
            role: UserRole::Sales,
        }];
        assert_eq!(
            Assignee::User(UserId::new("u1")).display_name(&users),
            "Sato Hanako"
        );
        assert_eq!(Assignee::User(UserId::new("u9")).display_name(&users), "u9");
        assert!(Assignee::Name("Sato".to_string()).matches("Sato"));
    }
}

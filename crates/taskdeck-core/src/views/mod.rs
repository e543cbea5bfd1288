//! Read models derived from the task store for each board layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod gantt;
pub mod kanban;
pub mod list;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Kanban,
    List,
    Calendar,
    Gantt,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [ViewMode::Kanban, ViewMode::List, ViewMode::Calendar, ViewMode::Gantt];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Kanban => "kanban",
            ViewMode::List => "list",
            ViewMode::Calendar => "calendar",
            ViewMode::Gantt => "gantt",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown view mode: {s}"))
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::datetime::format_date;
use crate::store::TaskStore;
use crate::task::{Status, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "value")]
pub enum BulkAction {
    SetStatus(Status),
    SetDueDate(NaiveDate),
    Delete,
}

impl BulkAction {
    /// Confirmation prompt shown before the action runs.
    pub fn describe(&self, count: usize) -> String {
        match self {
            BulkAction::SetStatus(status) => {
                format!("Change status of {count} task(s) to {}?", status.label())
            }
            BulkAction::SetDueDate(date) => {
                format!("Set due date of {count} task(s) to {}?", format_date(*date))
            }
            BulkAction::Delete => format!("Delete {count} task(s)? This cannot be undone."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub action: BulkAction,
    pub affected: usize,
}

/// Holds a requested bulk action until the user confirms it.
#[derive(Debug, Clone, Default)]
pub struct BulkActions {
    pending: Option<BulkAction>,
}

impl BulkActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<BulkAction> {
        self.pending
    }

    /// Returns `false` and stores nothing when the selection is empty.
    pub fn request(&mut self, store: &TaskStore, action: BulkAction) -> bool {
        if store.selection_len() == 0 {
            debug!(?action, "bulk action requested with empty selection");
            return false;
        }
        self.pending = Some(action);
        true
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[tracing::instrument(skip(self, store, now))]
    pub fn confirm(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> Option<BulkReport> {
        let action = self.pending.take()?;
        let affected = match action {
            BulkAction::SetStatus(status) => store.bulk_update_tasks(&TaskPatch::status(status), now),
            BulkAction::SetDueDate(date) => store.bulk_update_tasks(&TaskPatch::due_date(date), now),
            BulkAction::Delete => store.bulk_remove_selected().len(),
        };
        info!(?action, affected, "bulk action confirmed");
        Some(BulkReport { action, affected })
    }
}

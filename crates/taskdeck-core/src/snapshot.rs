use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::store::TaskStore;
use crate::task::Task;

const TASKS_FILE: &str = "tasks.jsonl";

/// Local task snapshot: one JSON task per line in `tasks.jsonl`, replaced
/// atomically on every save.
#[derive(Debug)]
pub struct SnapshotStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl SnapshotStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join(TASKS_FILE);
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")
                .with_context(|| format!("failed to create {}", tasks_path.display()))?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened snapshot store"
        );

        Ok(Self { data_dir, tasks_path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.jsonl")
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.jsonl")
    }

    pub fn load_store(&self) -> anyhow::Result<TaskStore> {
        Ok(TaskStore::with_tasks(self.load_tasks()?))
    }

    /// Persists the task list only; selection and view state are session
    /// scoped.
    pub fn save_store(&self, store: &TaskStore) -> anyhow::Result<()> {
        self.save_tasks(store.tasks())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let item: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(item);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, items))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = items.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for item in items {
        let serialized = serde_json::to_string(item)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::task::{Assignee, Status, TaskId};

    #[test]
    fn save_then_load_keeps_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::open(dir.path()).unwrap();
        assert!(snapshots.load_tasks().unwrap().is_empty());

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut a = Task::new(TaskId::new("b"), "second id, first slot", now);
        a.status = Status::InProgress;
        a.due_date = NaiveDate::from_ymd_opt(2026, 3, 4);
        a.assignee = Some(Assignee::Name("Kato".to_string()));
        let b = Task::new(TaskId::new("a"), "plain", now);
        let store = TaskStore::with_tasks(vec![a.clone(), b.clone()]);

        snapshots.save_store(&store).unwrap();
        let loaded = snapshots.load_store().unwrap();
        assert_eq!(loaded.tasks(), &[a, b]);
    }

    #[test]
    fn corrupt_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotStore::open(dir.path()).unwrap();
        fs::write(&snapshots.tasks_path, "\n{not json}\n").unwrap();
        let err = snapshots.load_tasks().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}

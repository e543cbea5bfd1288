pub mod bulk;
pub mod config;
pub mod datetime;
pub mod drag;
pub mod filter;
pub mod logging;
pub mod snapshot;
pub mod sort;
pub mod stats;
pub mod store;
pub mod task;
pub mod views;

use std::path::Path;

use anyhow::Context;
use tracing::info;

pub use crate::store::TaskStore;
pub use crate::task::{
  Status,
  Task,
  TaskId,
  TaskPatch
};

/// Resolves the data directory from
/// `cfg` (or `data_override`) and
/// opens the task snapshot inside it.
#[tracing::instrument(skip_all)]
pub fn open_snapshots(
  cfg: &config::Config,
  data_override: Option<&Path>
) -> anyhow::Result<snapshot::SnapshotStore>
{
  let data_dir =
    config::resolve_data_dir(
      cfg,
      data_override
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let snapshots =
    snapshot::SnapshotStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open snapshot \
         store at {}",
        data_dir.display()
      )
    })?;

  info!(
    data_dir = %data_dir.display(),
    "task snapshots ready"
  );
  Ok(snapshots)
}

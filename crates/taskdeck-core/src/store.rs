use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::filter::TaskFilter;
use crate::sort::{SortKey, SortSpec};
use crate::task::{FormError, NewTask, Task, TaskId, TaskPatch};
use crate::views::ViewMode;
use crate::views::kanban::KanbanAxis;
use crate::views::list::GroupAxis;

/// The client-side task collection and the UI state that rides along with
/// it: selection, active filter, sort order and view.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    selection: BTreeSet<TaskId>,
    filter: TaskFilter,
    sort: SortSpec,
    view: ViewMode,
    axis: GroupAxis,
    kanban_axis: KanbanAxis,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut store = Self::default();
        store.set_tasks(tasks);
        store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        let ids: BTreeSet<TaskId> = self.tasks.iter().map(|t| t.id.clone()).collect();
        self.selection.retain(|id| ids.contains(id));
    }

    /// Appends a task. Duplicate ids are accepted; lookups then resolve to
    /// the first occurrence.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_task(&mut self, task: Task) {
        if self.contains(&task.id) {
            warn!(id = %task.id, "adding task with duplicate id");
        }
        self.tasks.push(task);
    }

    /// Validates form input, assigns a timestamp-based id and appends the
    /// new task.
    #[tracing::instrument(skip(self, form, now))]
    pub fn create_task(&mut self, form: NewTask, now: DateTime<Utc>) -> Result<TaskId, FormError> {
        form.validate()?;
        let id = self.next_id(now);
        let task = form.into_task(id.clone(), now)?;
        info!(id = %id, title = %task.title, "created task");
        self.tasks.push(task);
        Ok(id)
    }

    #[tracing::instrument(skip(self, id, now), fields(id = %id))]
    pub fn duplicate_task(&mut self, id: &TaskId, now: DateTime<Utc>) -> Option<TaskId> {
        let source = self.get(id)?.clone();
        let new_id = self.next_id(now);
        let mut copy = source;
        copy.id = new_id.clone();
        copy.title = format!("{} (Copy)", copy.title);
        copy.created_at = now;
        copy.updated_at = now;
        self.tasks.push(copy);
        Some(new_id)
    }

    /// Merges `patch` into the task and refreshes `updated_at`. Returns
    /// `false` without touching anything when the id is unknown.
    #[tracing::instrument(skip(self, id, patch, now), fields(id = %id))]
    pub fn update_task(&mut self, id: &TaskId, patch: &TaskPatch, now: DateTime<Utc>) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            debug!("update for unknown task ignored");
            return false;
        };
        patch.apply_to(task);
        touch(task, now);
        true
    }

    #[tracing::instrument(skip(self, id), fields(id = %id))]
    pub fn remove_task(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| &t.id == id)?;
        self.selection.remove(id);
        Some(self.tasks.remove(idx))
    }

    /// Rearranges the listed tasks into the given relative order, keeping
    /// every other task in its current slot. Unknown ids are skipped.
    #[tracing::instrument(skip(self, order), fields(count = order.len()))]
    pub fn reorder(&mut self, order: &[TaskId]) {
        let wanted: BTreeSet<&TaskId> = order.iter().collect();
        let slots: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| wanted.contains(&t.id))
            .map(|(idx, _)| idx)
            .collect();

        let mut pool: Vec<Option<Task>> = slots.iter().rev().map(|idx| Some(self.tasks.remove(*idx))).collect();
        pool.reverse();

        let mut placed: Vec<Task> = Vec::with_capacity(pool.len());
        for id in order {
            let hit = pool
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|t| &t.id == id))
                .and_then(Option::take);
            placed.extend(hit);
        }
        // Duplicated ids that were not consumed keep their relative spot.
        placed.extend(pool.into_iter().flatten());

        for (slot, task) in slots.into_iter().zip(placed) {
            self.tasks.insert(slot, task);
        }
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.selection.iter()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_selected(&self, id: &TaskId) -> bool {
        self.selection.contains(id)
    }

    pub fn select_task(&mut self, id: &TaskId) {
        self.selection.insert(id.clone());
    }

    pub fn deselect_task(&mut self, id: &TaskId) {
        self.selection.remove(id);
    }

    pub fn toggle_task_selection(&mut self, id: &TaskId) {
        if !self.selection.remove(id) {
            self.selection.insert(id.clone());
        }
    }

    pub fn select_all_tasks(&mut self) {
        self.selection = self.tasks.iter().map(|t| t.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// True when the selection is exactly the set of all task ids.
    pub fn all_selected(&self) -> bool {
        let all: BTreeSet<&TaskId> = self.tasks.iter().map(|t| &t.id).collect();
        !all.is_empty() && all.len() == self.selection.len() && self.selection.iter().all(|id| all.contains(id))
    }

    /// Header checkbox: clears a full selection, otherwise selects all.
    pub fn toggle_select_all(&mut self) {
        if self.all_selected() {
            self.clear_selection();
        } else {
            self.select_all_tasks();
        }
    }

    /// Applies `patch` to every selected task and returns how many changed.
    #[tracing::instrument(skip(self, patch, now))]
    pub fn bulk_update_tasks(&mut self, patch: &TaskPatch, now: DateTime<Utc>) -> usize {
        let mut affected = 0;
        for task in self.tasks.iter_mut().filter(|t| self.selection.contains(&t.id)) {
            patch.apply_to(task);
            touch(task, now);
            affected += 1;
        }
        info!(affected, "bulk update applied");
        affected
    }

    #[tracing::instrument(skip(self))]
    pub fn bulk_remove_selected(&mut self) -> Vec<Task> {
        let selection = std::mem::take(&mut self.selection);
        let (removed, kept): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| selection.contains(&t.id));
        self.tasks = kept;
        info!(removed = removed.len(), "bulk delete applied");
        removed
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter.merge(filter);
    }

    pub fn set_column_filter(&mut self, key: &str, value: &str) -> bool {
        self.filter.set_column(key, value)
    }

    pub fn clear_filter(&mut self) {
        self.filter = TaskFilter::default();
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort = self.sort.toggled(key);
    }

    /// Sort by a raw column name; unknown names leave the order unchanged.
    pub fn toggle_sort_by_name(&mut self, key: &str) -> bool {
        match key.parse::<SortKey>() {
            Ok(key) => {
                self.toggle_sort(key);
                true
            }
            Err(err) => {
                debug!(error = %err, "ignoring sort request");
                false
            }
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn set_view_mode(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn group_axis(&self) -> GroupAxis {
        self.axis
    }

    pub fn set_group_axis(&mut self, axis: GroupAxis) {
        self.axis = axis;
    }

    pub fn kanban_axis(&self) -> KanbanAxis {
        self.kanban_axis
    }

    pub fn set_kanban_axis(&mut self, axis: KanbanAxis) {
        self.kanban_axis = axis;
    }

    /// Tasks passing the active filter, in the active sort order.
    pub fn visible_tasks(&self, today: NaiveDate) -> Vec<Task> {
        let mut visible: Vec<&Task> = self.filter.apply(&self.tasks, today);
        self.sort.sort_refs(&mut visible);
        visible.into_iter().cloned().collect()
    }

    fn next_id(&self, now: DateTime<Utc>) -> TaskId {
        let base = TaskId::from_timestamp(now);
        if !self.contains(&base) {
            return base;
        }
        let mut suffix = 1usize;
        loop {
            let candidate = TaskId::new(format!("{base}-{suffix}"));
            if !self.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn touch(task: &mut Task, now: DateTime<Utc>) {
    if now < task.updated_at {
        warn!(id = %task.id, "clock moved backwards; keeping previous updated_at");
        return;
    }
    task.updated_at = now;
}

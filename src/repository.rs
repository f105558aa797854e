use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{normalize_range, Category, Task, TaskDraft, TaskError, TaskPatch};
use crate::storage::{load_json, save_json, KeyValueStore, StorageError, TASKS_STORAGE_KEY};

/// Sole owner and writer of the task collection.
///
/// Every mutation is written back to the `calendar-tasks` slot of the backing
/// store. Storage failures are logged and never surface to the caller; the
/// in-memory collection stays authoritative for the session.
pub struct TaskRepository<S> {
    store: S,
    tasks: Vec<Task>,
}

impl<S: KeyValueStore> TaskRepository<S> {
    /// Empty repository over `store`; nothing is read until [`Self::load_all`].
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
        }
    }

    /// Repository with the persisted collection already loaded.
    pub fn open(store: S) -> Self {
        let mut repo = Self::new(store);
        repo.load_all();
        repo
    }

    pub fn store(&self) -> &S {
        &self.store
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

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Replaces the in-memory collection with the persisted one.
    ///
    /// A missing slot, unreadable store, or malformed value yields an empty
    /// collection.
    pub fn load_all(&mut self) -> &[Task] {
        let loaded = match load_json::<Vec<Task>>(&self.store, TASKS_STORAGE_KEY) {
            Ok(Some(tasks)) => tasks,
            Ok(None) => Vec::new(),
            Err(error) => {
                log::warn!("failed loading tasks, starting empty: {error}");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(loaded.len());
        for mut task in loaded {
            if !seen.insert(task.id.clone()) {
                log::warn!("dropping duplicate stored task task_id={}", task.id);
                continue;
            }
            normalize_range(&mut task);
            tasks.push(task);
        }
        log::debug!("loaded tasks count={}", tasks.len());
        self.tasks = tasks;
        &self.tasks
    }

    /// Writes the full collection to the tasks slot.
    pub fn persist(&self) -> Result<(), StorageError> {
        save_json(&self.store, TASKS_STORAGE_KEY, &self.tasks)
    }

    fn persist_or_log(&self) {
        if let Err(error) = self.persist() {
            log::error!("failed saving tasks count={}: {error}", self.tasks.len());
        }
    }

    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, TaskError> {
        self.add_at(draft, Utc::now())
    }

    /// Like [`Self::add`] with an explicit creation timestamp.
    pub fn add_at(&mut self, draft: TaskDraft, created_at: DateTime<Utc>) -> Result<Task, TaskError> {
        if draft.name.trim().is_empty() {
            return Err(TaskError::EmptyName);
        }

        let mut task = Task {
            id: self.next_id(),
            name: draft.name,
            category: draft.category,
            description: draft.description,
            created_at,
            date: draft.start_date.unwrap_or(draft.date),
            start_date: draft.start_date,
            end_date: draft.end_date,
        };
        normalize_range(&mut task);

        log::info!(
            "task added task_id={} category={} start={} end={}",
            task.id,
            task.category,
            task.start(),
            task.end()
        );
        self.tasks.push(task.clone());
        self.persist_or_log();
        Ok(task)
    }

    /// Merges `patch` into the task with `id`.
    ///
    /// Unknown ids are ignored. Returns the task as stored after the merge.
    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Option<Task> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            log::debug!("update ignored for unknown task_id={id}");
            return None;
        };

        let before = task.clone();
        patch.apply(task);
        let updated = task.clone();
        if updated != before {
            log::info!(
                "task updated task_id={} category={} start={} end={}",
                updated.id,
                updated.category,
                updated.start(),
                updated.end()
            );
            self.persist_or_log();
        }
        Some(updated)
    }

    pub fn set_category(&mut self, id: &str, category: Category) -> Option<Task> {
        self.update(id, &TaskPatch::category(category))
    }

    /// Removes the task with `id`; returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            log::info!("task deleted task_id={id}");
            self.persist_or_log();
        } else {
            log::debug!("delete ignored for unknown task_id={id}");
        }
        removed
    }

    /// Empties the collection and removes the persisted slot itself.
    pub fn clear_all(&mut self) {
        let count = self.tasks.len();
        self.tasks.clear();
        if let Err(error) = self.store.remove(TASKS_STORAGE_KEY) {
            log::error!("failed removing tasks slot: {error}");
        }
        log::info!("tasks cleared count={count}");
    }

    fn next_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

//! Task state engine.
//!
//! Owns every task, epic and subtask. Keeps epics and subtasks linked both
//! ways, re-derives epic status and time span whenever a subtask changes,
//! records successful reads in the view history and rejects time overlaps
//! before anything is stored.
//!
//! The engine has no internal synchronization. Callers that share one across
//! threads must guard the whole engine (reads included, since reads record
//! history).
//!
//! When opened on a data file, every successful mutation rewrites the whole
//! file before returning. A failed save is reported, but the in-memory
//! change it followed is kept.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::history::HistoryTracker;
use crate::prioritized::PrioritizedView;
use crate::storage::FileStore;
use crate::task::{derive_epic_span, derive_epic_status, Task, TaskId, TaskType};

#[derive(Debug, Default)]
pub struct TaskEngine {
    tasks: BTreeMap<TaskId, Task>,
    epics: BTreeMap<TaskId, Task>,
    subtasks: BTreeMap<TaskId, Task>,
    history: HistoryTracker,
    prioritized: PrioritizedView,
    store: Option<FileStore>,
}

impl TaskEngine {
    /// Empty engine with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    /// File-backed engine: loads `path` if it exists, otherwise starts empty.
    pub fn open(path: impl Into<PathBuf>, lock_timeout_ms: u64) -> Result<Self> {
        let store = FileStore::new(path, lock_timeout_ms);
        let engine = if store.path().exists() {
            store.load()?
        } else {
            tracing::info!(path = %store.path().display(), "no data file yet, starting empty");
            Self::new()
        };
        Ok(engine.with_store(store))
    }

    /// Save to `store` after every mutation from now on.
    pub fn with_store(mut self, store: FileStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&FileStore> {
        self.store.as_ref()
    }

    /// Whether any record of any kind has this id.
    pub fn contains(&self, id: TaskId) -> bool {
        self.lookup(id).is_some()
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }

    pub fn get_task(&mut self, id: TaskId) -> Option<&Task> {
        let task = self.tasks.get(&id)?;
        self.history.record(task.clone());
        Some(task)
    }

    /// Store a new task. If the id is already taken the existing record is
    /// returned untouched.
    pub fn create_task(&mut self, task: Task) -> Result<Task> {
        expect_kind(&task, TaskType::Task)?;
        if let Some(existing) = self.lookup(task.id()) {
            tracing::debug!(id = task.id(), "create ignored, id already present");
            return Ok(existing.clone());
        }
        task.check_duration()?;
        self.prioritized.validate(&task)?;

        self.tasks.insert(task.id(), task.clone());
        self.rebuild_prioritized();
        tracing::debug!(id = task.id(), "task created");
        self.persist()?;
        Ok(task)
    }

    /// Replace a task by id. `Ok(None)` if no such task.
    pub fn update_task(&mut self, task: Task) -> Result<Option<Task>> {
        expect_kind(&task, TaskType::Task)?;
        if !self.tasks.contains_key(&task.id()) {
            return Ok(None);
        }
        task.check_duration()?;
        self.prioritized.validate(&task)?;

        self.tasks.insert(task.id(), task.clone());
        self.rebuild_prioritized();
        tracing::debug!(id = task.id(), "task updated");
        self.persist()?;
        Ok(Some(task))
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<bool> {
        if self.tasks.remove(&id).is_none() {
            return Ok(false);
        }
        self.history.remove(id);
        self.rebuild_prioritized();
        tracing::debug!(id, "task deleted");
        self.persist()?;
        Ok(true)
    }

    /// Delete every standalone task. Returns how many were removed.
    pub fn delete_all_tasks(&mut self) -> Result<usize> {
        let removed = std::mem::take(&mut self.tasks);
        if removed.is_empty() {
            return Ok(0);
        }
        for id in removed.keys() {
            self.history.remove(*id);
        }
        self.rebuild_prioritized();
        tracing::debug!(count = removed.len(), "all tasks deleted");
        self.persist()?;
        Ok(removed.len())
    }

    // =========================================================================
    // Epics
    // =========================================================================

    pub fn epics(&self) -> impl Iterator<Item = &Task> + '_ {
        self.epics.values()
    }

    pub fn get_epic(&mut self, id: TaskId) -> Option<&Task> {
        let epic = self.epics.get(&id)?;
        self.history.record(epic.clone());
        Some(epic)
    }

    /// Store a new epic. Its status and time span start out derived from an
    /// empty child list.
    pub fn create_epic(&mut self, mut epic: Task) -> Result<Task> {
        expect_kind(&epic, TaskType::Epic)?;
        let id = epic.id();
        if let Some(existing) = self.lookup(id) {
            tracing::debug!(id, "create ignored, id already present");
            return Ok(existing.clone());
        }

        epic.clear_subtasks();
        epic.apply_epic_derivation(
            derive_epic_status(std::iter::empty()),
            derive_epic_span(std::iter::empty()),
        );
        self.epics.insert(id, epic.clone());
        tracing::debug!(id, "epic created");
        self.persist()?;
        Ok(epic)
    }

    /// Replace an epic's title and description. Children, status and time
    /// span are kept, since they are derived.
    pub fn update_epic(&mut self, epic: Task) -> Result<Option<Task>> {
        expect_kind(&epic, TaskType::Epic)?;
        let Some(stored) = self.epics.get_mut(&epic.id()) else {
            return Ok(None);
        };
        stored.title = epic.title;
        stored.description = epic.description;
        let updated = stored.clone();
        tracing::debug!(id = updated.id(), "epic updated");
        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete an epic together with all of its subtasks.
    pub fn delete_epic(&mut self, id: TaskId) -> Result<bool> {
        let Some(epic) = self.epics.remove(&id) else {
            return Ok(false);
        };
        for subtask_id in epic.subtask_ids() {
            self.subtasks.remove(subtask_id);
            self.history.remove(*subtask_id);
        }
        self.history.remove(id);
        self.rebuild_prioritized();
        tracing::debug!(id, subtasks = epic.subtask_ids().len(), "epic deleted");
        self.persist()?;
        Ok(true)
    }

    /// Delete every epic and therefore every subtask. Returns how many
    /// epics were removed.
    pub fn delete_all_epics(&mut self) -> Result<usize> {
        let epics = std::mem::take(&mut self.epics);
        let subtasks = std::mem::take(&mut self.subtasks);
        if epics.is_empty() && subtasks.is_empty() {
            return Ok(0);
        }
        for id in epics.keys().chain(subtasks.keys()) {
            self.history.remove(*id);
        }
        self.rebuild_prioritized();
        tracing::debug!(epics = epics.len(), subtasks = subtasks.len(), "all epics deleted");
        self.persist()?;
        Ok(epics.len())
    }

    /// Subtasks of an epic in child order. Empty when the epic is unknown.
    pub fn epic_subtasks(&self, epic_id: TaskId) -> Vec<&Task> {
        match self.epics.get(&epic_id) {
            Some(epic) => epic
                .subtask_ids()
                .iter()
                .filter_map(|id| self.subtasks.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    // =========================================================================
    // Subtasks
    // =========================================================================

    pub fn subtasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.subtasks.values()
    }

    pub fn get_subtask(&mut self, id: TaskId) -> Option<&Task> {
        let subtask = self.subtasks.get(&id)?;
        self.history.record(subtask.clone());
        Some(subtask)
    }

    /// Store a new subtask and link it to its epic. The epic must exist.
    pub fn create_subtask(&mut self, subtask: Task) -> Result<Task> {
        let epic_id = subtask_epic_id(&subtask)?;
        let id = subtask.id();
        if let Some(existing) = self.lookup(id) {
            tracing::debug!(id, "create ignored, id already present");
            return Ok(existing.clone());
        }
        if !self.epics.contains_key(&epic_id) {
            return Err(Error::EpicNotFound(epic_id));
        }
        subtask.check_duration()?;
        self.prioritized.validate(&subtask)?;

        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.attach_subtask(id)?;
        }
        self.subtasks.insert(id, subtask.clone());
        self.refresh_epic(epic_id);
        self.rebuild_prioritized();
        tracing::debug!(id, epic_id, "subtask created");
        self.persist()?;
        Ok(subtask)
    }

    /// Replace a subtask by id. The parent epic cannot change.
    pub fn update_subtask(&mut self, subtask: Task) -> Result<Option<Task>> {
        let requested = subtask_epic_id(&subtask)?;
        let Some(current) = self.subtasks.get(&subtask.id()).and_then(Task::epic_id) else {
            return Ok(None);
        };
        if current != requested {
            return Err(Error::EpicReassignment {
                subtask: subtask.id(),
                current,
                requested,
            });
        }
        subtask.check_duration()?;
        self.prioritized.validate(&subtask)?;

        self.subtasks.insert(subtask.id(), subtask.clone());
        self.refresh_epic(current);
        self.rebuild_prioritized();
        tracing::debug!(id = subtask.id(), epic_id = current, "subtask updated");
        self.persist()?;
        Ok(Some(subtask))
    }

    pub fn delete_subtask(&mut self, id: TaskId) -> Result<bool> {
        let Some(subtask) = self.subtasks.remove(&id) else {
            return Ok(false);
        };
        if let Some(epic_id) = subtask.epic_id() {
            if let Some(epic) = self.epics.get_mut(&epic_id) {
                epic.detach_subtask(id);
            }
            self.refresh_epic(epic_id);
        }
        self.history.remove(id);
        self.rebuild_prioritized();
        tracing::debug!(id, "subtask deleted");
        self.persist()?;
        Ok(true)
    }

    /// Delete every subtask, leaving all epics childless. Returns how many
    /// subtasks were removed.
    pub fn delete_all_subtasks(&mut self) -> Result<usize> {
        let removed = std::mem::take(&mut self.subtasks);
        if removed.is_empty() {
            return Ok(0);
        }
        for id in removed.keys() {
            self.history.remove(*id);
        }
        let epic_ids: Vec<TaskId> = self.epics.keys().copied().collect();
        for epic_id in epic_ids {
            if let Some(epic) = self.epics.get_mut(&epic_id) {
                epic.clear_subtasks();
            }
            self.refresh_epic(epic_id);
        }
        self.rebuild_prioritized();
        tracing::debug!(count = removed.len(), "all subtasks deleted");
        self.persist()?;
        Ok(removed.len())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Viewed records, oldest view first.
    pub fn history(&self) -> Vec<Task> {
        self.history.snapshot()
    }

    /// Timed tasks and subtasks by ascending start time.
    pub fn prioritized(&self) -> Vec<Task> {
        self.prioritized.ordered()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lookup(&self, id: TaskId) -> Option<&Task> {
        self.tasks
            .get(&id)
            .or_else(|| self.epics.get(&id))
            .or_else(|| self.subtasks.get(&id))
    }

    fn refresh_epic(&mut self, epic_id: TaskId) {
        let Some(epic) = self.epics.get(&epic_id) else {
            return;
        };
        let children: Vec<&Task> = epic
            .subtask_ids()
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .collect();
        let status = derive_epic_status(children.iter().map(|child| child.status));
        let span = derive_epic_span(children.iter().copied());

        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.apply_epic_derivation(status, span);
        }
    }

    fn rebuild_prioritized(&mut self) {
        self.prioritized
            .rebuild(self.tasks.values().chain(self.subtasks.values()));
    }

    fn persist(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Err(err) = store.save(self) {
            tracing::warn!(
                path = %store.path().display(),
                error = %err,
                "save failed; in-memory state is ahead of the data file"
            );
            return Err(err);
        }
        Ok(())
    }
}

fn expect_kind(task: &Task, expected: TaskType) -> Result<()> {
    let actual = task.task_type();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::KindMismatch { expected, actual })
    }
}

fn subtask_epic_id(task: &Task) -> Result<TaskId> {
    task.epic_id().ok_or(Error::KindMismatch {
        expected: TaskType::Subtask,
        actual: task.task_type(),
    })
}

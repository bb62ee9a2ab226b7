//! Task, epic and subtask records.
//!
//! All three kinds share one `Task` struct; the kind-specific parts live in
//! [`TaskKind`]. Identity is the id alone: two records with the same id are
//! the same entity for equality and hashing, whatever their other fields.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

pub type TaskId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Draw the next id from the process-wide counter shared by all kinds.
pub fn next_id() -> TaskId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Make sure ids handed out later are strictly greater than `id`.
pub fn reserve_ids_through(id: TaskId) {
    NEXT_ID.fetch_max(id.saturating_add(1), Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    New,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            other => Err(Error::InvalidArgument(format!(
                "unknown status '{other}' (expected NEW, IN_PROGRESS or DONE)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Task,
    Epic,
    Subtask,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Task => "TASK",
            TaskType::Epic => "EPIC",
            TaskType::Subtask => "SUBTASK",
        }
    }

    /// Lowercase noun used in messages and CLI command names.
    pub fn noun(&self) -> &'static str {
        match self {
            TaskType::Task => "task",
            TaskType::Epic => "epic",
            TaskType::Subtask => "subtask",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TASK" => Ok(TaskType::Task),
            "EPIC" => Ok(TaskType::Epic),
            "SUBTASK" => Ok(TaskType::Subtask),
            other => Err(Error::InvalidArgument(format!("unknown task type '{other}'"))),
        }
    }
}

/// Kind-specific part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Task,
    Epic {
        subtask_ids: Vec<TaskId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<NaiveDateTime>,
    },
    Subtask {
        epic_id: TaskId,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    id: TaskId,
    pub title: String,
    pub description: String,
    pub status: Status,
    #[serde(
        rename = "duration_minutes",
        serialize_with = "serialize_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    /// Whole minutes, zero or more. The engine rejects anything else.
    pub duration: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(flatten)]
    kind: TaskKind,
}

fn serialize_minutes<S: Serializer>(
    duration: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match duration {
        Some(duration) => serializer.serialize_i64(duration.num_minutes()),
        None => serializer.serialize_none(),
    }
}

impl Task {
    /// New standalone task with a generated id and status NEW.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::restore(next_id(), title, description, Status::New)
    }

    /// New epic with a generated id and no subtasks.
    pub fn new_epic(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::restore_epic(next_id(), title, description, Status::New)
    }

    /// New subtask of `epic_id` with a generated id.
    pub fn new_subtask(
        title: impl Into<String>,
        description: impl Into<String>,
        epic_id: TaskId,
    ) -> Result<Self> {
        Self::restore_subtask(next_id(), title, description, Status::New, epic_id)
    }

    /// Rebuild a standalone task from known fields. The id counter is not touched.
    pub fn restore(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status,
            duration: None,
            start_time: None,
            kind: TaskKind::Task,
        }
    }

    pub fn restore_epic(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            kind: TaskKind::Epic {
                subtask_ids: Vec::new(),
                end_time: None,
            },
            ..Self::restore(id, title, description, status)
        }
    }

    pub fn restore_subtask(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        status: Status,
        epic_id: TaskId,
    ) -> Result<Self> {
        if id == epic_id {
            return Err(Error::SelfReference(id));
        }
        Ok(Self {
            kind: TaskKind::Subtask { epic_id },
            ..Self::restore(id, title, description, status)
        })
    }

    /// Attach an optional duration and start time.
    pub fn with_timing(
        mut self,
        duration: Option<Duration>,
        start_time: Option<NaiveDateTime>,
    ) -> Self {
        self.duration = duration;
        self.start_time = start_time;
        self
    }

    /// Fails unless the duration is absent or a non-negative whole number
    /// of minutes, the granularity the data file keeps.
    pub fn check_duration(&self) -> Result<()> {
        let Some(duration) = self.duration else {
            return Ok(());
        };
        if duration < Duration::zero() {
            return Err(Error::InvalidArgument(format!(
                "{} {}: duration must not be negative",
                self.task_type(),
                self.id
            )));
        }
        if duration != Duration::minutes(duration.num_minutes()) {
            return Err(Error::InvalidArgument(format!(
                "{} {}: duration must be whole minutes",
                self.task_type(),
                self.id
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn task_type(&self) -> TaskType {
        match self.kind {
            TaskKind::Task => TaskType::Task,
            TaskKind::Epic { .. } => TaskType::Epic,
            TaskKind::Subtask { .. } => TaskType::Subtask,
        }
    }

    /// Parent epic id, for subtasks.
    pub fn epic_id(&self) -> Option<TaskId> {
        match self.kind {
            TaskKind::Subtask { epic_id } => Some(epic_id),
            _ => None,
        }
    }

    /// Child ids in insertion order; empty for non-epics.
    pub fn subtask_ids(&self) -> &[TaskId] {
        match &self.kind {
            TaskKind::Epic { subtask_ids, .. } => subtask_ids,
            _ => &[],
        }
    }

    /// For epics, the latest end among timed subtasks. Otherwise
    /// start + duration, with a missing duration counted as zero.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match &self.kind {
            TaskKind::Epic { end_time, .. } => *end_time,
            _ => self
                .start_time
                .map(|start| start + self.duration.unwrap_or_else(Duration::zero)),
        }
    }

    /// A task or subtask with a start time. Epics never count.
    pub fn is_timed(&self) -> bool {
        !matches!(self.kind, TaskKind::Epic { .. }) && self.start_time.is_some()
    }

    pub(crate) fn attach_subtask(&mut self, subtask_id: TaskId) -> Result<()> {
        if subtask_id == self.id {
            return Err(Error::SelfReference(self.id));
        }
        if let TaskKind::Epic { subtask_ids, .. } = &mut self.kind {
            subtask_ids.push(subtask_id);
        }
        Ok(())
    }

    pub(crate) fn detach_subtask(&mut self, subtask_id: TaskId) {
        if let TaskKind::Epic { subtask_ids, .. } = &mut self.kind {
            subtask_ids.retain(|id| *id != subtask_id);
        }
    }

    pub(crate) fn clear_subtasks(&mut self) {
        if let TaskKind::Epic { subtask_ids, .. } = &mut self.kind {
            subtask_ids.clear();
        }
    }

    /// Overwrite the derived status and time span of an epic.
    pub(crate) fn apply_epic_derivation(&mut self, status: Status, span: EpicSpan) {
        if let TaskKind::Epic { end_time, .. } = &mut self.kind {
            self.status = status;
            self.duration = Some(span.duration);
            self.start_time = span.start;
            *end_time = span.end;
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Epic status from its children's statuses.
///
/// No children or all NEW gives NEW, all DONE gives DONE, anything else is
/// IN_PROGRESS.
pub fn derive_epic_status<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    let mut all_new = true;
    let mut all_done = true;
    for status in statuses {
        all_new &= status == Status::New;
        all_done &= status == Status::Done;
    }
    if all_new {
        Status::New
    } else if all_done {
        Status::Done
    } else {
        Status::InProgress
    }
}

/// Time span of an epic, derived from its timed subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpicSpan {
    pub duration: Duration,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Default for EpicSpan {
    fn default() -> Self {
        Self {
            duration: Duration::zero(),
            start: None,
            end: None,
        }
    }
}

/// Sum durations of children that have a start time; start is the earliest
/// child start, end the latest child end. Untimed children contribute nothing.
pub fn derive_epic_span<'a, I>(children: I) -> EpicSpan
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut span = EpicSpan::default();
    for child in children {
        let Some(start) = child.start_time else {
            continue;
        };
        span.duration = span.duration + child.duration.unwrap_or_else(Duration::zero);
        span.start = Some(span.start.map_or(start, |current| current.min(start)));
        if let Some(end) = child.end_time() {
            span.end = Some(span.end.map_or(end, |current| current.max(end)));
        }
    }
    span
}

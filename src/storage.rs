//! Data file encoding and the file-backed store.
//!
//! # Format
//!
//! ```text
//! id,type,name,status,description,duration,startTime,epic
//! 1,TASK,Write report,NEW,Quarterly numbers,90,2024-03-01T10:00:00,
//! 2,EPIC,Move house,IN_PROGRESS,,60,2024-03-02T09:00:00,
//! 3,SUBTASK,Pack books,DONE,,60,2024-03-02T09:00:00,2
//! ```
//!
//! Tasks come first, then epics in id order, then the subtasks of each epic
//! in that epic's child order. Replaying the lines top to bottom therefore
//! meets an epic before its subtasks and rebuilds the same child order.
//! Duration is in whole minutes; absent duration or start time is written
//! as `null`. The epic column is only filled for subtasks. In text
//! fields `\`, `,`, newline and carriage return are backslash-escaped.
//!
//! Loading replays every line through the engine's normal create calls, so
//! epic links, derived epic fields and overlap checks are rebuilt rather
//! than trusted. Any bad line fails the whole load.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};

use crate::engine::TaskEngine;
use crate::error::{Error, Result};
use crate::lock;
use crate::task::{reserve_ids_through, Status, Task, TaskId, TaskType};

/// First line of every data file
pub const HEADER: &str = "id,type,name,status,description,duration,startTime,epic";

const NULL: &str = "null";
const COLUMNS: usize = 8;
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_FORMAT_MINUTES: &str = "%Y-%m-%dT%H:%M";

/// Render the whole engine as data file text.
pub fn encode(engine: &TaskEngine) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    let subtasks = engine
        .epics()
        .flat_map(|epic| engine.epic_subtasks(epic.id()));
    for task in engine.tasks().chain(engine.epics()).chain(subtasks) {
        out.push_str(&encode_line(task));
        out.push('\n');
    }
    out
}

/// Build a fresh in-memory engine from data file text.
pub fn decode(text: &str) -> Result<TaskEngine> {
    let mut engine = TaskEngine::new();
    let mut max_id: Option<TaskId> = None;
    let mut lines = text.lines().enumerate();

    match lines.next() {
        None => return Ok(engine),
        Some((_, header)) if header.trim_end() == HEADER => {}
        Some((_, header)) if header.trim().is_empty() => {
            // Only a file that is blank throughout counts as empty.
            return match lines.find(|(_, line)| !line.trim().is_empty()) {
                None => Ok(engine),
                Some((index, _)) => Err(Error::Load {
                    line: 1,
                    reason: format!("expected header '{HEADER}' before line {}", index + 1),
                }),
            };
        }
        Some(_) => {
            return Err(Error::Load {
                line: 1,
                reason: format!("expected header '{HEADER}'"),
            })
        }
    }

    for (index, line) in lines {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let task = decode_line(line, line_no)?;
        let id = task.id();
        let replayed = match task.task_type() {
            TaskType::Task => engine.create_task(task),
            TaskType::Epic => engine.create_epic(task),
            TaskType::Subtask => engine.create_subtask(task),
        };
        replayed.map_err(|err| Error::Load {
            line: line_no,
            reason: err.to_string(),
        })?;
        max_id = Some(max_id.map_or(id, |current| current.max(id)));
    }

    if let Some(max_id) = max_id {
        reserve_ids_through(max_id);
    }
    Ok(engine)
}

/// One data line, without the trailing newline.
pub fn encode_line(task: &Task) -> String {
    let duration = task
        .duration
        .map(|duration| duration.num_minutes().to_string())
        .unwrap_or_else(|| NULL.to_string());
    let start_time = task
        .start_time
        .map(|start| start.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| NULL.to_string());
    let epic = task
        .epic_id()
        .map(|id| id.to_string())
        .unwrap_or_default();

    [
        task.id().to_string(),
        task.task_type().as_str().to_string(),
        escape(&task.title),
        task.status.as_str().to_string(),
        escape(&task.description),
        duration,
        start_time,
        epic,
    ]
    .join(",")
}

/// Parse one data line. `line_no` is only used in errors.
pub fn decode_line(line: &str, line_no: usize) -> Result<Task> {
    let bad = |reason: String| Error::Load {
        line: line_no,
        reason,
    };

    let fields = split_fields(line).map_err(bad)?;
    if fields.len() != COLUMNS {
        return Err(bad(format!(
            "expected {COLUMNS} columns, found {}",
            fields.len()
        )));
    }

    let id = parse_id(&fields[0]).map_err(bad)?;
    let task_type: TaskType = fields[1].parse().map_err(|err: Error| bad(err.to_string()))?;
    let title = fields[2].as_str();
    let status: Status = fields[3].parse().map_err(|err: Error| bad(err.to_string()))?;
    let description = fields[4].as_str();
    let duration = parse_duration(&fields[5]).map_err(bad)?;
    let start_time = parse_start_time(&fields[6]).map_err(bad)?;
    let epic = fields[7].trim();

    let task = match task_type {
        TaskType::Task => Task::restore(id, title, description, status),
        TaskType::Epic => Task::restore_epic(id, title, description, status),
        TaskType::Subtask => {
            if epic.is_empty() {
                return Err(bad("subtask without epic id".to_string()));
            }
            let epic_id = parse_id(epic).map_err(bad)?;
            Task::restore_subtask(id, title, description, status, epic_id)
                .map_err(|err| bad(err.to_string()))?
        }
    };
    if task_type != TaskType::Subtask && !epic.is_empty() {
        return Err(bad(format!("{task_type} line has an epic id")));
    }
    Ok(task.with_timing(duration, start_time))
}

fn parse_id(value: &str) -> std::result::Result<TaskId, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid id '{value}'"))
}

fn parse_duration(value: &str) -> std::result::Result<Option<Duration>, String> {
    let value = value.trim();
    if value == NULL {
        return Ok(None);
    }
    let minutes: i64 = value
        .parse()
        .map_err(|_| format!("invalid duration '{value}'"))?;
    Duration::try_minutes(minutes)
        .map(Some)
        .ok_or_else(|| format!("duration out of range '{value}'"))
}

fn parse_start_time(value: &str) -> std::result::Result<Option<NaiveDateTime>, String> {
    let value = value.trim();
    if value == NULL {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIME_FORMAT_MINUTES))
        .map(Some)
        .map_err(|_| format!("invalid start time '{value}'"))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Split on unescaped commas, undoing `escape` in each field.
fn split_fields(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::with_capacity(COLUMNS);
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some(',') => current.push(','),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => return Err(format!("unknown escape '\\{other}'")),
                None => return Err("dangling escape at end of line".to_string()),
            },
            ',' => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    Ok(fields)
}

/// Data file on disk, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every record under the data file lock.
    pub fn save(&self, engine: &TaskEngine) -> Result<()> {
        let text = encode(engine);
        lock::write_atomic_locked(&self.path, text.as_bytes(), self.lock_timeout_ms)?;
        tracing::debug!(path = %self.path.display(), bytes = text.len(), "data file saved");
        Ok(())
    }

    /// Read the data file into a new engine that is not yet attached to
    /// this store.
    pub fn load(&self) -> Result<TaskEngine> {
        let text = lock::read_locked_str(&self.path, self.lock_timeout_ms)?;
        let engine = decode(&text)?;
        tracing::info!(
            path = %self.path.display(),
            tasks = engine.tasks().count(),
            epics = engine.epics().count(),
            subtasks = engine.subtasks().count(),
            "data file loaded"
        );
        Ok(engine)
    }
}

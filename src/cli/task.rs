//! tt task, epic and subtask command implementations.
//!
//! The three record kinds share one set of commands; `TaskType` picks the
//! engine calls and the report wording.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::cli::{Context, UpdateArgs};
use crate::engine::TaskEngine;
use crate::error::{Error, Result};
use crate::output::Report;
use crate::task::{Status, Task, TaskId, TaskType};

pub struct AddOptions {
    pub kind: TaskType,
    pub title: String,
    pub description: String,
    pub id: Option<TaskId>,
    pub epic: Option<TaskId>,
    pub duration: Option<i64>,
    pub start: Option<String>,
    pub ctx: Context,
}

pub struct UpdateOptions {
    pub kind: TaskType,
    pub id: TaskId,
    pub changes: UpdateArgs,
    pub ctx: Context,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct RemoveOutput {
    id: TaskId,
    #[serde(rename = "type")]
    kind: TaskType,
    removed: bool,
}

#[derive(Serialize)]
struct ClearOutput {
    #[serde(rename = "type")]
    kind: TaskType,
    removed: usize,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let duration = parse_duration(options.duration)?;
    let start = parse_start(options.start.as_deref())?;
    let kind = options.kind;

    // Loading reserves every stored id, so generated ids must be drawn after it.
    let mut engine = options.ctx.open_engine()?;

    let record = match (kind, options.id, options.epic) {
        (TaskType::Task, Some(id), _) => {
            Task::restore(id, options.title, options.description, Status::New)
        }
        (TaskType::Task, None, _) => Task::new(options.title, options.description),
        (TaskType::Epic, Some(id), _) => {
            Task::restore_epic(id, options.title, options.description, Status::New)
        }
        (TaskType::Epic, None, _) => Task::new_epic(options.title, options.description),
        (TaskType::Subtask, id, Some(epic_id)) => match id {
            Some(id) => Task::restore_subtask(
                id,
                options.title,
                options.description,
                Status::New,
                epic_id,
            )?,
            None => Task::new_subtask(options.title, options.description, epic_id)?,
        },
        (TaskType::Subtask, _, None) => {
            return Err(Error::InvalidArgument(
                "subtask needs --epic <id>".to_string(),
            ))
        }
    };
    let record = if kind == TaskType::Epic {
        record
    } else {
        record.with_timing(duration, start)
    };

    let already_present = engine.contains(record.id());
    let stored = match kind {
        TaskType::Task => engine.create_task(record)?,
        TaskType::Epic => engine.create_epic(record)?,
        TaskType::Subtask => engine.create_subtask(record)?,
    };

    let mut report = Report::new(format!("{} created", title_case(kind)));
    describe(&mut report, &stored);
    if already_present {
        report.warning(format!("id {} already in use; existing record kept", stored.id()));
    }
    report.next_step(format!("tt {kind} show {}", stored.id()));
    options.ctx.emit(&stored, &report)
}

pub fn run_list(kind: TaskType, ctx: Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    let tasks: Vec<Task> = records(&engine, kind).cloned().collect();

    let mut report = Report::new(format!("{}s", title_case(kind)));
    report.field("Total", tasks.len());
    for task in &tasks {
        report.line(list_line(task));
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    ctx.emit(&output, &report)
}

pub fn run_show(kind: TaskType, id: TaskId, ctx: Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let task = fetch(&mut engine, kind, id)?;

    let mut report = Report::new(format!("{} {}", title_case(kind), task.id()));
    describe(&mut report, &task);
    if kind == TaskType::Epic {
        for subtask in engine.epic_subtasks(id) {
            report.line(list_line(subtask));
        }
    }
    ctx.emit(&task, &report)
}

pub fn run_update(options: UpdateOptions) -> Result<()> {
    let kind = options.kind;
    let changes = options.changes;
    let status = changes
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;
    let duration = parse_duration(changes.duration)?;
    let start = parse_start(changes.start.as_deref())?;

    let mut engine = options.ctx.open_engine()?;
    let mut task = fetch(&mut engine, kind, options.id)?;
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(description) = changes.description {
        task.description = description;
    }
    if kind != TaskType::Epic {
        if let Some(status) = status {
            task.status = status;
        }
        if changes.unschedule {
            task.duration = None;
            task.start_time = None;
        }
        if duration.is_some() {
            task.duration = duration;
        }
        if start.is_some() {
            task.start_time = start;
        }
    } else if status.is_some() {
        return Err(Error::InvalidArgument(
            "epic status is derived from its subtasks".to_string(),
        ));
    }

    let updated = match kind {
        TaskType::Task => engine.update_task(task)?,
        TaskType::Epic => engine.update_epic(task)?,
        TaskType::Subtask => engine.update_subtask(task)?,
    }
    .ok_or_else(|| not_found(kind, options.id))?;

    let mut report = Report::new(format!("{} updated", title_case(kind)));
    describe(&mut report, &updated);
    options.ctx.emit(&updated, &report)
}

pub fn run_rm(kind: TaskType, id: TaskId, ctx: Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let cascaded = match kind {
        TaskType::Epic => engine.epic_subtasks(id).len(),
        _ => 0,
    };
    let removed = match kind {
        TaskType::Task => engine.delete_task(id)?,
        TaskType::Epic => engine.delete_epic(id)?,
        TaskType::Subtask => engine.delete_subtask(id)?,
    };
    if !removed {
        return Err(not_found(kind, id));
    }

    let mut report = Report::new(format!("{} removed", title_case(kind)));
    report.field("ID", id);
    if cascaded > 0 {
        report.field("Subtasks removed", cascaded);
    }

    let output = RemoveOutput { id, kind, removed };
    ctx.emit(&output, &report)
}

pub fn run_clear(kind: TaskType, ctx: Context) -> Result<()> {
    let mut engine = ctx.open_engine()?;
    let removed = match kind {
        TaskType::Task => engine.delete_all_tasks()?,
        TaskType::Epic => engine.delete_all_epics()?,
        TaskType::Subtask => engine.delete_all_subtasks()?,
    };

    let mut report = Report::new(format!("{}s cleared", title_case(kind)));
    report.field("Removed", removed);

    let output = ClearOutput { kind, removed };
    ctx.emit(&output, &report)
}

pub(crate) fn records(engine: &TaskEngine, kind: TaskType) -> Box<dyn Iterator<Item = &Task> + '_> {
    match kind {
        TaskType::Task => Box::new(engine.tasks()),
        TaskType::Epic => Box::new(engine.epics()),
        TaskType::Subtask => Box::new(engine.subtasks()),
    }
}

fn fetch(engine: &mut TaskEngine, kind: TaskType, id: TaskId) -> Result<Task> {
    let found = match kind {
        TaskType::Task => engine.get_task(id),
        TaskType::Epic => engine.get_epic(id),
        TaskType::Subtask => engine.get_subtask(id),
    };
    found.cloned().ok_or_else(|| not_found(kind, id))
}

pub(crate) fn not_found(kind: TaskType, id: TaskId) -> Error {
    Error::InvalidArgument(format!("{kind} not found: {id}"))
}

fn parse_duration(minutes: Option<i64>) -> Result<Option<Duration>> {
    let Some(minutes) = minutes else {
        return Ok(None);
    };
    if minutes < 0 {
        return Err(Error::InvalidArgument(format!(
            "duration must be >= 0 minutes, got {minutes}"
        )));
    }
    Duration::try_minutes(minutes)
        .map(Some)
        .ok_or_else(|| Error::InvalidArgument(format!("duration too large: {minutes}")))
}

fn parse_start(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid start time '{value}' (expected YYYY-MM-DDTHH:MM[:SS])"
            ))
        })
}

fn title_case(kind: TaskType) -> &'static str {
    match kind {
        TaskType::Task => "Task",
        TaskType::Epic => "Epic",
        TaskType::Subtask => "Subtask",
    }
}

pub(crate) fn list_line(task: &Task) -> String {
    let mut line = format!("[{}] {} {}", task.status, task.id(), task.title);
    if let Some(start) = task.start_time {
        line.push_str(&format!(" @ {}", start.format("%Y-%m-%d %H:%M")));
    }
    if let Some(epic_id) = task.epic_id() {
        line.push_str(&format!(" (epic: {epic_id})"));
    }
    line
}

fn describe(report: &mut Report, task: &Task) {
    report
        .field("ID", task.id())
        .field("Title", &task.title)
        .field("Status", task.status);
    if let Some(epic_id) = task.epic_id() {
        report.field("Epic", epic_id);
    }
    if task.task_type() == TaskType::Epic {
        let ids: Vec<String> = task.subtask_ids().iter().map(ToString::to_string).collect();
        report.field("Subtasks", ids.join(", "));
    }
    if let Some(start) = task.start_time {
        report.field("Start", start.format("%Y-%m-%d %H:%M"));
    }
    if let Some(end) = task.end_time() {
        report.field("End", end.format("%Y-%m-%d %H:%M"));
    }
    if let Some(duration) = task.duration {
        report.field("Duration", format!("{} min", duration.num_minutes()));
    }
    if !task.description.is_empty() {
        report.line(task.description.clone());
    }
}

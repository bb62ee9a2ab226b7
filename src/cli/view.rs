//! Read-only views: epic subtasks and the prioritized schedule.

use serde::Serialize;

use crate::cli::task::{list_line, not_found};
use crate::cli::Context;
use crate::error::Result;
use crate::output::Report;
use crate::task::{Task, TaskId, TaskType};

#[derive(Serialize)]
struct EpicSubtasksOutput {
    epic: TaskId,
    total: usize,
    subtasks: Vec<Task>,
}

#[derive(Serialize)]
struct PrioritizedOutput {
    total: usize,
    tasks: Vec<Task>,
}

pub fn run_epic_subtasks(id: TaskId, ctx: Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    if !engine.epics().any(|epic| epic.id() == id) {
        return Err(not_found(TaskType::Epic, id));
    }
    let subtasks: Vec<Task> = engine.epic_subtasks(id).into_iter().cloned().collect();

    let mut report = Report::new(format!("Subtasks of epic {id}"));
    report.field("Total", subtasks.len());
    for subtask in &subtasks {
        report.line(list_line(subtask));
    }

    let output = EpicSubtasksOutput {
        epic: id,
        total: subtasks.len(),
        subtasks,
    };
    ctx.emit(&output, &report)
}

pub fn run_prioritized(ctx: Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    let tasks = engine.prioritized();

    let mut report = Report::new("Prioritized");
    report.field("Total", tasks.len());
    for task in &tasks {
        report.line(list_line(task));
    }
    if tasks.is_empty() {
        report.next_step("tt task add <title> --start <time> --duration <minutes>");
    }

    let output = PrioritizedOutput {
        total: tasks.len(),
        tasks,
    };
    ctx.emit(&output, &report)
}

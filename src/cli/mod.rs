//! Command-line interface for tt
//!
//! This module defines the CLI structure using clap derive macros.
//! Record commands live in `task`, read-only views in `view`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::engine::TaskEngine;
use crate::error::Result;
use crate::output::{emit, OutputOptions, Report};
use crate::task::TaskType;

mod task;
mod view;

/// tt - task tracker
///
/// Tracks tasks, epics and their subtasks in a data file, derives epic
/// status from subtasks and keeps scheduled work from overlapping.
#[derive(Parser, Debug)]
#[command(name = "tt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding `.tt.toml` and the data file (defaults to current directory)
    #[arg(long, global = true, env = "TT_DIR")]
    pub dir: Option<PathBuf>,

    /// Data file to use instead of the configured one
    #[arg(long, global = true, env = "TT_FILE")]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Standalone tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Epics and their subtasks
    #[command(subcommand)]
    Epic(EpicCommands),

    /// Subtasks of an epic
    #[command(subcommand)]
    Subtask(SubtaskCommands),

    /// Scheduled tasks and subtasks by start time
    Prioritized,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<u64>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,

        /// Start time, e.g. 2024-03-01T10:00
        #[arg(long)]
        start: Option<String>,
    },

    /// List tasks
    List,

    /// Show a task
    Show { id: u64 },

    /// Change a task
    Update {
        id: u64,

        #[command(flatten)]
        changes: UpdateArgs,
    },

    /// Delete a task
    Rm { id: u64 },

    /// Delete every task
    Clear,
}

/// Epic subcommands
#[derive(Subcommand, Debug)]
pub enum EpicCommands {
    /// Create an epic
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<u64>,
    },

    /// List epics
    List,

    /// Show an epic
    Show { id: u64 },

    /// Change an epic's title or description
    Update {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List the subtasks of an epic
    Subtasks { id: u64 },

    /// Delete an epic and its subtasks
    Rm { id: u64 },

    /// Delete every epic and subtask
    Clear,
}

/// Subtask subcommands
#[derive(Subcommand, Debug)]
pub enum SubtaskCommands {
    /// Create a subtask of an epic
    Add {
        title: String,

        /// Parent epic id
        #[arg(long)]
        epic: u64,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<u64>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,

        /// Start time, e.g. 2024-03-01T10:00
        #[arg(long)]
        start: Option<String>,
    },

    /// List subtasks
    List,

    /// Show a subtask
    Show { id: u64 },

    /// Change a subtask
    Update {
        id: u64,

        #[command(flatten)]
        changes: UpdateArgs,
    },

    /// Delete a subtask
    Rm { id: u64 },

    /// Delete every subtask
    Clear,
}

/// Field changes shared by `task update` and `subtask update`
#[derive(clap::Args, Debug, Default)]
pub struct UpdateArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// NEW, IN_PROGRESS or DONE
    #[arg(long)]
    pub status: Option<String>,

    /// Duration in minutes
    #[arg(long)]
    pub duration: Option<i64>,

    /// Start time, e.g. 2024-03-01T10:00
    #[arg(long)]
    pub start: Option<String>,

    /// Drop start time and duration
    #[arg(long, conflicts_with_all = ["duration", "start"])]
    pub unschedule: bool,
}

impl Cli {
    /// Name reported in the JSON envelope, e.g. `task add`.
    pub fn command_name(&self) -> String {
        let (kind, action) = match &self.command {
            Commands::Task(cmd) => (TaskType::Task, cmd.action()),
            Commands::Epic(cmd) => (TaskType::Epic, cmd.action()),
            Commands::Subtask(cmd) => (TaskType::Subtask, cmd.action()),
            Commands::Prioritized => return "prioritized".to_string(),
        };
        format!("{kind} {action}")
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context {
            command: self.command_name(),
            dir: self.dir,
            file: self.file,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };
        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    description,
                    id,
                    duration,
                    start,
                } => task::run_add(task::AddOptions {
                    kind: TaskType::Task,
                    title,
                    description,
                    id,
                    epic: None,
                    duration,
                    start,
                    ctx,
                }),
                TaskCommands::List => task::run_list(TaskType::Task, ctx),
                TaskCommands::Show { id } => task::run_show(TaskType::Task, id, ctx),
                TaskCommands::Update { id, changes } => task::run_update(task::UpdateOptions {
                    kind: TaskType::Task,
                    id,
                    changes,
                    ctx,
                }),
                TaskCommands::Rm { id } => task::run_rm(TaskType::Task, id, ctx),
                TaskCommands::Clear => task::run_clear(TaskType::Task, ctx),
            },
            Commands::Epic(cmd) => match cmd {
                EpicCommands::Add {
                    title,
                    description,
                    id,
                } => task::run_add(task::AddOptions {
                    kind: TaskType::Epic,
                    title,
                    description,
                    id,
                    epic: None,
                    duration: None,
                    start: None,
                    ctx,
                }),
                EpicCommands::List => task::run_list(TaskType::Epic, ctx),
                EpicCommands::Show { id } => task::run_show(TaskType::Epic, id, ctx),
                EpicCommands::Update {
                    id,
                    title,
                    description,
                } => task::run_update(task::UpdateOptions {
                    kind: TaskType::Epic,
                    id,
                    changes: UpdateArgs {
                        title,
                        description,
                        ..UpdateArgs::default()
                    },
                    ctx,
                }),
                EpicCommands::Subtasks { id } => view::run_epic_subtasks(id, ctx),
                EpicCommands::Rm { id } => task::run_rm(TaskType::Epic, id, ctx),
                EpicCommands::Clear => task::run_clear(TaskType::Epic, ctx),
            },
            Commands::Subtask(cmd) => match cmd {
                SubtaskCommands::Add {
                    title,
                    epic,
                    description,
                    id,
                    duration,
                    start,
                } => task::run_add(task::AddOptions {
                    kind: TaskType::Subtask,
                    title,
                    description,
                    id,
                    epic: Some(epic),
                    duration,
                    start,
                    ctx,
                }),
                SubtaskCommands::List => task::run_list(TaskType::Subtask, ctx),
                SubtaskCommands::Show { id } => task::run_show(TaskType::Subtask, id, ctx),
                SubtaskCommands::Update { id, changes } => {
                    task::run_update(task::UpdateOptions {
                        kind: TaskType::Subtask,
                        id,
                        changes,
                        ctx,
                    })
                }
                SubtaskCommands::Rm { id } => task::run_rm(TaskType::Subtask, id, ctx),
                SubtaskCommands::Clear => task::run_clear(TaskType::Subtask, ctx),
            },
            Commands::Prioritized => view::run_prioritized(ctx),
        }
    }
}

impl TaskCommands {
    fn action(&self) -> &'static str {
        match self {
            TaskCommands::Add { .. } => "add",
            TaskCommands::List => "list",
            TaskCommands::Show { .. } => "show",
            TaskCommands::Update { .. } => "update",
            TaskCommands::Rm { .. } => "rm",
            TaskCommands::Clear => "clear",
        }
    }
}

impl EpicCommands {
    fn action(&self) -> &'static str {
        match self {
            EpicCommands::Add { .. } => "add",
            EpicCommands::List => "list",
            EpicCommands::Show { .. } => "show",
            EpicCommands::Update { .. } => "update",
            EpicCommands::Subtasks { .. } => "subtasks",
            EpicCommands::Rm { .. } => "rm",
            EpicCommands::Clear => "clear",
        }
    }
}

impl SubtaskCommands {
    fn action(&self) -> &'static str {
        match self {
            SubtaskCommands::Add { .. } => "add",
            SubtaskCommands::List => "list",
            SubtaskCommands::Show { .. } => "show",
            SubtaskCommands::Update { .. } => "update",
            SubtaskCommands::Rm { .. } => "rm",
            SubtaskCommands::Clear => "clear",
        }
    }
}

/// Global flags every command needs
#[derive(Debug, Clone)]
pub struct Context {
    command: String,
    dir: Option<PathBuf>,
    file: Option<PathBuf>,
    output: OutputOptions,
}

impl Context {
    fn emit<T: serde::Serialize>(&self, data: &T, report: &Report) -> Result<()> {
        emit(self.output, &self.command, data, report)
    }

    /// Open the file-backed engine selected by `--dir`, `--file` and `.tt.toml`.
    fn open_engine(&self) -> Result<TaskEngine> {
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_dir(&dir);
        let path = match &self.file {
            Some(file) => resolve_against(&dir, file),
            None => config.data_path(&dir),
        };
        tracing::debug!(path = %path.display(), "opening data file");
        TaskEngine::open(path, config.storage.lock_timeout_ms)
    }
}

fn resolve_against(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        dir.join(file)
    }
}

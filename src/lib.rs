//! tasktrack - task, epic and subtask tracking
//!
//! Keeps standalone tasks, epics and the subtasks that belong to them.
//! Epic status and time span are derived from their subtasks, timed work
//! may not overlap, reads are remembered in a view history and everything
//! can be persisted to a single data file.
//!
//! # Module Organization
//!
//! - `task`: Records, statuses and epic derivation rules
//! - `history`: Recently viewed records, most recent last
//! - `prioritized`: Start-time ordering and the overlap check
//! - `engine`: The task state engine tying it all together
//! - `storage`: Data file format and the file-backed store
//! - `lock`: File locking and atomic replacement of the data file
//! - `config`: Configuration loading from `.tt.toml`
//! - `error`: Error types and result aliases
//! - `output`: JSON envelopes and human output for the CLI
//! - `cli`: Command-line interface using clap

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod lock;
pub mod output;
pub mod prioritized;
pub mod storage;
pub mod task;

pub use engine::TaskEngine;
pub use error::{Error, Result};
pub use task::{Status, Task, TaskId, TaskType};

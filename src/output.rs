//! Command results for the tt CLI.
//!
//! With `--json` every command prints one envelope on stdout:
//!
//! ```text
//! { "schema_version": "tt.v1", "command": "task add", "status": "success",
//!   "data": { ... }, "warnings": [...], "next_steps": [...] }
//! ```
//!
//! Failures use the same envelope with `"status": "error"` and an `error`
//! object in place of `data`. Without `--json` the command's [`Report`] is
//! printed as text (nothing under `--quiet`) and errors go to stderr.

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "tt.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text form of one command's result.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(&'static str, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Aligned `key  value` row under the title.
    pub fn field(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Also carried in the JSON envelope.
    pub fn warning(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    /// Also carried in the JSON envelope.
    pub fn next_step(&mut self, command: impl Into<String>) -> &mut Self {
        self.next_steps.push(command.into());
        self
    }

    pub fn render(&self) -> String {
        let width = self.fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let mut out = vec![self.title.clone()];
        out.extend(
            self.fields
                .iter()
                .map(|(key, value)| format!("  {key:<width$}  {value}").trim_end().to_string()),
        );
        out.extend(self.lines.iter().map(|line| format!("  {line}")));
        out.extend(self.warnings.iter().map(|warning| format!("warning: {warning}")));
        out.extend(self.next_steps.iter().map(|step| format!("next: {step}")));
        out.join("\n")
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<'a, T: Serialize> {
    Success { data: &'a T },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Print a successful result.
pub fn emit<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        return print_envelope(Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings: report.warnings.clone(),
            next_steps: report.next_steps.clone(),
        });
    }
    if !options.quiet {
        println!("{}", report.render());
    }
    Ok(())
}

/// Print a failure. Errors are shown even under `--quiet`.
pub fn emit_error(options: OutputOptions, command: &str, err: &Error) -> Result<()> {
    let hints = hints(err);
    if options.json {
        return print_envelope::<()>(Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: ErrorBody {
                    message: err.to_string(),
                    code: err.exit_code(),
                    kind: err.kind(),
                    details: err.details(),
                },
            },
            warnings: Vec::new(),
            next_steps: hints,
        });
    }

    eprintln!("error: {err}");
    for hint in hints {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn print_envelope<T: Serialize>(envelope: Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn hints(err: &Error) -> Vec<String> {
    match err {
        Error::Overlap { .. } => vec!["tt prioritized".to_string()],
        Error::EpicNotFound(_) => vec!["tt epic list".to_string()],
        Error::EpicReassignment { subtask, .. } => {
            vec![format!("tt subtask rm {subtask}, then add it to the other epic")]
        }
        Error::Load { line, .. } => vec![format!("fix line {line} of the data file then retry")],
        Error::LockFailed(_) => vec!["retry once the other tt process finishes".to_string()],
        Error::InvalidConfig(_) => vec!["fix .tt.toml then retry".to_string()],
        _ => Vec::new(),
    }
}

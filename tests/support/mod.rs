#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Scratch directory that `tt` runs in.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("tasks.csv")
    }

    pub fn read_data(&self) -> String {
        fs::read_to_string(self.data_path()).unwrap_or_default()
    }

    /// `tt` running in this directory with env overrides cleared.
    pub fn tt(&self) -> Command {
        let mut cmd = tt_cmd();
        cmd.current_dir(self.path());
        cmd
    }

    /// Run `tt --json <args>` and return the `data` member of the envelope.
    pub fn json_data(&self, args: &[&str]) -> Value {
        let output = self
            .tt()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tt");
        assert!(
            output.status.success(),
            "tt {:?} failed: {}{}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: Value = serde_json::from_slice(&output.stdout).expect("json envelope");
        envelope["data"].clone()
    }
}

pub fn tt_cmd() -> Command {
    let mut cmd = Command::cargo_bin("tt").expect("binary");
    cmd.env_remove("TT_DIR")
        .env_remove("TT_FILE")
        .env_remove("RUST_LOG");
    cmd
}

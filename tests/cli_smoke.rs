mod support;

use assert_cmd::Command;
use predicates::str::contains;

use support::TestDir;

#[test]
fn tt_help_works() {
    Command::cargo_bin("tt")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("task tracker"));
}

#[test]
fn subcommand_help_works() {
    for cmd in ["task", "epic", "subtask", "prioritized"] {
        support::tt_cmd().arg(cmd).arg("--help").assert().success();
    }
}

#[test]
fn task_lifecycle_round_trips_through_the_data_file() {
    let dir = TestDir::new();

    let task = dir.json_data(&[
        "task",
        "add",
        "Write report",
        "--description",
        "numbers, charts",
        "--start",
        "2024-03-01T10:00",
        "--duration",
        "90",
    ]);
    let id = task["id"].as_u64().expect("id");
    assert_eq!(task["status"], "NEW");
    assert_eq!(task["type"], "TASK");
    assert_eq!(task["duration_minutes"], 90);
    assert!(dir.read_data().contains("numbers\\, charts"));

    let updated = dir.json_data(&["task", "update", &id.to_string(), "--status", "done"]);
    assert_eq!(updated["status"], "DONE");
    assert_eq!(updated["description"], "numbers, charts");

    let list = dir.json_data(&["task", "list"]);
    assert_eq!(list["total"], 1);

    dir.tt()
        .args(["task", "rm", &id.to_string()])
        .assert()
        .success()
        .stdout(contains("Task removed"));
    dir.tt()
        .args(["task", "show", &id.to_string()])
        .assert()
        .code(2)
        .stderr(contains("task not found"));
}

#[test]
fn epic_status_follows_subtasks() {
    let dir = TestDir::new();

    let epic = dir.json_data(&["epic", "add", "Move house", "--id", "100"]);
    assert_eq!(epic["id"], 100);

    dir.json_data(&["subtask", "add", "Pack", "--epic", "100", "--id", "101"]);
    dir.json_data(&["subtask", "add", "Clean", "--epic", "100", "--id", "102"]);
    dir.json_data(&["subtask", "update", "101", "--status", "DONE"]);

    let epic = dir.json_data(&["epic", "show", "100"]);
    assert_eq!(epic["status"], "IN_PROGRESS");
    assert_eq!(epic["subtask_ids"], serde_json::json!([101, 102]));

    dir.json_data(&["subtask", "update", "102", "--status", "done"]);
    let epic = dir.json_data(&["epic", "show", "100"]);
    assert_eq!(epic["status"], "DONE");

    let subtasks = dir.json_data(&["epic", "subtasks", "100"]);
    assert_eq!(subtasks["total"], 2);

    dir.json_data(&["epic", "rm", "100"]);
    let subtasks = dir.json_data(&["subtask", "list"]);
    assert_eq!(subtasks["total"], 0);
}

#[test]
fn subtask_needs_an_existing_epic() {
    let dir = TestDir::new();
    dir.tt()
        .args(["subtask", "add", "Orphan", "--epic", "999"])
        .assert()
        .code(2)
        .stderr(contains("Epic not found: 999"));
}

#[test]
fn overlap_exits_with_conflict_code() {
    let dir = TestDir::new();
    dir.json_data(&[
        "task", "add", "A", "--start", "2024-03-01T09:00", "--duration", "180",
    ]);

    dir.tt()
        .args([
            "--json",
            "task",
            "add",
            "B",
            "--start",
            "2024-03-01T10:00",
            "--duration",
            "60",
        ])
        .assert()
        .code(3)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("\"kind\": \"conflict\""))
        .stdout(contains("\"command\": \"task add\""));

    dir.json_data(&[
        "task", "add", "C", "--start", "2024-03-01T12:00", "--duration", "60",
    ]);
    let view = dir.json_data(&["prioritized"]);
    assert_eq!(view["total"], 2);
    assert_eq!(view["tasks"][0]["title"], "A");
    assert_eq!(view["tasks"][1]["title"], "C");
}

#[test]
fn file_flag_and_config_pick_the_data_file() {
    let dir = TestDir::new();
    dir.write_file(".tt.toml", "data_file = \"board.csv\"\n")
        .expect("config");

    dir.json_data(&["task", "add", "configured"]);
    assert!(dir.path().join("board.csv").exists());

    dir.json_data(&["--file", "other.csv", "task", "add", "flagged"]);
    let other = std::fs::read_to_string(dir.path().join("other.csv")).expect("other");
    assert!(other.contains("flagged"));
    assert!(!other.contains("configured"));
}

#[test]
fn dir_env_var_is_honoured() {
    let dir = TestDir::new();
    let elsewhere = tempfile::tempdir().expect("tempdir");

    support::tt_cmd()
        .current_dir(elsewhere.path())
        .env("TT_DIR", dir.path())
        .args(["--quiet", "epic", "add", "Remote"])
        .assert()
        .success()
        .stdout("");
    assert!(dir.read_data().contains("EPIC,Remote"));
}

#[test]
fn generated_ids_continue_after_stored_records() {
    let dir = TestDir::new();
    let epic = dir.json_data(&["epic", "add", "Launch"]);
    let first = dir.json_data(&["task", "add", "one"]);
    let second = dir.json_data(&["task", "add", "two"]);
    let epic_id = epic["id"].as_u64().expect("epic id");
    let subtask = dir.json_data(&["subtask", "add", "three", "--epic", &epic_id.to_string()]);

    let mut ids: Vec<u64> = [&epic, &first, &second, &subtask]
        .iter()
        .map(|record| record["id"].as_u64().expect("id"))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "ids reused: {ids:?}");

    let data = dir.read_data();
    for row in ["EPIC,Launch", "TASK,one", "TASK,two", "SUBTASK,three"] {
        assert!(data.contains(row), "missing {row} in:\n{data}");
    }
}

#[test]
fn clear_removes_every_record_of_a_kind() {
    let dir = TestDir::new();
    dir.json_data(&["task", "add", "one"]);
    dir.json_data(&["task", "add", "two"]);

    let cleared = dir.json_data(&["task", "clear"]);
    assert_eq!(cleared["removed"], 2);
    assert_eq!(dir.json_data(&["task", "list"])["total"], 0);
}

#[test]
fn corrupt_data_file_is_an_operation_failure() {
    let dir = TestDir::new();
    dir.write_file("tasks.csv", "id,type,name,status,description,duration,startTime,epic\nnope\n")
        .expect("write");

    dir.tt()
        .args(["task", "list"])
        .assert()
        .code(4)
        .stderr(contains("line 2"));
}

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use tasktrack::error::Error;
use tasktrack::history::HistoryTracker;
use tasktrack::storage::{self, FileStore};
use tasktrack::task::{Status, Task, TaskId};
use tasktrack::TaskEngine;

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .expect("date")
        .and_hms_opt(hour, 0, 0)
        .expect("time")
}

fn status_strategy() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::New),
        Just(Status::InProgress),
        Just(Status::Done),
    ]
}

fn ids<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<TaskId> {
    tasks.into_iter().map(Task::id).collect()
}

fn assert_same_fields(left: &Task, right: &Task) {
    assert_eq!(left.id(), right.id());
    assert_eq!(left.title, right.title);
    assert_eq!(left.description, right.description);
    assert_eq!(left.status, right.status);
    assert_eq!(left.duration, right.duration);
    assert_eq!(left.start_time, right.start_time);
    assert_eq!(left.kind(), right.kind());
}

proptest! {
    #[test]
    fn epic_status_follows_children(statuses in prop::collection::vec(status_strategy(), 0..8)) {
        let mut engine = TaskEngine::new();
        engine
            .create_epic(Task::restore_epic(1, "epic", "", Status::New))
            .expect("epic");
        for (offset, status) in statuses.iter().enumerate() {
            let subtask = Task::restore_subtask(10 + offset as TaskId, "s", "", *status, 1)
                .expect("subtask");
            engine.create_subtask(subtask).expect("create subtask");
        }

        let expected = if statuses.iter().all(|s| *s == Status::New) {
            Status::New
        } else if statuses.iter().all(|s| *s == Status::Done) {
            Status::Done
        } else {
            Status::InProgress
        };
        let epic = engine.get_epic(1).expect("epic present");
        prop_assert_eq!(epic.status, expected);
    }
}

#[test]
fn epic_status_examples() {
    let mut engine = TaskEngine::new();
    engine
        .create_epic(Task::restore_epic(1, "epic", "", Status::New))
        .expect("epic");
    engine
        .create_subtask(Task::restore_subtask(2, "a", "", Status::New, 1).expect("a"))
        .expect("a");
    engine
        .create_subtask(Task::restore_subtask(3, "b", "", Status::Done, 1).expect("b"))
        .expect("b");
    assert_eq!(engine.get_epic(1).map(|e| e.status), Some(Status::InProgress));

    engine
        .update_subtask(Task::restore_subtask(2, "a", "", Status::Done, 1).expect("a"))
        .expect("update");
    assert_eq!(engine.get_epic(1).map(|e| e.status), Some(Status::Done));
}

#[test]
fn deleting_an_epic_cascades_to_subtasks_and_history() {
    let mut engine = TaskEngine::new();
    engine
        .create_epic(Task::restore_epic(1, "epic", "", Status::New))
        .expect("epic");
    for id in [2, 3] {
        engine
            .create_subtask(Task::restore_subtask(id, "s", "", Status::New, 1).expect("s"))
            .expect("subtask");
        assert!(engine.get_subtask(id).is_some());
    }
    assert!(engine.get_epic(1).is_some());
    assert_eq!(engine.history().len(), 3);

    assert!(engine.delete_epic(1).expect("delete"));
    assert!(engine.get_subtask(2).is_none());
    assert!(engine.get_subtask(3).is_none());
    assert_eq!(engine.subtasks().count(), 0);
    assert!(engine.history().is_empty());
    assert!(engine.epic_subtasks(1).is_empty());
}

#[test]
fn overlapping_task_is_rejected_and_back_to_back_is_not() {
    let mut engine = TaskEngine::new();
    engine
        .create_task(
            Task::restore(1, "A", "", Status::New)
                .with_timing(Some(Duration::hours(3)), Some(at(9))),
        )
        .expect("A");

    let err = engine
        .create_task(
            Task::restore(2, "B", "", Status::New)
                .with_timing(Some(Duration::hours(1)), Some(at(10))),
        )
        .expect_err("B overlaps A");
    assert!(matches!(err, Error::Overlap { .. }));
    assert_eq!(engine.tasks().count(), 1);

    engine
        .create_task(
            Task::restore(3, "C", "", Status::New)
                .with_timing(Some(Duration::hours(1)), Some(at(12))),
        )
        .expect("C starts as A ends");
    assert_eq!(ids(&engine.prioritized()), vec![1, 3]);
}

#[test]
fn subtasks_and_tasks_share_one_schedule() {
    let mut engine = TaskEngine::new();
    engine
        .create_epic(Task::restore_epic(1, "epic", "", Status::New))
        .expect("epic");
    engine
        .create_task(
            Task::restore(2, "meeting", "", Status::New)
                .with_timing(Some(Duration::hours(1)), Some(at(14))),
        )
        .expect("task");

    let clash = Task::restore_subtask(3, "s", "", Status::New, 1)
        .expect("subtask")
        .with_timing(Some(Duration::minutes(30)), Some(at(14)));
    assert!(matches!(
        engine.create_subtask(clash),
        Err(Error::Overlap { id: 3, conflicting: 2 })
    ));
    assert!(engine.get_epic(1).map(|e| e.subtask_ids().is_empty()).unwrap_or(false));
}

#[test]
fn rejected_updates_leave_records_and_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tasks.csv");
    let mut engine = TaskEngine::open(&path, 1000).expect("open");
    engine
        .create_task(
            Task::restore(1, "A", "", Status::New)
                .with_timing(Some(Duration::hours(1)), Some(at(9))),
        )
        .expect("A");
    engine
        .create_task(
            Task::restore(2, "B", "", Status::New)
                .with_timing(Some(Duration::hours(1)), Some(at(11))),
        )
        .expect("B");
    engine
        .create_epic(Task::restore_epic(3, "epic", "", Status::New))
        .expect("epic");
    engine
        .create_subtask(
            Task::restore_subtask(4, "s", "", Status::InProgress, 3)
                .expect("subtask")
                .with_timing(Some(Duration::hours(1)), Some(at(13))),
        )
        .expect("create subtask");
    let saved = std::fs::read_to_string(&path).expect("saved");
    let epic_before = engine.epics().next().cloned().expect("epic");

    let moved_task = Task::restore(2, "B", "", Status::Done)
        .with_timing(Some(Duration::hours(1)), Some(at(9)));
    assert!(matches!(
        engine.update_task(moved_task),
        Err(Error::Overlap { id: 2, conflicting: 1 })
    ));

    let moved_subtask = Task::restore_subtask(4, "s", "", Status::Done, 3)
        .expect("subtask")
        .with_timing(Some(Duration::hours(2)), Some(at(11)));
    assert!(matches!(
        engine.update_subtask(moved_subtask),
        Err(Error::Overlap { id: 4, conflicting: 2 })
    ));

    let task = engine.tasks().find(|t| t.id() == 2).expect("task");
    assert_eq!(task.start_time, Some(at(11)));
    assert_eq!(task.duration, Some(Duration::hours(1)));
    assert_eq!(task.status, Status::New);

    let subtask = engine.subtasks().next().expect("subtask");
    assert_eq!(subtask.start_time, Some(at(13)));
    assert_eq!(subtask.duration, Some(Duration::hours(1)));
    assert_eq!(subtask.status, Status::InProgress);

    let epic = engine.epics().next().expect("epic");
    assert_eq!(epic.status, Status::InProgress);
    assert_eq!(epic.status, epic_before.status);
    assert_eq!(epic.start_time, epic_before.start_time);
    assert_eq!(epic.duration, epic_before.duration);
    assert_eq!(epic.end_time(), epic_before.end_time());

    assert_eq!(ids(&engine.prioritized()), vec![1, 2, 4]);
    assert_eq!(std::fs::read_to_string(&path).expect("reread"), saved);
}

#[test]
fn durations_must_be_whole_non_negative_minutes() {
    let mut engine = TaskEngine::new();
    for (id, duration) in [(1, Duration::seconds(90)), (2, Duration::minutes(-5))] {
        let err = engine
            .create_task(
                Task::restore(id, "t", "", Status::New).with_timing(Some(duration), Some(at(9))),
            )
            .expect_err("bad duration");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
    assert_eq!(engine.tasks().count(), 0);

    engine
        .create_task(
            Task::restore(3, "t", "", Status::New)
                .with_timing(Some(Duration::minutes(45)), Some(at(9))),
        )
        .expect("whole minutes");
    let err = engine
        .update_task(
            Task::restore(3, "t", "", Status::New)
                .with_timing(Some(Duration::seconds(30)), Some(at(9))),
        )
        .expect_err("sub-minute update");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(
        engine.tasks().next().and_then(|t| t.duration),
        Some(Duration::minutes(45))
    );

    engine
        .create_epic(Task::restore_epic(4, "epic", "", Status::New))
        .expect("epic");
    let err = engine
        .create_subtask(
            Task::restore_subtask(5, "s", "", Status::New, 4)
                .expect("subtask")
                .with_timing(Some(Duration::milliseconds(1500)), None),
        )
        .expect_err("sub-minute subtask");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(engine.subtasks().count(), 0);
}

#[test]
fn history_moves_repeat_views_to_the_tail() {
    let mut engine = TaskEngine::new();
    for id in [1, 2, 3] {
        engine
            .create_task(Task::restore(id, format!("t{id}"), "", Status::New))
            .expect("task");
    }
    for id in [1, 2, 1, 3] {
        assert!(engine.get_task(id).is_some());
    }
    assert_eq!(ids(&engine.history()), vec![2, 1, 3]);
}

#[test]
fn history_removal_keeps_the_rest_in_order() {
    let mut history = HistoryTracker::new();
    for id in [1, 2, 3] {
        history.record(Task::restore(id, "t", "", Status::New));
    }
    assert!(history.remove(2));
    assert_eq!(ids(&history.snapshot()), vec![1, 3]);
    assert!(!history.remove(2));
}

#[test]
fn saved_engine_reloads_with_the_same_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tasks.csv");

    let mut engine = TaskEngine::open(&path, 1000).expect("open");
    engine
        .create_task(
            Task::restore(1, "Report, final", "line one\nline two", Status::InProgress)
                .with_timing(Some(Duration::minutes(90)), Some(at(8))),
        )
        .expect("task 1");
    engine
        .create_task(Task::restore(2, "Call back", "", Status::Done))
        .expect("task 2");
    engine
        .create_epic(Task::restore_epic(3, "Move", "flat", Status::New))
        .expect("epic");
    engine
        .create_subtask(
            Task::restore_subtask(5, "Boxes", "", Status::Done, 3)
                .expect("s5")
                .with_timing(Some(Duration::hours(1)), Some(at(12))),
        )
        .expect("subtask 5");
    engine
        .create_subtask(Task::restore_subtask(4, "Keys", "", Status::New, 3).expect("s4"))
        .expect("subtask 4");

    let reloaded = FileStore::new(&path, 1000).load().expect("load");
    for (left, right) in [
        (engine.tasks().collect::<Vec<_>>(), reloaded.tasks().collect::<Vec<_>>()),
        (engine.epics().collect(), reloaded.epics().collect()),
        (engine.subtasks().collect(), reloaded.subtasks().collect()),
    ] {
        assert_eq!(left.len(), right.len());
        for (a, b) in left.iter().zip(right.iter()) {
            assert_same_fields(a, b);
        }
    }

    let epic = reloaded.epics().next().expect("epic");
    assert_eq!(epic.subtask_ids(), &[5, 4]);
    assert_eq!(epic.status, Status::InProgress);
    assert_eq!(ids(&reloaded.prioritized()), vec![1, 5]);
}

#[test]
fn reload_preserves_child_order() {
    let mut engine = TaskEngine::new();
    engine
        .create_epic(Task::restore_epic(7, "epic", "", Status::New))
        .expect("epic");
    for id in [9, 8] {
        engine
            .create_subtask(Task::restore_subtask(id, "s", "", Status::New, 7).expect("s"))
            .expect("subtask");
    }
    assert_eq!(engine.epics().next().map(|e| e.subtask_ids().to_vec()), Some(vec![9, 8]));

    let reloaded = storage::decode(&storage::encode(&engine)).expect("decode");
    let epic = reloaded.epics().next().expect("epic");
    assert_eq!(epic.subtask_ids(), &[9, 8]);
    assert_eq!(reloaded.epic_subtasks(7).len(), 2);
}

#[test]
fn creating_with_a_taken_id_keeps_the_original() {
    let mut engine = TaskEngine::new();
    engine
        .create_task(Task::restore(1, "original", "", Status::New))
        .expect("first");

    let returned = engine
        .create_task(Task::restore(1, "impostor", "", Status::Done))
        .expect("no error");
    assert_eq!(returned.title, "original");

    engine
        .create_epic(Task::restore_epic(1, "epic impostor", "", Status::New))
        .expect("no error across kinds");
    assert_eq!(engine.epics().count(), 0);

    let stored = engine.get_task(1).expect("stored");
    assert_eq!(stored.title, "original");
    assert_eq!(stored.status, Status::New);
}

#[test]
fn ids_generated_after_load_do_not_collide() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tasks.csv");
    std::fs::write(
        &path,
        format!("{}\n5000000,TASK,loaded,NEW,,null,null,\n", storage::HEADER),
    )
    .expect("write");

    let mut engine = TaskEngine::open(&path, 1000).expect("open");
    let fresh = engine.create_task(Task::new("fresh", "")).expect("create");
    assert!(fresh.id() > 5_000_000);
    assert_eq!(engine.tasks().count(), 2);
}

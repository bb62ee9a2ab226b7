//! Start-time ordering of timed tasks and subtasks, and the overlap check
//! that keeps their intervals disjoint.
//!
//! Intervals are half-open, `[start, start + duration)`: a task that ends
//! exactly when another starts does not overlap it.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Default)]
pub struct PrioritizedView {
    ordered: BTreeMap<(NaiveDateTime, TaskId), Task>,
}

impl PrioritizedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the view with the timed members of `population`.
    ///
    /// Untimed records and epics are skipped. Equal start times are ordered
    /// by id.
    pub fn rebuild<'a, I>(&mut self, population: I)
    where
        I: IntoIterator<Item = &'a Task>,
    {
        self.ordered = population
            .into_iter()
            .filter(|task| task.is_timed())
            .filter_map(|task| {
                task.start_time
                    .map(|start| ((start, task.id()), task.clone()))
            })
            .collect();
    }

    /// Reject `candidate` if its interval intersects any other timed record.
    ///
    /// Records without a start time or without a duration are never checked.
    /// The candidate's own id is skipped, so an update is compared against
    /// everything except its previous version.
    pub fn validate(&self, candidate: &Task) -> Result<()> {
        let (Some(start), Some(duration)) = (candidate.start_time, candidate.duration) else {
            return Ok(());
        };
        let end = start + duration;

        let conflict = self.ordered.values().find(|other| {
            if other.id() == candidate.id() {
                return false;
            }
            match (other.start_time, other.end_time()) {
                (Some(other_start), Some(other_end)) => start < other_end && end > other_start,
                _ => false,
            }
        });

        match conflict {
            Some(other) => {
                tracing::warn!(
                    id = candidate.id(),
                    conflicting = other.id(),
                    "rejected overlapping interval"
                );
                Err(Error::Overlap {
                    id: candidate.id(),
                    conflicting: other.id(),
                })
            }
            None => Ok(()),
        }
    }

    /// Timed records in ascending start order.
    pub fn ordered(&self) -> Vec<Task> {
        self.ordered.values().cloned().collect()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.ordered.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

//! View history.
//!
//! Keeps the last-viewed snapshot of every distinct task id, oldest at the
//! head and newest at the tail. Entries live in a slot arena linked by index,
//! with a side map from task id to slot, so recording a view, moving a repeat
//! view to the tail and removing an id are all constant time. There is no
//! capacity bound.

use std::collections::HashMap;

use crate::task::{Task, TaskId};

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: HashMap<TaskId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a view of `task`.
    ///
    /// A repeat view drops the old entry and appends the new snapshot at the
    /// tail, so the stored fields are those seen at the latest view.
    pub fn record(&mut self, task: Task) {
        let id = task.id();
        if let Some(slot) = self.index.remove(&id) {
            self.unlink(slot);
        }
        let slot = self.allocate(Entry {
            task,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.entry_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.index.insert(id, slot);
    }

    /// Drop the entry for `id`. Returns whether one was present.
    pub fn remove(&mut self, id: TaskId) -> bool {
        match self.index.remove(&id) {
            Some(slot) => {
                self.unlink(slot);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.index.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tracker: self,
            cursor: self.head,
        }
    }

    /// Owned copy of the history, oldest first. Later changes to the tracker
    /// do not show through.
    pub fn snapshot(&self) -> Vec<Task> {
        self.iter().cloned().collect()
    }

    fn allocate(&mut self, entry: Entry) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, slot: usize) {
        let Some(entry) = self.slots[slot].take() else {
            return;
        };
        match entry.prev {
            Some(prev) => self.entry_mut(prev).next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => self.entry_mut(next).prev = entry.prev,
            None => self.tail = entry.prev,
        }
        self.free.push(slot);
    }

    // Linked slots are always occupied; a vacant one here means the links
    // are corrupt.
    fn entry_mut(&mut self, slot: usize) -> &mut Entry {
        match self.slots[slot].as_mut() {
            Some(entry) => entry,
            None => unreachable!("history slot {slot} is linked but vacant"),
        }
    }
}

pub struct Iter<'a> {
    tracker: &'a HistoryTracker,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = self.tracker.slots[slot].as_ref()?;
        self.cursor = entry.next;
        Some(&entry.task)
    }
}

impl<'a> IntoIterator for &'a HistoryTracker {
    type Item = &'a Task;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

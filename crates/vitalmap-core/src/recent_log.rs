//! Bounded most-recent-first log of event descriptions.

use std::collections::VecDeque;

use vitalmap_types::LogEntry;

/// A capped log where index 0 is always the newest entry.
///
/// Pushing past capacity evicts exactly the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RecentLog {
    /// An empty log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `entry` as the newest line.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// The newest entry, if any.
    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

//! Access log ring: bounded record of mutation instants.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Cap on retained access instants; older entries are trimmed on insert.
pub const ACCESS_LOG_CAP: usize = 1000;

/// Bounded ordered log of access instants for one session.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    entries: VecDeque<DateTime<Utc>>,
}

impl AccessLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one access, trimming the oldest entries past the cap.
    pub fn record(&mut self, instant: DateTime<Utc>) {
        self.entries.push_back(instant);
        while self.entries.len() > ACCESS_LOG_CAP {
            let _ = self.entries.pop_front();
        }
    }

    /// Number of retained instants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no access has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest retained instant.
    #[must_use]
    pub fn first(&self) -> Option<DateTime<Utc>> {
        self.entries.front().copied()
    }

    /// Most recent instant.
    #[must_use]
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.entries.back().copied()
    }
}

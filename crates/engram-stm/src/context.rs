//! Working context: bounded semantic key/value scratchpad.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StmError;

/// One stored context entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Opaque value; the engine never inspects it.
    pub value: Value,
    /// Instant of the most recent write to this key.
    pub inserted_at: DateTime<Utc>,
}

/// Bounded key/value store for task-critical extracted understanding.
///
/// Overflow is an error rather than silent eviction: losing working context
/// changes agent behavior, so callers must decide what to drop.
#[derive(Debug, Clone)]
pub struct WorkingContext {
    entries: HashMap<String, ContextEntry>,
    max_items: usize,
}

impl WorkingContext {
    /// Create an empty context with the given capacity.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_items: max_items.max(1),
        }
    }

    /// Insert or overwrite one key.
    ///
    /// Overwriting an existing key always succeeds and refreshes
    /// `inserted_at`; inserting a new key at capacity fails.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::CapacityExceeded`] when the key is new and the
    /// context is full. The context is unchanged in that case.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Result<(), StmError> {
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() == self.max_items {
            return Err(StmError::CapacityExceeded {
                max_items: self.max_items,
            });
        }
        self.entries.insert(
            key,
            ContextEntry {
                value,
                inserted_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Insert a batch of keys atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::CapacityExceeded`] when the merged size would
    /// exceed capacity; no partial update is observable.
    pub fn put_many(&mut self, values: Map<String, Value>) -> Result<(), StmError> {
        let new_keys = values
            .keys()
            .filter(|key| !self.entries.contains_key(key.as_str()))
            .count();
        if self.entries.len() + new_keys > self.max_items {
            return Err(StmError::CapacityExceeded {
                max_items: self.max_items,
            });
        }
        let now = Utc::now();
        for (key, value) in values {
            self.entries.insert(
                key,
                ContextEntry {
                    value,
                    inserted_at: now,
                },
            );
        }
        Ok(())
    }

    /// Look up one key.
    ///
    /// # Errors
    ///
    /// Returns [`StmError::KeyNotFound`] when the key is absent.
    pub fn get(&self, key: &str) -> Result<&Value, StmError> {
        self.entries
            .get(key)
            .map(|entry| &entry.value)
            .ok_or_else(|| StmError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Look up one key, falling back to a default value.
    #[must_use]
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.entries
            .get(key)
            .map_or(default, |entry| entry.value.clone())
    }

    /// Full entry for one key, including its insertion instant.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&ContextEntry> {
        self.entries.get(key)
    }

    /// Remove one key. Idempotent; returns whether the key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Present keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }
}

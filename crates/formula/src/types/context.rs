//! Per-compilation dispatch context
//!
//! A `DispatchContext` is created for one compile (or evaluate) call and
//! dropped afterwards. It pins the current instant so every formula compiled
//! in the same batch sees the same clock reading, and optionally carries the
//! concrete row being inserted.

use super::row::Row;
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Context handed to function codegen callbacks
#[derive(Debug, Clone)]
pub struct DispatchContext<'a> {
    /// Table whose rows the compiled expression runs against
    table: String,
    /// Row instance when compiling for insert-time evaluation
    row: Option<&'a Row>,
    /// Pinned current instant
    current_instant: DateTime<Utc>,
}

impl<'a> DispatchContext<'a> {
    pub fn new(table: impl Into<String>, current_instant: DateTime<Utc>) -> Self {
        Self {
            table: table.into(),
            row: None,
            current_instant,
        }
    }

    /// Compile against a concrete row (insert-time evaluation)
    pub fn with_row(mut self, row: &'a Row) -> Self {
        self.row = Some(row);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row(&self) -> Option<&'a Row> {
        self.row
    }

    pub fn current_instant(&self) -> DateTime<Utc> {
        self.current_instant
    }

    /// Deterministic identifier for the node at `path`.
    ///
    /// The same table, instant and path always give the same UUID, so
    /// compiling a tree twice with an equal context yields equal output.
    pub fn deterministic_uuid(&self, path: &[usize]) -> uuid::Uuid {
        let mut hasher = DefaultHasher::new();
        self.table.hash(&mut hasher);
        self.current_instant.timestamp_micros().hash(&mut hasher);
        path.hash(&mut hasher);

        let hash = hasher.finish();
        let bytes = hash.to_be_bytes();

        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..].copy_from_slice(&bytes);

        // Version (4) and variant bits
        uuid_bytes[6] = (uuid_bytes[6] & 0x0f) | 0x40;
        uuid_bytes[8] = (uuid_bytes[8] & 0x3f) | 0x80;

        uuid::Uuid::from_bytes(uuid_bytes)
    }

    /// Alias for the aggregate subquery compiled at `path`
    pub fn subquery_alias(&self, path: &[usize]) -> String {
        format!("agg_{}", self.deterministic_uuid(path).simple())
    }
}

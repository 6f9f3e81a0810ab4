//! In-memory rows used by the reference evaluator

use super::Value;
use std::collections::HashMap;

/// A row keyed by backend column name, with the rows each link column points to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub id: i64,
    pub values: HashMap<String, Value>,
    pub links: HashMap<String, Vec<Row>>,
}

impl Row {
    pub const ID_COLUMN: &'static str = "id";

    /// A row whose id is also readable as the `id` column
    pub fn new(id: i64) -> Self {
        let mut row = Self {
            id,
            ..Default::default()
        };
        row.values.insert(Self::ID_COLUMN.to_string(), Value::Integer(id));
        row
    }

    pub fn with_value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    pub fn with_links(mut self, column: impl Into<String>, rows: Vec<Row>) -> Self {
        self.links.insert(column.into(), rows);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn linked(&self, column: &str) -> &[Row] {
        self.links.get(column).map(Vec::as_slice).unwrap_or(&[])
    }
}

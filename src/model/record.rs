//! A record and its attributes.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Record identifier.
///
/// Ordinarily dense and assigned on ingest, but the label store mints
/// negative synthetic IDs (`-3..=-1`) for duplicated seed records, so this
/// is signed rather than the `u64` a plain auto-increment would suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self { RecordId(v) }
}

/// Every attribute value is coerced to a string before it reaches the
/// blocking/distance layers.
pub type Attributes = HashMap<String, String>;

/// A single input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub attributes: Attributes,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, attributes: Attributes) -> Self {
        Self { id: id.into(), attributes }
    }

    /// Lowercased, trimmed attribute value, or `None` if missing/empty.
    pub fn normalized(&self, attr: &str) -> Option<String> {
        let v = self.attributes.get(attr)?.trim();
        if v.is_empty() { None } else { Some(v.to_lowercase()) }
    }

    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attributes.get(attr).map(String::as_str)
    }
}

/// Which input table a record came from, for record-linkage mode.
///
/// Dedupe mode never tags records; record linkage treats the two tables as
/// a disjoint union and suffixes cluster output IDs by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableSide {
    Left,
    Right,
}

impl std::fmt::Display for TableSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSide::Left => write!(f, "l"),
            TableSide::Right => write!(f, "r"),
        }
    }
}

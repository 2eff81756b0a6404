use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A transformed, de-duplicated unit of output
///
/// The `id` is the dedup key; everything else the transform produced lives in
/// `fields` and is flattened into the serialized form, so the checkpoint
/// artifact reads as a plain JSON array of records for downstream tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputRecord {
    /// Stable record identifier used as the dedup key
    pub id: String,

    /// All other fields produced by the record transform
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OutputRecord {
    /// Creates a record from an id and a field map
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Process-wide accumulation of harvested records
///
/// Owns every record after insertion; records are never mutated in place.
/// A later shard that re-encounters an id is dropped, not merged.
#[derive(Debug, Default)]
pub struct CrawlState {
    records: Vec<OutputRecord>,
    seen: HashSet<String>,
}

impl CrawlState {
    /// Creates an empty crawl state
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates state from a prior checkpoint's records
    ///
    /// Seen ids are rebuilt from the record ids, so a resumed run dedups
    /// against everything the previous run already harvested.
    pub fn from_records(records: Vec<OutputRecord>) -> Self {
        let seen = records.iter().map(|r| r.id.clone()).collect();
        Self { records, seen }
    }

    /// Inserts a record unless its id was already seen
    ///
    /// Returns `true` if the record was newly inserted, `false` if a record
    /// with the same id was already present (the duplicate is dropped).
    pub fn accept(&mut self, record: OutputRecord) -> bool {
        if !self.seen.insert(record.id.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// A consistent point-in-time view of all accumulated records
    ///
    /// Callers snapshot between inserts; there is no concurrent writer.
    pub fn snapshot(&self) -> &[OutputRecord] {
        &self.records
    }

    /// Number of records accumulated so far
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.records.len(), self.seen.len());
        self.records.len()
    }

    /// Returns whether no records have been accumulated
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns whether an id has already been accepted
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

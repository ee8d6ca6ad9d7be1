//! Correlation store: request/response pairing by correlation id.
//!
//! Ids keep first-sighting insertion order so every downstream ordering is
//! deterministic across identical parse runs.

use std::collections::HashMap;

use crate::models::CorrelationRecord;

#[derive(Debug, Default)]
pub struct CorrelationStore {
    records: HashMap<String, CorrelationRecord>,
    order: Vec<String>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the record for `id`, creating it with empty placeholders on
    /// first sighting of either half.
    pub fn entry(&mut self, id: &str) -> &mut CorrelationRecord {
        if !self.records.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.records.entry(id.to_string()).or_default()
    }

    pub fn get(&self, id: &str) -> Option<&CorrelationRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in first-sighting order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CorrelationRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|rec| (id.as_str(), rec)))
    }

    /// Post-pass prune: split the store into complete records (kept, order
    /// preserved) and records where a half never resolved to non-trivial
    /// content (removed).
    pub fn clean(mut self) -> (CorrelationStore, Vec<(String, CorrelationRecord)>) {
        let mut kept = CorrelationStore::new();
        let mut removed = Vec::new();
        for id in std::mem::take(&mut self.order) {
            if let Some(record) = self.records.remove(&id) {
                if record.is_complete() {
                    kept.order.push(id.clone());
                    kept.records.insert(id, record);
                } else {
                    removed.push((id, record));
                }
            }
        }
        (kept, removed)
    }
}

//! Request statistics: (protocol, service, action) index over the cleaned
//! correlation records.
//!
//! Rebuilt in full from a parse snapshot; the `ids_for` lookup is the
//! primary interface every domain view uses to find its records.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Protocol, StatRow};
use crate::parser::{classify, ParsedLog};

#[derive(Debug, Clone)]
pub struct StatEntry {
    pub id: String,
    pub lens: usize,
    pub req_time: String,
}

type ActionMap = BTreeMap<String, Vec<StatEntry>>;
type ServiceMap = BTreeMap<String, ActionMap>;

#[derive(Debug, Default)]
pub struct StatisticsIndex {
    index: BTreeMap<Protocol, ServiceMap>,
    protocol_counts: BTreeMap<Protocol, usize>,
    total_records: usize,
}

impl StatisticsIndex {
    pub fn build(log: &ParsedLog) -> Self {
        let mut stats = StatisticsIndex::default();
        for protocol in Protocol::ALL {
            stats.index.insert(protocol, ServiceMap::new());
            stats.protocol_counts.insert(protocol, 0);
        }

        for (id, record) in log.records.iter() {
            stats.total_records += 1;
            let Some(protocol) = record.protocol else {
                // untagged records are counted but not indexable
                continue;
            };
            let Some(request) = &record.request else { continue };
            *stats.protocol_counts.entry(protocol).or_default() += 1;

            let (servicename, action) = classify::service_and_action(request, protocol);
            stats
                .index
                .entry(protocol)
                .or_default()
                .entry(servicename)
                .or_default()
                .entry(action)
                .or_default()
                .push(StatEntry {
                    id: id.to_string(),
                    lens: record.serialized_len(),
                    req_time: record.req_time.clone(),
                });
        }

        debug!(
            total = stats.total_records,
            pb = stats.protocol_count(Protocol::Pb),
            json = stats.protocol_count(Protocol::Json),
            funid = stats.protocol_count(Protocol::JsonFunid),
            "request statistics built"
        );
        stats
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn protocol_count(&self, protocol: Protocol) -> usize {
        self.protocol_counts.get(&protocol).copied().unwrap_or(0)
    }

    /// Ordered correlation ids for one (protocol, service, action) group.
    pub fn ids_for(&self, protocol: &str, servicename: &str, action: &str) -> Vec<String> {
        self.entries_for(protocol, servicename, action)
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    pub fn entries_for(&self, protocol: &str, servicename: &str, action: &str) -> &[StatEntry] {
        Protocol::from_tag(protocol)
            .and_then(|p| self.index.get(&p))
            .and_then(|services| services.get(servicename))
            .and_then(|actions| actions.get(action))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flattened per-group summary rows with human-formatted sizes.
    pub fn summary_rows(&self) -> Vec<StatRow> {
        let mut rows = Vec::new();
        for (protocol, services) in &self.index {
            for (servicename, actions) in services {
                for (action, entries) in actions {
                    let total: usize = entries.iter().map(|e| e.lens).sum();
                    let avg = total as f64 / entries.len().max(1) as f64;
                    rows.push(StatRow {
                        protocol: protocol.as_str(),
                        servicename: servicename.clone(),
                        action: action.clone(),
                        counts: entries.len(),
                        avg_lens: format_size(avg),
                        total_lens: format_size(total as f64),
                    });
                }
            }
        }
        rows
    }
}

/// Human-readable byte size: integer bytes, one decimal above.
pub fn format_size(size: f64) -> String {
    let mut size = size;
    for unit in ["B", "K", "M", "G", "T"] {
        if size < 1024.0 {
            return if unit == "B" {
                format!("{}B", size as u64)
            } else {
                format!("{size:.1}{unit}")
            };
        }
        size /= 1024.0;
    }
    format!("{size:.1}P")
}

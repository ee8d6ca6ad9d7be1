//! Single-pass log correlation engine.
//!
//! Raw text lines stream once through line classification → payload
//! extraction → (correlation store | special-line router). After the pass a
//! clean step prunes records whose request or response never resolved to
//! non-trivial content. Everything is scoped to one parse call: each upload
//! builds a fresh parser and ends in an immutable [`ParsedLog`] snapshot.

pub mod classify;
pub mod correlate;
pub mod payload;
pub mod special;
pub mod stats;
pub mod timeline;
pub mod tokens;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::models::{CorrelationRecord, IllegalLine, RecordKind};
use correlate::CorrelationStore;
use special::SpecialBuckets;

/// Per-run parse context. All buckets live here; nothing is process-wide.
#[derive(Debug, Default)]
pub struct LogParser {
    store: CorrelationStore,
    special: SpecialBuckets,
    illegal: Vec<IllegalLine>,
    timeout_lines: Vec<String>,
    skipped_lines: Vec<String>,
    retransmit_lines: Vec<String>,
    username: Vec<String>,
    username_resolved: bool,
    log_begin_time: String,
    log_end_time: String,
}

/// Immutable result of one parse run.
#[derive(Debug)]
pub struct ParsedLog {
    /// Complete correlation records, first-sighting order preserved.
    pub records: CorrelationStore,
    /// Records pruned by the post-pass clean step.
    pub removed: Vec<(String, CorrelationRecord)>,
    pub special: SpecialBuckets,
    pub illegal: Vec<IllegalLine>,
    pub timeout_lines: Vec<String>,
    pub skipped_lines: Vec<String>,
    pub retransmit_lines: Vec<String>,
    pub username: Vec<String>,
    pub log_begin_time: String,
    pub log_end_time: String,
}

impl LogParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process every line of every blob, in list order, then clean.
    ///
    /// Single-threaded and synchronous by design; a line-level failure is
    /// recorded and skipped, only a totally unusable input is an error.
    pub fn parse(mut self, files: &[String]) -> Result<ParsedLog> {
        if files.is_empty() {
            bail!("no log content to parse");
        }

        for content in files {
            for line in content.split('\n') {
                self.parse_line(line);
            }
        }

        let (records, removed) = self.store.clean();
        info!(
            records = records.len(),
            removed = removed.len(),
            illegal = self.illegal.len(),
            skipped = self.skipped_lines.len(),
            "log parse complete"
        );

        Ok(ParsedLog {
            records,
            removed,
            special: self.special,
            illegal: self.illegal,
            timeout_lines: self.timeout_lines,
            skipped_lines: self.skipped_lines,
            retransmit_lines: self.retransmit_lines,
            username: self.username,
            log_begin_time: self.log_begin_time,
            log_end_time: self.log_end_time,
        })
    }

    /// Classify and dispatch one line. Checked in strict order; first
    /// match wins.
    fn parse_line(&mut self, line: &str) {
        if line.contains(classify::RETRANSMIT_MARKER) {
            self.retransmit_lines.push(line.to_string());
            return;
        }
        if line.contains(classify::TIMEOUT_MARKER) {
            self.timeout_lines.push(line.to_string());
            return;
        }
        if !line.contains('|') {
            self.skipped_lines.push(line.to_string());
            return;
        }

        let Some(fields) = classify::split_fields(line) else {
            warn!(line, "line has too few fields, dropped");
            return;
        };

        if self.log_begin_time.is_empty() {
            self.log_begin_time = fields.time.clone();
        }
        self.log_end_time = fields.time.clone();

        if !fields.id.is_empty() {
            self.process_correlated(line, &fields);
        } else {
            self.special.route(line, &fields.kind, &fields.time);
        }
    }

    fn process_correlated(&mut self, line: &str, fields: &classify::LineFields) {
        // record exists from first sighting even if this half fails to decode
        self.store.entry(&fields.id);

        let Some(kind) = RecordKind::from_field(&fields.kind) else {
            self.illegal.push(IllegalLine {
                line: line.to_string(),
                error: format!("unknown record kind '{}'", fields.kind),
            });
            return;
        };

        let marker = payload::marker_for(kind);
        let raw_payload = payload::extract_payload(line, marker);
        let decoded = match payload::decode(&raw_payload) {
            Ok(value) => value,
            Err(err) => {
                self.illegal.push(IllegalLine {
                    line: line.to_string(),
                    error: err.to_string(),
                });
                return;
            }
        };

        if !self.username_resolved && raw_payload.contains("useraccount") {
            self.username = payload::find_key(&decoded, "useraccount")
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            self.username_resolved = true;
        }

        let record = self.store.entry(&fields.id);
        match kind {
            RecordKind::Request => {
                record.request = Some(decoded);
                record.req_time = fields.time.clone();
                // first classification wins; resends with the same id do
                // not override
                if record.protocol.is_none() {
                    record.protocol = classify::classify_protocol(line);
                }
            }
            RecordKind::Response => {
                record.response = Some(decoded);
                record.rsp_time = fields.time.clone();
            }
        }
    }
}

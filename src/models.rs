//! Shared data model for the client log analyzer.
//!
//! Everything here lives for exactly one parse run. A new upload builds an
//! entirely new instance graph; nothing is shared across runs.

use serde::Serialize;
use serde_json::{json, Value};

/// Wire protocol families, distinguished by which marker field is present
/// in a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Binary/typed RPC style, carries a `servicename` field.
    Pb,
    /// Generic JSON-RPC style, carries an `action` field.
    Json,
    /// Legacy numeric-command style, carries a `FunID` field.
    JsonFunid,
}

impl Protocol {
    /// Iteration order used by the statistics index. Matches the derived
    /// `Ord`, so `BTreeMap<Protocol, _>` walks the same sequence.
    pub const ALL: [Protocol; 3] = [Protocol::Pb, Protocol::Json, Protocol::JsonFunid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Pb => "pb",
            Protocol::JsonFunid => "json_funid",
            Protocol::Json => "json",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Protocol> {
        match tag {
            "pb" => Some(Protocol::Pb),
            "json_funid" => Some(Protocol::JsonFunid),
            "json" => Some(Protocol::Json),
            _ => None,
        }
    }
}

/// Declared record kind of a log line (field 2 of the pipe split).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Request,
    Response,
}

impl RecordKind {
    pub fn from_field(field: &str) -> Option<RecordKind> {
        match field {
            "request" => Some(RecordKind::Request),
            "response" => Some(RecordKind::Response),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Request => "request",
            RecordKind::Response => "response",
        }
    }
}

/// An accumulating request/response pair keyed by correlation id.
///
/// Created on first sighting of either half; mutated in place as the other
/// half arrives. Never deleted during the pass — pruning happens only in the
/// post-pass clean step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelationRecord {
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub req_time: String,
    pub rsp_time: String,
    pub protocol: Option<Protocol>,
}

/// Serialized length of one payload half; an absent half counts as zero.
pub fn payload_len(side: &Option<Value>) -> usize {
    side.as_ref().map(|v| v.to_string().len()).unwrap_or(0)
}

impl CorrelationRecord {
    /// A record is complete only when both halves decoded to something
    /// larger than the empty object literal `{}`.
    pub fn is_complete(&self) -> bool {
        payload_len(&self.request) > 2 && payload_len(&self.response) > 2
    }

    pub fn protocol_tag(&self) -> &'static str {
        self.protocol.map(|p| p.as_str()).unwrap_or("")
    }

    /// Byte length of the whole serialized record, used by the statistics
    /// index. Empty halves serialize as `""` to keep the figure stable.
    pub fn serialized_len(&self) -> usize {
        let request = self.request.clone().unwrap_or_else(|| Value::String(String::new()));
        let response = self.response.clone().unwrap_or_else(|| Value::String(String::new()));
        json!({
            "request": request,
            "response": response,
            "req_time": self.req_time,
            "rsp_time": self.rsp_time,
            "protocol": self.protocol_tag(),
        })
        .to_string()
        .len()
    }
}

/// Categories of server pushes and orphans that share the response wire
/// format but never carry a correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushCategory {
    BasketOrder,
    Algorithm,
    GradeInstruction,
    GradeCondition,
    GradeOrder,
    OrphanResponse,
}

impl PushCategory {
    pub const ALL: [PushCategory; 6] = [
        PushCategory::BasketOrder,
        PushCategory::Algorithm,
        PushCategory::GradeInstruction,
        PushCategory::GradeCondition,
        PushCategory::GradeOrder,
        PushCategory::OrphanResponse,
    ];

    /// Tag used for timeline entries of this category.
    pub fn push_type(&self) -> &'static str {
        match self {
            PushCategory::BasketOrder => "basket_order_push",
            PushCategory::Algorithm => "algorithm_push",
            PushCategory::GradeInstruction => "gradecondition_push_instruction",
            PushCategory::GradeCondition => "gradecondition_push_condition",
            PushCategory::GradeOrder => "gradecondition_push_order",
            PushCategory::OrphanResponse => "response_push",
        }
    }
}

/// One uncorrelated payload: timestamp plus the raw (undecoded) substring
/// after the response marker. Decoding is deferred to the domain views so
/// categories that are never queried never pay the JSON-parse cost.
#[derive(Debug, Clone, Serialize)]
pub struct PushEvent {
    pub time: String,
    pub payload: String,
}

/// A correlated line that failed payload decoding. The parse continues; the
/// offending line is kept for operator diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct IllegalLine {
    pub line: String,
    pub error: String,
}

/// One entry of the merged chronological timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimelineEntry {
    Record(RecordEntry),
    Push(PushEntry),
}

impl TimelineEntry {
    pub fn time(&self) -> &str {
        match self {
            TimelineEntry::Record(e) => &e.time,
            TimelineEntry::Push(e) => &e.time,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            TimelineEntry::Record(e) => &e.content,
            TimelineEntry::Push(e) => &e.content,
        }
    }
}

/// One half of a correlation record projected onto the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEntry {
    pub id: String,
    pub content: String,
    pub time: String,
    pub servicename: String,
    pub action: String,
    pub record_type: &'static str,
    pub protocol: &'static str,
}

/// A push event projected onto the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEntry {
    pub content: String,
    pub time: String,
    pub push_type: &'static str,
}

/// Operator-facing summary of one parse run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub total_records: usize,
    pub removed_records: usize,
    pub pb_requests: usize,
    pub json_requests: usize,
    pub funid_requests: usize,
    pub illegal_lines: usize,
    pub timeout_lines: usize,
    pub skipped_lines: usize,
    pub retransmit_lines: usize,
    pub orphan_responses: usize,
    pub orphan_lines: usize,
    pub log_begin_time: String,
    pub log_end_time: String,
    pub username: Vec<String>,
    pub userid: String,
}

/// One row of the request statistics summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatRow {
    pub protocol: &'static str,
    pub servicename: String,
    pub action: String,
    pub counts: usize,
    pub avg_lens: String,
    pub total_lens: String,
}

/// One broker account extracted from a portfolio listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountInfo {
    pub user_id: String,
    pub fund_token: String,
    pub account_code: String,
    pub account_name: String,
    pub alias: String,
    pub broker_id: String,
    pub broker_name: String,
    pub trade_type: String,
}

impl AccountInfo {
    /// Display descriptor used everywhere a token needs a human name.
    pub fn descriptor(&self) -> String {
        format!("{}:{}:{}", self.account_code, self.broker_name, self.trade_type)
    }

    /// Secondary lookup key for when the exact token is unknown.
    pub fn account_key(&self) -> String {
        format!("{}:{}", self.account_code, self.trade_type)
    }
}

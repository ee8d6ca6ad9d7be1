//! Payload extraction and repair.
//!
//! Correlated lines embed their JSON payload after a kind-specific marker.
//! The terminal's log writer sometimes truncates or mis-escapes nested JSON,
//! so two fixed textual repairs run before decoding: a known corrupted
//! closing-bracket sequence is rewritten, and embedded CR-LF pairs are
//! stripped. These are literal fixes, not a general-purpose sanitizer.

use serde_json::Value;

use crate::models::RecordKind;

/// Marker preceding the payload on request lines.
pub const REQUEST_MARKER: &str = "&send=";

/// Marker preceding the payload on response lines.
pub const RESPONSE_MARKER: &str = "&recv=";

/// Corrupted closing-bracket artifact of upstream truncation.
const CORRUPTED_BRACKETS: &str = "******";
const REPAIRED_BRACKETS: &str = "}]}}}},";

pub fn marker_for(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Request => REQUEST_MARKER,
        RecordKind::Response => RESPONSE_MARKER,
    }
}

/// The raw substring between the first and (if any) second occurrence of
/// the marker. `None` when the marker is absent.
pub fn split_segment<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.split(marker).nth(1)
}

/// Locate the payload substring for a correlated line. A missing marker or
/// a segment no longer than `{}` degrades to the empty object literal.
pub fn extract_payload(line: &str, marker: &str) -> String {
    match split_segment(line, marker) {
        Some(segment) if segment.len() > 2 => segment.to_string(),
        _ => "{}".to_string(),
    }
}

/// Apply the fixed textual repairs.
pub fn repair(payload: &str) -> String {
    payload
        .replace(CORRUPTED_BRACKETS, REPAIRED_BRACKETS)
        .replace("\r\n", "")
}

/// Repair then decode a payload substring.
pub fn decode(payload: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&repair(payload))
}

/// Collect every value stored under `target` at any depth of a decoded
/// structure, in document order.
pub fn find_key(value: &Value, target: &str) -> Vec<Value> {
    let mut found = Vec::new();
    collect_key(value, target, &mut found);
    found
}

fn collect_key(value: &Value, target: &str, found: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == target {
                    found.push(child.clone());
                }
                collect_key(child, target, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_key(item, target, found);
            }
        }
        _ => {}
    }
}

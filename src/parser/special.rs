//! Routing for lines without a correlation id.
//!
//! Several server-push notification types share the wire format of a
//! response but are not replies to any request. They are recognized by
//! content keywords — at this stage the payload has not been decoded, and
//! most buckets stay raw until a domain view actually asks for them. The
//! one exception is the account-query result, which is digested during the
//! pass because it also carries the run's user id.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{PushCategory, PushEvent};
use crate::parser::payload;

/// Marker of an account-query broadcast, spelled exactly as the terminal
/// emits it (typo included).
pub const ACCOUNT_QUERY_MARKER: &str = "query accout result";
const ACCOUNT_QUERY_EVENT: &str = "query accout result!";
const ACCOUNT_LIST_PREFIX: &str = "InitAccountList:: result";

pub const BASKET_PUSH_MARKER: &str = "basket_order_push";

/// Algorithm push keywords: three algorithm families, three event subtypes
/// each.
pub const ALGORITHM_PUSH_KEYS: [&str; 9] = [
    "twap_instruction",
    "twap_order",
    "twap_trade",
    "twapplus_instruction",
    "twapplus_order",
    "twapplus_trade",
    "iceberg_instruction",
    "iceberg_order",
    "iceberg_trade",
];

/// Accumulation buckets for id-less lines. Append-only during the pass.
#[derive(Debug, Default)]
pub struct SpecialBuckets {
    /// Query time → cleaned account-list payload.
    pub query_accounts: BTreeMap<String, String>,
    pub userid: String,
    pub basket_push: Vec<PushEvent>,
    pub basket_push_count: usize,
    pub algorithm_push: Vec<PushEvent>,
    pub grade_instruction_push: Vec<PushEvent>,
    pub grade_condition_push: Vec<PushEvent>,
    pub grade_order_push: Vec<PushEvent>,
    pub orphan_responses: Vec<PushEvent>,
    pub orphan_lines: Vec<String>,
}

impl SpecialBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one id-less line. First match wins; rules that need the
    /// response-marker remainder fall through to the orphan-line bucket
    /// when the marker is absent instead of aborting the pass.
    pub fn route(&mut self, line: &str, kind: &str, time: &str) {
        if line.contains(ACCOUNT_QUERY_MARKER) {
            self.digest_account_query(line, time);
        } else if line.contains(BASKET_PUSH_MARKER) {
            if self.push_raw(line, time, PushCategory::BasketOrder) {
                self.basket_push_count += 1;
            }
        } else if ALGORITHM_PUSH_KEYS.iter().any(|key| line.contains(key)) {
            self.push_raw(line, time, PushCategory::Algorithm);
        } else if line.contains("grade_instruction") {
            self.push_raw(line, time, PushCategory::GradeInstruction);
        } else if line.contains("grade_condition") {
            self.push_raw(line, time, PushCategory::GradeCondition);
        } else if line.contains("grade_order") {
            self.push_raw(line, time, PushCategory::GradeOrder);
        } else if kind == "response" {
            self.push_raw(line, time, PushCategory::OrphanResponse);
        } else {
            self.orphan_lines.push(line.to_string());
        }
    }

    pub fn events(&self, category: PushCategory) -> &[PushEvent] {
        match category {
            PushCategory::BasketOrder => &self.basket_push,
            PushCategory::Algorithm => &self.algorithm_push,
            PushCategory::GradeInstruction => &self.grade_instruction_push,
            PushCategory::GradeCondition => &self.grade_condition_push,
            PushCategory::GradeOrder => &self.grade_order_push,
            PushCategory::OrphanResponse => &self.orphan_responses,
        }
    }

    fn bucket_mut(&mut self, category: PushCategory) -> &mut Vec<PushEvent> {
        match category {
            PushCategory::BasketOrder => &mut self.basket_push,
            PushCategory::Algorithm => &mut self.algorithm_push,
            PushCategory::GradeInstruction => &mut self.grade_instruction_push,
            PushCategory::GradeCondition => &mut self.grade_condition_push,
            PushCategory::GradeOrder => &mut self.grade_order_push,
            PushCategory::OrphanResponse => &mut self.orphan_responses,
        }
    }

    fn push_raw(&mut self, line: &str, time: &str, category: PushCategory) -> bool {
        match payload::split_segment(line, payload::RESPONSE_MARKER) {
            Some(segment) => {
                self.bucket_mut(category).push(PushEvent {
                    time: time.to_string(),
                    payload: segment.to_string(),
                });
                true
            }
            None => {
                self.orphan_lines.push(line.to_string());
                false
            }
        }
    }

    /// Best-effort digestion of an account-query broadcast. These lines
    /// have historically been less well-formed, so every failure here is
    /// silently swallowed.
    fn digest_account_query(&mut self, line: &str, time: &str) {
        let Some(segment) = payload::split_segment(line, payload::REQUEST_MARKER) else {
            return;
        };
        let Ok(decoded) = serde_json::from_str::<Value>(segment) else {
            return;
        };
        let Some(logbody) = decoded.pointer("/params/logbody").and_then(Value::as_array) else {
            return;
        };

        let mut account_list = String::new();
        for item in logbody {
            if item.get("event").and_then(Value::as_str) == Some(ACCOUNT_QUERY_EVENT) {
                if let Some(msg) = item.get("msg").and_then(Value::as_str) {
                    account_list = strip_outer(&msg.replace(ACCOUNT_LIST_PREFIX, ""));
                }
            }
            if let Some(userid) = item.get("userid") {
                self.userid = match userid {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
        }
        self.query_accounts.insert(time.to_string(), account_list);
    }
}

/// Drop the first and last character (the bracket pair wrapping the
/// embedded account list).
fn strip_outer(s: &str) -> String {
    let mut chars = s.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}

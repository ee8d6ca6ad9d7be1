//! Algorithm execution pushes (TWAP, TWAP+, iceberg), decoded from the
//! raw push bucket and grouped by parent instruction.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::analysis::LogAnalysis;
use crate::models::PushCategory;
use crate::views::{annotate, value_str};

#[derive(Debug, Default)]
pub struct AlgorithmView {
    /// instruction id → push action → pushes in arrival order.
    pub instructions: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
    pub skipped: usize,
}

impl AlgorithmView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        let mut view = AlgorithmView::default();
        for event in analysis.push_events(PushCategory::Algorithm) {
            let Ok(decoded) = serde_json::from_str::<Value>(&event.payload) else {
                view.skipped += 1;
                continue;
            };
            let Some(params) = decoded.get("params") else {
                view.skipped += 1;
                continue;
            };
            let instruction = params.get("instructionid").map(value_str).unwrap_or_default();
            let action = params.get("action").map(value_str).unwrap_or_default();

            let row = annotate(params.clone(), &[("req_time", json!(event.time))]);
            view.instructions
                .entry(instruction)
                .or_default()
                .entry(action)
                .or_default()
                .push(row);
        }
        view
    }

    pub fn instruction_ids(&self) -> Vec<&str> {
        self.instructions.keys().map(String::as_str).collect()
    }
}

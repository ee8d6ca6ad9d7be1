//! Conditional (grading) order pushes: parent instructions, per-security
//! monitoring state, and child order fills.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::analysis::LogAnalysis;
use crate::models::PushCategory;
use crate::views::{annotate, value_str};

type RowsBySymbol = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Default)]
pub struct ConditionView {
    /// parent order no → instruction-level pushes.
    pub instructions: BTreeMap<String, Vec<Value>>,
    /// parent order no → security → monitoring-state pushes.
    pub conditions: BTreeMap<String, RowsBySymbol>,
    /// parent order no → security → child order pushes.
    pub orders: BTreeMap<String, RowsBySymbol>,
    pub skipped: usize,
}

impl ConditionView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        let mut view = ConditionView::default();
        for event in analysis.push_events(PushCategory::GradeInstruction) {
            let Some(params) = decode_params(&event.payload) else {
                view.skipped += 1;
                continue;
            };
            let order_no = params.get("order_no").map(value_str).unwrap_or_default();
            let row = annotate(params, &[("rsp_time", json!(event.time))]);
            view.instructions.entry(order_no).or_default().push(row);
        }
        for event in analysis.push_events(PushCategory::GradeCondition) {
            let Some(params) = decode_params(&event.payload) else {
                view.skipped += 1;
                continue;
            };
            let order_no = params.get("order_no").map(value_str).unwrap_or_default();
            let symbol = params.get("symbol").map(value_str).unwrap_or_default();
            let row = annotate(params, &[("rsp_time", json!(event.time))]);
            view.conditions
                .entry(order_no)
                .or_default()
                .entry(symbol)
                .or_default()
                .push(row);
        }
        for event in analysis.push_events(PushCategory::GradeOrder) {
            // child fills nest the interesting part one level down
            let Some(params) = decode_params(&event.payload) else {
                view.skipped += 1;
                continue;
            };
            let Some(data) = params.get("data") else {
                view.skipped += 1;
                continue;
            };
            let order_no = params.get("order_no").map(value_str).unwrap_or_default();
            let symbol = data.get("SecurityID").map(value_str).unwrap_or_default();
            let row = annotate(data.clone(), &[("rsp_time", json!(event.time))]);
            view.orders
                .entry(order_no)
                .or_default()
                .entry(symbol)
                .or_default()
                .push(row);
        }
        view
    }

    /// Last known monitoring state per security of one parent order.
    pub fn latest_conditions(&self, order_no: &str) -> Vec<&Value> {
        self.conditions
            .get(order_no)
            .map(|by_symbol| by_symbol.values().filter_map(|rows| rows.last()).collect())
            .unwrap_or_default()
    }
}

fn decode_params(payload: &str) -> Option<Value> {
    serde_json::from_str::<Value>(payload)
        .ok()?
        .get("params")
        .cloned()
}

//! Basket (multi-account) order pushes, decoded lazily from the raw
//! push bucket.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::analysis::LogAnalysis;
use crate::models::PushCategory;
use crate::views::{annotate, value_str};

#[derive(Debug, Default)]
pub struct BasketView {
    /// instance id → `fund_token|security` → pushes in arrival order.
    pub instances: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
    /// Pushes dropped for lacking a market or security id.
    pub skipped: usize,
}

impl BasketView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        let mut view = BasketView::default();
        for event in analysis.push_events(PushCategory::BasketOrder) {
            let Ok(decoded) = serde_json::from_str::<Value>(&event.payload) else {
                view.skipped += 1;
                continue;
            };
            let Some(data) = decoded.pointer("/params/data") else {
                view.skipped += 1;
                continue;
            };
            // heartbeat pushes reuse the marker but carry no market
            if data.get("MarketID").is_none() {
                view.skipped += 1;
                continue;
            }
            let Some(security) = data.get("SecurityID").map(value_str) else {
                view.skipped += 1;
                continue;
            };
            let instance = data.get("InstanceID").map(value_str).unwrap_or_default();
            let mut token = data.get("fund_token").map(value_str).unwrap_or_default();
            if let Some(client) = analysis.token_resolver().client_token(&token) {
                token = client.to_string();
            }
            let fund = analysis.resolve_token(&token);

            let row = annotate(
                data.clone(),
                &[("PushTime", json!(event.time)), ("fund", json!(fund))],
            );
            view.instances
                .entry(instance)
                .or_default()
                .entry(format!("{token}|{security}"))
                .or_default()
                .push(row);
        }
        view
    }
}

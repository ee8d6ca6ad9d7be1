//! Fund (cash balance) queries, one bucket per account flavor.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::analysis::LogAnalysis;
use crate::views::{annotate, records_for, request_token};

struct FundSource {
    protocol: &'static str,
    servicename: &'static str,
    action: &'static str,
    /// Pointer to the single balance row inside the response.
    row: &'static str,
    flavor: &'static str,
}

const SOURCES: [FundSource; 3] = [
    FundSource {
        protocol: "pb",
        servicename: "rpc.trader.stock",
        action: "query_account_asset",
        row: "/result/account_asset/0",
        flavor: "normal",
    },
    FundSource {
        protocol: "json_funid",
        servicename: "stockrzrq",
        action: "501001",
        row: "/result/Array/0",
        flavor: "rzrq",
    },
    FundSource {
        protocol: "json_funid",
        servicename: "stockths",
        action: "610013",
        row: "/result/Array/0",
        flavor: "ggt",
    },
];

/// Balance rows grouped by resolved fund, per flavor, plus every failed
/// query of any flavor.
#[derive(Debug, Default)]
pub struct FundView {
    pub normal: BTreeMap<String, Vec<Value>>,
    pub margin: BTreeMap<String, Vec<Value>>,
    pub hk_connect: BTreeMap<String, Vec<Value>>,
    pub failed: Vec<Value>,
}

impl FundView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        let mut view = FundView::default();
        for source in &SOURCES {
            for (id, record) in records_for(analysis, source.protocol, source.servicename, source.action)
            {
                let (Some(request), Some(response)) = (&record.request, &record.response) else {
                    continue;
                };
                let fund_token = request_token(request, "fund_token");
                let fund = analysis.resolve_token(&fund_token);
                let tags: [(&str, Value); 5] = [
                    ("fund_token", json!(fund_token)),
                    ("fund", json!(fund)),
                    ("rsp_time", json!(record.rsp_time)),
                    ("req_id", json!(id)),
                    ("type", json!(source.flavor)),
                ];

                if let Some(error) = response.get("error") {
                    view.failed.push(annotate(error.clone(), &tags));
                    continue;
                }
                let row = match response.pointer(source.row) {
                    Some(row) => annotate(row.clone(), &tags),
                    // a result without the balance row is still a failure
                    None => annotate(json!({"message": "fund query returned no rows"}), &tags),
                };
                if row.get("message").is_some() {
                    view.failed.push(row);
                    continue;
                }
                view.bucket_mut(source.flavor).entry(fund).or_default().push(row);
            }
        }
        view
    }

    fn bucket_mut(&mut self, flavor: &str) -> &mut BTreeMap<String, Vec<Value>> {
        match flavor {
            "rzrq" => &mut self.margin,
            "ggt" => &mut self.hk_connect,
            _ => &mut self.normal,
        }
    }

    /// Funds that returned at least one normal balance row.
    pub fn funds(&self) -> Vec<&str> {
        self.normal.keys().map(String::as_str).collect()
    }
}

//! IPO subscription views: per-market quota and lottery results.
//!
//! Both queries share a response shape, so one extractor serves the two
//! lists; only the command numbers differ.

use serde_json::{json, Map, Value};

use crate::analysis::LogAnalysis;
use crate::views::{records_for, request_token, value_str};

const QUOTA_SOURCES: [(&str, &str); 2] = [("stockths", "503002"), ("stockrzrq", "501022")];
const LOTTERY_SOURCES: [(&str, &str); 2] = [("stockths", "503003"), ("stockrzrq", "501023")];

#[derive(Debug, Default)]
pub struct IpoView {
    pub quota: Vec<Value>,
    pub lottery: Vec<Value>,
}

impl IpoView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        IpoView {
            quota: collect(analysis, &QUOTA_SOURCES),
            lottery: collect(analysis, &LOTTERY_SOURCES),
        }
    }

    /// Distinct funds seen in the quota list, for the account selector.
    pub fn quota_funds(&self) -> Vec<String> {
        let mut funds: Vec<String> = self
            .quota
            .iter()
            .filter_map(|row| row.get("fund").map(value_str))
            .collect();
        funds.sort();
        funds.dedup();
        funds
    }
}

/// One flattened row per query: context fields plus one cell per market,
/// or a `message` field when the broker returned nothing usable.
fn collect(analysis: &LogAnalysis, sources: &[(&str, &str)]) -> Vec<Value> {
    let mut rows = Vec::new();
    for (servicename, funid) in sources {
        for (id, record) in records_for(analysis, "json_funid", servicename, funid) {
            let (Some(request), Some(response)) = (&record.request, &record.response) else {
                continue;
            };
            let token = request_token(request, "UserToken");
            let mut row = Map::new();
            row.insert("rsp_time".into(), json!(record.rsp_time));
            row.insert("req_id".into(), json!(id));
            row.insert("funid".into(), json!(funid));
            row.insert("fund".into(), json!(analysis.resolve_token(&token)));

            match response.get("result") {
                None => {
                    let message = response
                        .pointer("/error/message")
                        .map(value_str)
                        .unwrap_or_else(|| "no response".to_string());
                    row.insert("message".into(), json!(message));
                }
                Some(result) => match result.get("Array").and_then(Value::as_array) {
                    None => {
                        row.insert("message".into(), json!("result carries no Array"));
                    }
                    Some(items) => {
                        for item in items {
                            let market = item.get("MarketName").map(value_str).unwrap_or_default();
                            let market_id = item.get("Market").map(value_str).unwrap_or_default();
                            let balance = item
                                .get("AvailableStockBalance")
                                .cloned()
                                .unwrap_or(Value::String(String::new()));
                            row.insert(format!("quota[{market_id}|{market}]"), balance);
                        }
                    }
                },
            }
            rows.push(Value::Object(row));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testutil::{analyze, funid_pair};

    #[test]
    fn quota_rows_spread_markets_into_cells() {
        let lines = funid_pair(
            "q1",
            "stockths",
            "503002",
            r#""UserToken":"T1""#,
            r#"{"result":{"Array":[{"Market":1,"MarketName":"SH","AvailableStockBalance":"10000"},{"Market":2,"MarketName":"SZ","AvailableStockBalance":"8000"}]}}"#,
        );
        let view = IpoView::build(&analyze(&lines));

        assert_eq!(view.quota.len(), 1);
        let row = &view.quota[0];
        assert_eq!(row["fund"], "T1");
        assert_eq!(row["funid"], "503002");
        assert_eq!(row["quota[1|SH]"], "10000");
        assert_eq!(row["quota[2|SZ]"], "8000");
        assert!(row.get("message").is_none());
        assert_eq!(view.quota_funds(), vec!["T1".to_string()]);
    }

    #[test]
    fn missing_result_and_missing_array_both_yield_messages() {
        let mut lines = Vec::new();
        lines.extend(funid_pair(
            "q1",
            "stockrzrq",
            "501023",
            r#""UserToken":"T1""#,
            r#"{"error":{"code":-1,"message":"not entitled"}}"#,
        ));
        lines.extend(funid_pair(
            "q2",
            "stockths",
            "503003",
            r#""UserToken":"T1""#,
            r#"{"result":{"Status":0}}"#,
        ));
        let view = IpoView::build(&analyze(&lines));

        assert_eq!(view.lottery.len(), 2);
        // source iteration order puts the stockths row first
        assert_eq!(view.lottery[0]["message"], "result carries no Array");
        assert_eq!(view.lottery[1]["message"], "not entitled");
    }
}

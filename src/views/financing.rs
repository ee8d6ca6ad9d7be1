//! Margin-financing view: securities eligible for financed buying.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::analysis::LogAnalysis;
use crate::views::{annotate, records_for, request_token};

#[derive(Debug, Default)]
pub struct FinancingView {
    /// fund → `rsp_time|row-count` → eligible-security rows.
    pub finable: BTreeMap<String, BTreeMap<String, Value>>,
    /// Response time → request id, for drilling back to the raw pair.
    pub query_times: BTreeMap<String, String>,
    pub failed: Vec<Value>,
}

impl FinancingView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        let mut view = FinancingView::default();
        for (id, record) in records_for(analysis, "json_funid", "stockrzrq", "501005") {
            let (Some(request), Some(response)) = (&record.request, &record.response) else {
                continue;
            };
            let fund_token = request_token(request, "fund_token");
            let fund = analysis.resolve_token(&fund_token);
            let tags: [(&str, Value); 4] = [
                ("fund_token", json!(fund_token)),
                ("fund", json!(fund)),
                ("rsp_time", json!(record.rsp_time)),
                ("req_id", json!(id)),
            ];

            if let Some(error) = response.get("error") {
                view.failed.push(annotate(error.clone(), &tags));
                continue;
            }
            match response.pointer("/result/Array").and_then(Value::as_array) {
                Some(rows) => {
                    let key = format!("{}|{}", record.rsp_time, rows.len());
                    view.query_times.insert(record.rsp_time.clone(), id);
                    view.finable
                        .entry(fund)
                        .or_default()
                        .insert(key, Value::Array(rows.clone()));
                }
                None => {
                    view.failed.push(annotate(
                        json!({"message": "result carries no Array"}),
                        &tags,
                    ));
                }
            }
        }
        view
    }

    pub fn funds(&self) -> Vec<&str> {
        self.finable.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testutil::{analyze, funid_pair};

    #[test]
    fn eligible_securities_key_on_time_and_count() {
        let lines = funid_pair(
            "m1",
            "stockrzrq",
            "501005",
            r#""fund_token":"T1""#,
            r#"{"result":{"Array":[{"symbol":"600000"},{"symbol":"600001"}]}}"#,
        );
        let view = FinancingView::build(&analyze(&lines));

        let by_query = view.finable.get("T1").unwrap();
        let rows = by_query.get("20240101 09:30:01.100|2").unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(
            view.query_times.get("20240101 09:30:01.100"),
            Some(&"m1".to_string())
        );
        assert_eq!(view.funds(), vec!["T1"]);
    }

    #[test]
    fn error_and_arrayless_results_are_failures() {
        let mut lines = Vec::new();
        lines.extend(funid_pair(
            "m1",
            "stockrzrq",
            "501005",
            r#""fund_token":"T1""#,
            r#"{"error":{"code":9,"message":"no margin account"}}"#,
        ));
        lines.extend(funid_pair(
            "m2",
            "stockrzrq",
            "501005",
            r#""fund_token":"T1""#,
            r#"{"result":{"Status":0}}"#,
        ));
        let view = FinancingView::build(&analyze(&lines));

        assert!(view.finable.is_empty());
        assert_eq!(view.failed.len(), 2);
        assert_eq!(view.failed[0]["message"], "no margin account");
        assert_eq!(view.failed[1]["message"], "result carries no Array");
    }
}

//! Read-only domain projections over a [`LogAnalysis`].
//!
//! Each view rebuilds itself from the facade on demand and never mutates
//! parse state. Item-level decode failures are skipped silently: push
//! buckets and query responses are best-effort data, and one malformed
//! item must not hide the rest of the session.

pub mod accounts;
pub mod algorithms;
pub mod baskets;
pub mod conditions;
pub mod financing;
pub mod funds;
pub mod ipo;
pub mod orders;
pub mod positions;
pub mod trades;

use serde_json::Value;

use crate::analysis::LogAnalysis;
use crate::models::CorrelationRecord;

/// Complete records of one (protocol, service, action) group, in first
/// sighting order.
pub(crate) fn records_for<'a>(
    analysis: &'a LogAnalysis,
    protocol: &str,
    servicename: &str,
    action: &str,
) -> Vec<(String, &'a CorrelationRecord)> {
    analysis
        .ids_for(protocol, servicename, action)
        .into_iter()
        .filter_map(|id| analysis.record(&id).map(|record| (id, record)))
        .collect()
}

/// Fund token of a query request; `stockths` commands carry it in
/// `UserToken`, everything else in `fund_token`.
pub(crate) fn request_token(request: &Value, field: &str) -> String {
    request
        .pointer(&format!("/params/{field}"))
        .map(value_str)
        .unwrap_or_default()
}

pub(crate) fn value_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge extra display fields into a row object. Non-object rows are
/// returned untouched.
pub(crate) fn annotate(mut row: Value, fields: &[(&str, Value)]) -> Value {
    if let Value::Object(map) = &mut row {
        for (key, value) in fields {
            map.insert((*key).to_string(), value.clone());
        }
    }
    row
}

/// One (protocol, service, action) group feeding a table query view.
pub(crate) struct QuerySource {
    pub protocol: &'static str,
    pub servicename: &'static str,
    pub action: &'static str,
    /// Request field carrying the fund token.
    pub token_field: &'static str,
    /// Pointer to the row array inside the response.
    pub rows: &'static str,
    pub flavor: &'static str,
}

/// fund → `rsp_time|req_id` → row array.
pub(crate) type GroupedRows = std::collections::BTreeMap<String, std::collections::BTreeMap<String, Value>>;

/// Query results split by account flavor, the shape shared by the
/// position, order, and trade views.
#[derive(Debug, Default)]
pub struct QueryBuckets {
    pub normal: GroupedRows,
    pub margin: GroupedRows,
    pub hk_connect: GroupedRows,
    pub failed: Vec<Value>,
}

impl QueryBuckets {
    fn bucket_mut(&mut self, flavor: &str) -> &mut GroupedRows {
        match flavor {
            "rzrq" => &mut self.margin,
            "ggt" => &mut self.hk_connect,
            _ => &mut self.normal,
        }
    }
}

/// Walk every source and bucket its responses. Successful queries keep
/// whatever sits at the row pointer (null when the broker returned no
/// array at all); failures are annotated error objects.
pub(crate) fn collect_query_buckets(
    analysis: &LogAnalysis,
    sources: &[QuerySource],
) -> QueryBuckets {
    use serde_json::json;

    let mut buckets = QueryBuckets::default();
    for source in sources {
        for (id, record) in records_for(analysis, source.protocol, source.servicename, source.action)
        {
            let (Some(request), Some(response)) = (&record.request, &record.response) else {
                continue;
            };
            let fund_token = request_token(request, source.token_field);
            let fund = analysis.resolve_token(&fund_token);
            let key = format!("{}|{}", record.rsp_time, id);

            if let Some(error) = response.get("error") {
                let row = annotate(
                    error.clone(),
                    &[
                        ("fund_token", json!(fund_token)),
                        ("fund", json!(fund)),
                        ("rsp_time", json!(record.rsp_time)),
                        ("req_id", json!(id)),
                        ("type", json!(source.flavor)),
                    ],
                );
                buckets.failed.push(row);
                continue;
            }
            let rows = response.pointer(source.rows).cloned().unwrap_or(Value::Null);
            buckets
                .bucket_mut(source.flavor)
                .entry(fund)
                .or_default()
                .insert(key, rows);
        }
    }
    buckets
}

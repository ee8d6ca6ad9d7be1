//! Trade (execution) queries.

use std::ops::Deref;

use crate::analysis::LogAnalysis;
use crate::views::{collect_query_buckets, QueryBuckets, QuerySource};

const SOURCES: [QuerySource; 3] = [
    QuerySource {
        protocol: "pb",
        servicename: "rpc.trader.stock",
        action: "query_trade",
        token_field: "fund_token",
        rows: "/result/trades",
        flavor: "normal",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockrzrq",
        action: "500014",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "rzrq",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockths",
        action: "610007",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "ggt",
    },
];

#[derive(Debug, Default)]
pub struct TradeView(QueryBuckets);

impl TradeView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        TradeView(collect_query_buckets(analysis, &SOURCES))
    }
}

impl Deref for TradeView {
    type Target = QueryBuckets;

    fn deref(&self) -> &QueryBuckets {
        &self.0
    }
}

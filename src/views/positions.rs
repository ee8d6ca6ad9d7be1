//! Stock position queries.

use std::ops::Deref;

use crate::analysis::LogAnalysis;
use crate::views::{collect_query_buckets, QueryBuckets, QuerySource};

const SOURCES: [QuerySource; 3] = [
    QuerySource {
        protocol: "pb",
        servicename: "rpc.trader.stock",
        action: "query_account_stock",
        token_field: "fund_token",
        rows: "/result/account_stock",
        flavor: "normal",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockrzrq",
        action: "501002",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "rzrq",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockths",
        action: "610004",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "ggt",
    },
];

#[derive(Debug, Default)]
pub struct PositionView(QueryBuckets);

impl PositionView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        PositionView(collect_query_buckets(analysis, &SOURCES))
    }
}

impl Deref for PositionView {
    type Target = QueryBuckets;

    fn deref(&self) -> &QueryBuckets {
        &self.0
    }
}

//! Order queries. Two wire spellings feed the normal bucket: the typed
//! RPC form and the numeric-command form used by older terminals, which
//! carries its token in `UserToken`.

use std::ops::Deref;

use crate::analysis::LogAnalysis;
use crate::views::{collect_query_buckets, QueryBuckets, QuerySource};

const SOURCES: [QuerySource; 4] = [
    QuerySource {
        protocol: "pb",
        servicename: "rpc.trader.stock",
        action: "query_order",
        token_field: "fund_token",
        rows: "/result/orders",
        flavor: "normal",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockths",
        action: "500013",
        token_field: "UserToken",
        rows: "/result/Array",
        flavor: "normal",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockrzrq",
        action: "500013",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "rzrq",
    },
    QuerySource {
        protocol: "json_funid",
        servicename: "stockths",
        action: "610005",
        token_field: "fund_token",
        rows: "/result/Array",
        flavor: "ggt",
    },
];

#[derive(Debug, Default)]
pub struct OrderView(QueryBuckets);

impl OrderView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        OrderView(collect_query_buckets(analysis, &SOURCES))
    }
}

impl Deref for OrderView {
    type Target = QueryBuckets;

    fn deref(&self) -> &QueryBuckets {
        &self.0
    }
}

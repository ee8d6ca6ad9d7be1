//! Broker account listings, one snapshot per portfolio query.

use std::collections::BTreeMap;

use crate::analysis::LogAnalysis;
use crate::models::AccountInfo;

#[derive(Debug, Default)]
pub struct AccountView {
    by_time: BTreeMap<String, Vec<AccountInfo>>,
}

impl AccountView {
    pub fn build(analysis: &LogAnalysis) -> Self {
        AccountView {
            by_time: analysis.token_resolver().accounts_by_time().clone(),
        }
    }

    /// Query timestamps in ascending order.
    pub fn query_times(&self) -> Vec<&str> {
        self.by_time.keys().map(String::as_str).collect()
    }

    pub fn rows_at(&self, time: &str) -> &[AccountInfo] {
        self.by_time.get(time).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Latest snapshot, the one most screens default to.
    pub fn latest(&self) -> Option<(&str, &[AccountInfo])> {
        self.by_time
            .iter()
            .next_back()
            .map(|(time, rows)| (time.as_str(), rows.as_slice()))
    }
}

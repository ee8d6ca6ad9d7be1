//! Fund-token resolution.
//!
//! The terminal addresses funding accounts by token, but two different
//! tokens can name the same account: an ephemeral client-side token minted
//! before login completes, and the stable broker-assigned one. Two paths
//! populate the mappings, both run once after correlation is complete:
//! reconciliation pairs (`upload_fund_info`) link client token to stable
//! token, and portfolio listings link tokens to human-readable account
//! descriptors. Resolution is best-effort: an unknown token degrades to its
//! raw form, which the UI displays as a fallback.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::models::AccountInfo;
use crate::parser::ParsedLog;

lazy_static! {
    /// Client token embedded in the reconciliation request's query string.
    static ref FUND_TOKEN_RE: Regex =
        Regex::new(r#",fund_token:"([^"]+)""#).expect("fund token pattern");
}

const UPLOAD_MARKER: &str = "upload_fund_info";
const PORTFOLIO_MARKER: &str = "list_account_portfolio";
const PERMISSION_MARKER: &str = "with_permission";

const PORTFOLIO_EDGES: &str = "/result/data/account_fn/list_account_portfolio/edges";
const UPLOAD_FUND_INFO: &str = "/result/data/account_fn/upload_fund_info/fund_info/0";

#[derive(Debug, Default)]
pub struct TokenResolver {
    /// token → `code:broker:type` descriptor.
    token_names: HashMap<String, String>,
    /// `code:type` → descriptor, for when the exact token is unknown.
    account_names: HashMap<String, String>,
    /// stable (broker-assigned) token → client-minted token.
    stable_to_client: HashMap<String, String>,
    /// stable token → `fund_name:<name>,permission_code:<code>` display.
    permission_display: HashMap<String, String>,
    /// Query time → account rows, for the accounts view.
    accounts_by_time: BTreeMap<String, Vec<AccountInfo>>,
}

fn value_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_str(value: &Value, key: &str) -> String {
    value.get(key).map(value_str).unwrap_or_default()
}

impl TokenResolver {
    /// Build the resolver from a parse snapshot. Reconciliation runs first
    /// so the stable→client remap is in place when account rows are built.
    pub fn build(log: &ParsedLog) -> Self {
        let mut resolver = TokenResolver::default();
        resolver.reconcile_uploaded_tokens(log);
        for (time, payload) in &log.special.query_accounts {
            resolver.ingest_account_payload(time, payload);
        }
        resolver.ingest_portfolio_records(log);
        debug!(
            tokens = resolver.token_names.len(),
            reconciled = resolver.stable_to_client.len(),
            "token resolver built"
        );
        resolver
    }

    /// Resolve a token to its account descriptor. Falls back to one hop
    /// through the stable↔client map, then to the raw token. Never fails.
    pub fn resolve(&self, token: &str) -> String {
        if let Some(name) = self.token_names.get(token) {
            return name.clone();
        }
        if let Some(client) = self.stable_to_client.get(token) {
            if let Some(name) = self.token_names.get(client) {
                return name.clone();
            }
        }
        for (stable, client) in &self.stable_to_client {
            if client == token {
                if let Some(name) = self.token_names.get(stable) {
                    return name.clone();
                }
            }
        }
        token.to_string()
    }

    /// Map a broker-assigned token to its client-minted twin, when known.
    pub fn client_token(&self, stable: &str) -> Option<&str> {
        self.stable_to_client.get(stable).map(String::as_str)
    }

    pub fn permission_display(&self, stable: &str) -> Option<&str> {
        self.permission_display.get(stable).map(String::as_str)
    }

    /// Descriptor lookup by `code:type` key.
    pub fn resolve_account_key(&self, key: &str) -> Option<&str> {
        self.account_names.get(key).map(String::as_str)
    }

    pub fn accounts_by_time(&self) -> &BTreeMap<String, Vec<AccountInfo>> {
        &self.accounts_by_time
    }

    pub fn known_tokens(&self) -> usize {
        self.token_names.len()
    }

    // Path B: client token from the request query string, stable token and
    // permission from the response.
    fn reconcile_uploaded_tokens(&mut self, log: &ParsedLog) {
        for (_, record) in log.records.iter() {
            let (Some(request), Some(response)) = (&record.request, &record.response) else {
                continue;
            };
            if !request.to_string().contains(UPLOAD_MARKER) {
                continue;
            }
            if response.get("error").is_some() {
                continue;
            }
            let Some(query) = request.pointer("/params/query").and_then(Value::as_str) else {
                continue;
            };
            let client_token = FUND_TOKEN_RE
                .captures(query)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let Some(info) = response.pointer(UPLOAD_FUND_INFO) else { continue };
            let stable_token = field_str(info, "fund_token");
            if stable_token.is_empty() {
                continue;
            }
            let display = format!(
                "fund_name:{},permission_code:{}",
                field_str(info, "account_name"),
                field_str(info, "permission_code"),
            );
            self.stable_to_client.insert(stable_token.clone(), client_token);
            self.permission_display.insert(stable_token, display);
        }
    }

    // Path A, broadcast flavor: pre-digested account-query payloads.
    fn ingest_account_payload(&mut self, time: &str, payload: &str) {
        let Ok(decoded) = serde_json::from_str::<Value>(payload) else { return };
        let Some(edges) = decoded.pointer(PORTFOLIO_EDGES).and_then(Value::as_array) else {
            return;
        };
        self.ingest_edges(time, edges);
    }

    // Path A, correlated flavor: portfolio listings carrying permissions.
    // Listings without `with_permission` come from post-trade analytics and
    // are skipped.
    fn ingest_portfolio_records(&mut self, log: &ParsedLog) {
        for (_, record) in log.records.iter() {
            let (Some(request), Some(response)) = (&record.request, &record.response) else {
                continue;
            };
            let serialized = request.to_string();
            if !serialized.contains(PORTFOLIO_MARKER) || !serialized.contains(PERMISSION_MARKER) {
                continue;
            }
            let Some(edges) = response.pointer(PORTFOLIO_EDGES).and_then(Value::as_array) else {
                continue;
            };
            self.ingest_edges(&record.rsp_time, edges);
        }
    }

    fn ingest_edges(&mut self, time: &str, edges: &[Value]) {
        let mut rows = Vec::with_capacity(edges.len());
        for item in edges {
            let mut fund_token = item
                .pointer("/portfolios/0/fund_token")
                .map(value_str)
                .unwrap_or_default();
            if let Some(client) = self.stable_to_client.get(&fund_token) {
                fund_token = client.clone();
            }
            let info = AccountInfo {
                user_id: field_str(item, "user_id"),
                fund_token,
                account_code: field_str(item, "account_code"),
                account_name: field_str(item, "account_name"),
                alias: field_str(item, "alias"),
                broker_id: field_str(item, "qsid"),
                broker_name: field_str(item, "broker_name"),
                trade_type: field_str(item, "trade_type"),
            };
            self.token_names.insert(info.fund_token.clone(), info.descriptor());
            self.account_names.insert(info.account_key(), info.descriptor());
            rows.push(info);
        }
        self.accounts_by_time.insert(time.to_string(), rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LogParser;
    use serde_json::json;

    fn upload_pair(id: &str, client: &str, stable: &str) -> [String; 2] {
        let request = json!({
            "servicename": "account",
            "params": {
                "query": format!("mutation {{ upload_fund_info ,fund_token:\"{client}\" }}"),
            }
        });
        let response = json!({
            "result": {"data": {"account_fn": {"upload_fund_info": {"fund_info": [{
                "fund_token": stable,
                "permission_code": "7",
                "account_name": "acct-a",
            }]}}}}
        });
        [
            format!("x|20240101 09:00:00.000|request|INFO|{id}|&send={request}"),
            format!("x|20240101 09:00:00.100|response|INFO|{id}|&recv={response}"),
        ]
    }

    fn portfolio_pair(id: &str, token: &str) -> [String; 2] {
        let request = json!({
            "servicename": "account",
            "params": {"query": "query { list_account_portfolio with_permission }"},
        });
        let response = json!({
            "result": {"data": {"account_fn": {"list_account_portfolio": {"edges": [{
                "user_id": "u1",
                "account_code": "001",
                "account_name": "main",
                "alias": "",
                "qsid": "9",
                "broker_name": "BrokerX",
                "trade_type": "normal",
                "portfolios": [{"fund_token": token}],
            }]}}}}
        });
        [
            format!("x|20240101 09:01:00.000|request|INFO|{id}|&send={request}"),
            format!("x|20240101 09:01:00.100|response|INFO|{id}|&recv={response}"),
        ]
    }

    #[test]
    fn two_hop_resolution_through_reconciliation() {
        let mut lines = Vec::new();
        lines.extend(upload_pair("u1", "CT1", "ST1"));
        lines.extend(portfolio_pair("p1", "ST1"));
        let log = LogParser::new().parse(&[lines.join("\n")]).unwrap();
        let resolver = TokenResolver::build(&log);

        // the portfolio row was remapped to the client token, and both
        // tokens resolve to the same descriptor
        assert_eq!(resolver.resolve("CT1"), "001:BrokerX:normal");
        assert_eq!(resolver.resolve("ST1"), "001:BrokerX:normal");
        assert_eq!(resolver.client_token("ST1"), Some("CT1"));
        assert_eq!(
            resolver.permission_display("ST1"),
            Some("fund_name:acct-a,permission_code:7")
        );
        assert_eq!(resolver.resolve_account_key("001:normal"), Some("001:BrokerX:normal"));
    }

    #[test]
    fn unknown_token_degrades_to_itself() {
        let log = LogParser::new().parse(&["".to_string()]).unwrap();
        let resolver = TokenResolver::build(&log);
        assert_eq!(resolver.resolve("mystery"), "mystery");
    }

    #[test]
    fn failed_upload_is_ignored() {
        let mut lines = Vec::new();
        let request = json!({
            "servicename": "account",
            "params": {"query": "upload_fund_info ,fund_token:\"CT9\""},
        });
        let response = json!({"error": {"code": -1, "message": "denied"}});
        lines.push(format!("x|20240101 09:00:00.000|request|INFO|e1|&send={request}"));
        lines.push(format!("x|20240101 09:00:00.100|response|INFO|e1|&recv={response}"));
        let log = LogParser::new().parse(&[lines.join("\n")]).unwrap();
        let resolver = TokenResolver::build(&log);
        assert_eq!(resolver.client_token("CT9"), None);
        assert_eq!(resolver.known_tokens(), 0);
    }
}

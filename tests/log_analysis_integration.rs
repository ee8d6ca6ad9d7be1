//! End-to-end run over a realistic session fixture: files on disk, lossy
//! decode, parse, statistics, token resolution, and the domain views.

use std::fs;
use std::io::Write;
use std::process::Command;

use serde_json::json;
use tempfile::TempDir;

use termlog::views::funds::FundView;
use termlog::views::orders::OrderView;
use termlog::{LogAnalysis, PushCategory};

fn session_fixture() -> String {
    let mut lines: Vec<String> = Vec::new();

    // login chatter carrying the user account
    lines.push(format!(
        "x|20240102 09:00:00.000|request|INFO|login1|&send={}",
        json!({"servicename": "rpc.authenticate", "method": "login",
               "params": {"useraccount": "trader7"}})
    ));
    lines.push(format!(
        "x|20240102 09:00:00.050|response|INFO|login1|&recv={}",
        json!({"result": {"ok": true}})
    ));

    // token reconciliation: client token CT1 becomes stable token ST1
    lines.push(format!(
        "x|20240102 09:00:01.000|request|INFO|up1|&send={}",
        json!({"servicename": "account",
               "params": {"query": "mutation { upload_fund_info ,fund_token:\"CT1\" }"}})
    ));
    lines.push(format!(
        "x|20240102 09:00:01.100|response|INFO|up1|&recv={}",
        json!({"result": {"data": {"account_fn": {"upload_fund_info": {"fund_info": [
            {"fund_token": "ST1", "permission_code": "7", "account_name": "acct-a"}
        ]}}}}})
    ));

    // portfolio listing names the account behind ST1
    lines.push(format!(
        "x|20240102 09:00:02.000|request|INFO|pf1|&send={}",
        json!({"servicename": "account",
               "params": {"query": "query { list_account_portfolio with_permission }"}})
    ));
    lines.push(format!(
        "x|20240102 09:00:02.100|response|INFO|pf1|&recv={}",
        json!({"result": {"data": {"account_fn": {"list_account_portfolio": {"edges": [{
            "user_id": "u1", "account_code": "001", "account_name": "main",
            "alias": "", "qsid": "9", "broker_name": "BrokerX",
            "trade_type": "normal", "portfolios": [{"fund_token": "ST1"}],
        }]}}}}})
    ));

    // order query addressed by the client token
    lines.push(format!(
        "x|20240102 09:30:00.000|request|INFO|ord1|&send={}",
        json!({"servicename": "rpc.trader.stock", "method": "query_order",
               "params": {"fund_token": "CT1"}})
    ));
    lines.push(format!(
        "x|20240102 09:30:00.200|response|INFO|ord1|&recv={}",
        json!({"result": {"orders": [{"order_no": "42", "symbol": "600000"}]}})
    ));

    // margin balance query that fails
    lines.push(format!(
        "x|20240102 09:31:00.000|request|INFO|fund1|&send={}",
        json!({"method": "stockrzrq", "params": {"FunID": 501001, "fund_token": "CT1"}})
    ));
    lines.push(format!(
        "x|20240102 09:31:00.150|response|INFO|fund1|&recv={}",
        json!({"error": {"code": -5, "message": "margin account closed"}})
    ));

    // a basket push, a timeout, a retransmit, and plain noise
    lines.push(format!(
        "x|20240102 09:32:00.000|response|INFO||basket_order_push&recv={}",
        json!({"params": {"data": {"InstanceID": "b1", "MarketID": 1,
                                    "SecurityID": "600000", "fund_token": "ST1"}}})
    ));
    lines.push("x|20240102 09:33:00.000|request|timeout|late1|".to_string());
    lines.push("x|20240102 09:34:00.000|request|INFO|re1|new_transmit_&send={}".to_string());
    lines.push("heartbeat without separators".to_string());

    lines.join("\n")
}

#[test]
fn full_session_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("terminal.log");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(session_fixture().as_bytes()).unwrap();
    // stray broken byte, as real logs have
    file.write_all(b"\ntail \xff line without pipes").unwrap();

    let bytes = fs::read(&path).unwrap();
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let analysis = LogAnalysis::from_files(&[content]).unwrap();

    let diag = analysis.diagnostics();
    assert_eq!(diag.total_records, 5);
    assert_eq!(diag.timeout_lines, 1);
    assert_eq!(diag.retransmit_lines, 1);
    assert_eq!(diag.skipped_lines, 2);
    assert_eq!(diag.username, vec!["trader7".to_string()]);
    assert_eq!(diag.log_begin_time, "20240102 09:00:00.000");
    assert_eq!(diag.log_end_time, "20240102 09:32:00.000");

    // statistics index groups the order query under its pb triple
    assert_eq!(
        analysis.ids_for("pb", "rpc.trader.stock", "query_order"),
        vec!["ord1".to_string()]
    );

    // both token spellings resolve to the portfolio descriptor
    assert_eq!(analysis.resolve_token("CT1"), "001:BrokerX:normal");
    assert_eq!(analysis.resolve_token("ST1"), "001:BrokerX:normal");

    // order view lands under the resolved fund name
    let orders = OrderView::build(&analysis);
    let by_time = orders.normal.get("001:BrokerX:normal").unwrap();
    let rows = by_time.get("20240102 09:30:00.200|ord1").unwrap();
    assert_eq!(rows[0]["order_no"], "42");

    // the failed margin query is a failure row, not a balance
    let funds = FundView::build(&analysis);
    assert!(funds.margin.is_empty());
    assert_eq!(funds.failed.len(), 1);
    assert_eq!(funds.failed[0]["message"], "margin account closed");
    assert_eq!(funds.failed[0]["type"], "rzrq");

    // the basket push is in its bucket and on the timeline
    assert_eq!(analysis.push_events(PushCategory::BasketOrder).len(), 1);
    let filtered = analysis.timeline("InstanceID", "20240102 09:32:00.000", "20240102 09:32:00.000");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].time(), "20240102 09:32:00.000");
}

#[test]
fn cli_round_trip_over_a_fixture_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("terminal.log");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(session_fixture().as_bytes()).unwrap();
    // invalid byte exercises the lenient decode path
    file.write_all(b"\ntail \xff line without pipes").unwrap();
    drop(file);

    let output = Command::new(env!("CARGO_BIN_EXE_termlog"))
        .arg(&path)
        .args(["--stats", "--timeline", "--filter", "query_order~InstanceID"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    // diagnostics JSON
    assert!(stdout.contains("\"total_records\": 5"));
    assert!(stdout.contains("\"username\""));
    // statistics table row
    assert!(stdout.contains("rpc.trader.stock"));
    assert!(stdout.contains("query_order"));
    // filtered timeline includes the basket push
    assert!(stdout.contains("basket_order_push"));
}

#[test]
fn cli_fails_with_nonzero_exit_on_missing_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_termlog"))
        .arg("/nonexistent/terminal.log")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn repeated_parse_of_the_same_file_is_identical() {
    let content = session_fixture();
    let a = LogAnalysis::from_files(&[content.clone()]).unwrap();
    let b = LogAnalysis::from_files(&[content]).unwrap();

    let rows_a: Vec<String> = a.statistics().iter().map(|r| format!("{r:?}")).collect();
    let rows_b: Vec<String> = b.statistics().iter().map(|r| format!("{r:?}")).collect();
    assert_eq!(rows_a, rows_b);

    let times_a: Vec<String> = a.timeline("", "", "").iter().map(|e| e.time().to_string()).collect();
    let times_b: Vec<String> = b.timeline("", "", "").iter().map(|e| e.time().to_string()).collect();
    assert_eq!(times_a, times_b);
}

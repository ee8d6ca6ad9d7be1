//! Line and protocol classification.
//!
//! Both classifiers work on raw line text with substring markers rather than
//! decoded payloads. This is a deliberate speed/precision tradeoff carried
//! over from the terminal's wire format: a marker appearing inside a quoted
//! value elsewhere in the payload can false-positive. Known limitation, kept
//! for compatibility; callers go through these two functions only so the
//! shortcut can later be swapped for structural inspection.

use serde_json::Value;

use crate::models::Protocol;

/// Retransmit marker; such lines are bucketed whole and never field-split.
pub const RETRANSMIT_MARKER: &str = "new_transmit_";

/// Network-level timeout marker.
pub const TIMEOUT_MARKER: &str = "|timeout|";

/// pb services that carry their action in `method` instead of
/// `params.action`.
pub const METHOD_ACTION_SERVICES: [&str; 12] = [
    "asset-product-api",
    "asset-institution-api",
    "asset-index-api",
    "rpc.authenticate",
    "rpc.quota",
    "rpc.order.manager",
    "rpc.marketdata",
    "rpc.trader.stock",
    "rpc.risk",
    "rpc.condition",
    "rpc.grid",
    "rpc.subcenter",
];

/// Fixed-position fields of a parseable log line:
/// `<ignored>|<timestamp>|<kind>|<level>|<correlation-id>|...`
#[derive(Debug, Clone)]
pub struct LineFields {
    pub time: String,
    pub kind: String,
    pub id: String,
}

/// Split a line on `|` and pull the fixed-position fields. `None` when the
/// line has too few fields to carry them.
pub fn split_fields(line: &str) -> Option<LineFields> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 5 {
        return None;
    }
    Some(LineFields {
        time: parts[1].to_string(),
        kind: parts[2].to_string(),
        id: parts[4].to_string(),
    })
}

/// Tag a request line with its protocol variant by marker presence,
/// checked in this order.
pub fn classify_protocol(line: &str) -> Option<Protocol> {
    if line.contains("servicename") {
        Some(Protocol::Pb)
    } else if line.contains("FunID") {
        Some(Protocol::JsonFunid)
    } else if line.contains("action") {
        Some(Protocol::Json)
    } else {
        None
    }
}

fn str_or_serialized(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_str(value: &Value, key: &str) -> String {
    value.get(key).map(str_or_serialized).unwrap_or_default()
}

/// Resolve (servicename, action) from a decoded request, using the
/// extraction rule of its protocol variant. Structural misses degrade to
/// empty strings; they never abort the surrounding loop.
pub fn service_and_action(request: &Value, protocol: Protocol) -> (String, String) {
    match protocol {
        Protocol::Pb => {
            if !request.to_string().contains("servicename") {
                return (String::new(), String::new());
            }
            let servicename = field_str(request, "servicename");
            let action = if METHOD_ACTION_SERVICES.contains(&servicename.as_str()) {
                field_str(request, "method")
            } else {
                request
                    .pointer("/params/action")
                    .map(str_or_serialized)
                    .unwrap_or_default()
            };
            (servicename, action)
        }
        Protocol::Json => {
            let servicename = if request.to_string().contains("servicename") {
                field_str(request, "servicename")
            } else {
                field_str(request, "method")
            };
            let action = request
                .pointer("/params/action")
                .map(str_or_serialized)
                .unwrap_or_default();
            (servicename, action)
        }
        Protocol::JsonFunid => {
            let servicename = field_str(request, "method");
            let action = request
                .pointer("/params/FunID")
                .map(str_or_serialized)
                .unwrap_or_default();
            (servicename, action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_split_needs_five_columns() {
        assert!(split_fields("x|20240101 09:30:00.000|request|INFO|id1|rest").is_some());
        assert!(split_fields("a|b|c").is_none());
    }

    #[test]
    fn field_positions_are_fixed() {
        let fields = split_fields("pre|20240101 09:30:00.000|response|WARN|abc|tail").unwrap();
        assert_eq!(fields.time, "20240101 09:30:00.000");
        assert_eq!(fields.kind, "response");
        assert_eq!(fields.id, "abc");
    }

    #[test]
    fn protocol_marker_priority() {
        // servicename wins even when action also appears
        let line = r#"x|t|request|I|1|&send={"servicename":"s","params":{"action":"a"}}"#;
        assert_eq!(classify_protocol(line), Some(Protocol::Pb));
        let line = r#"x|t|request|I|1|&send={"method":"m","params":{"FunID":503002}}"#;
        assert_eq!(classify_protocol(line), Some(Protocol::JsonFunid));
        let line = r#"x|t|request|I|1|&send={"params":{"action":"a"}}"#;
        assert_eq!(classify_protocol(line), Some(Protocol::Json));
        assert_eq!(classify_protocol("x|t|request|I|1|&send={}"), None);
    }

    #[test]
    fn pb_infrastructure_services_use_method_action() {
        let request = json!({
            "servicename": "rpc.trader.stock",
            "method": "query_order",
            "params": {"action": "ignored"}
        });
        let (service, action) = service_and_action(&request, Protocol::Pb);
        assert_eq!(service, "rpc.trader.stock");
        assert_eq!(action, "query_order");

        let request = json!({
            "servicename": "custom-service",
            "method": "m",
            "params": {"action": "do_thing"}
        });
        let (service, action) = service_and_action(&request, Protocol::Pb);
        assert_eq!(service, "custom-service");
        assert_eq!(action, "do_thing");
    }

    #[test]
    fn funid_action_is_stringified() {
        let request = json!({"method": "stockths", "params": {"FunID": 503002}});
        let (service, action) = service_and_action(&request, Protocol::JsonFunid);
        assert_eq!(service, "stockths");
        assert_eq!(action, "503002");
    }

    #[test]
    fn structural_miss_degrades_to_empty() {
        let request = json!({"something": "else"});
        let (service, action) = service_and_action(&request, Protocol::Pb);
        assert_eq!(service, "");
        assert_eq!(action, "");
    }
}

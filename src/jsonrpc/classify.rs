//! Structural filters applied to inbound traffic before it is trusted.
//!
//! These are advisory checks, not schema validation. Anything that is not a
//! JSON object (including batch arrays) is rejected by both.

use serde_json::{Map, Value};

use super::types::JSONRPC_VERSION;

fn declares_v2(obj: &Map<String, Value>) -> bool {
    obj.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION)
}

/// False only for a 2.0 object that has an `id` key but no `method`
pub fn is_request_shaped(message: &Value) -> bool {
    let Some(obj) = message.as_object() else {
        return false;
    };
    !(declares_v2(obj) && obj.contains_key("id") && !obj.contains_key("method"))
}

/// False only for a 2.0 object with a non-null `id` and neither `result` nor `error`
pub fn is_response_shaped(message: &Value) -> bool {
    let Some(obj) = message.as_object() else {
        return false;
    };
    let has_id = obj.get("id").is_some_and(|id| !id.is_null());
    !(declares_v2(obj)
        && has_id
        && !obj.contains_key("result")
        && !obj.contains_key("error"))
}

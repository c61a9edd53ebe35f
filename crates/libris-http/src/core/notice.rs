use http::Method;
use serde_json::{Map, Value, json};

use crate::core::url_path;

pub const DEFAULT_NOTIFICATION_TYPE: &str = "general";
pub const DEFAULT_NOTICE_USER_ID: u64 = 1;

/// POST/PUT aimed at the notices endpoint.
pub fn is_notice_mutation(method: &Method, url: &str) -> bool {
    if !(method == Method::POST || method == Method::PUT) {
        return false;
    }
    url_path(url).split('/').any(|segment| segment == "notices")
}

/// Map the internal notice shape onto the backend's wire fields.
///
/// `expiry_date` becomes `expires_at`; `notification_type` and `user_id`
/// get defaults when absent.
pub fn reshape_notice_payload(body: &Value) -> Value {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);
    let pick = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| fields.get(*k))
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .cloned()
    };

    json!({
        "title": pick(&["title"]).unwrap_or_else(|| json!("")),
        "description": pick(&["description", "content"]).unwrap_or_else(|| json!("")),
        "notification_type": pick(&["notification_type", "type"])
            .unwrap_or_else(|| json!(DEFAULT_NOTIFICATION_TYPE)),
        "expires_at": pick(&["expires_at", "expiry_date"]).unwrap_or(Value::Null),
        "user_id": pick(&["user_id"]).unwrap_or_else(|| json!(DEFAULT_NOTICE_USER_ID)),
    })
}

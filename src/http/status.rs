//! HTTP status → user-facing message table.

use serde_json::Value;

pub const NETWORK_MESSAGE: &str = "Network error, please check your connection";
pub const TIMEOUT_MESSAGE: &str = "Request timed out, please try again";
pub const UNKNOWN_MESSAGE: &str = "Unknown error";

/// Resolve the message shown to the user for a failed HTTP status.
///
/// `server_detail` only wins for 422, where the server explains which field
/// failed validation, and for statuses the table does not cover.
pub fn message_for_status(status: u16, server_detail: Option<&str>) -> String {
    let fixed = match status {
        401 => "Unauthorized, please log in",
        403 => "Access denied",
        404 => "Requested resource not found",
        408 => TIMEOUT_MESSAGE,
        422 => {
            return server_detail
                .map(str::to_string)
                .unwrap_or_else(|| "Validation failed".to_string())
        }
        429 => "Too many requests, please slow down",
        500 => "Internal server error",
        501 => "Not implemented",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        505..=599 => return format!("Server error ({})", status),
        _ => {
            return server_detail
                .map(str::to_string)
                .unwrap_or_else(|| format!("Connection error ({})", status))
        }
    };
    fixed.to_string()
}

/// Pull a human-readable detail out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// `{"detail": [{"msg": "..."}]}` and envelopes `{"message": "..."}`.
pub fn server_detail(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }
    body.get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(message_for_status(401, None), "Unauthorized, please log in");
        assert_eq!(message_for_status(403, Some("ignored")), "Access denied");
        assert_eq!(message_for_status(404, None), "Requested resource not found");
        assert_eq!(message_for_status(408, None), TIMEOUT_MESSAGE);
        assert_eq!(message_for_status(429, None), "Too many requests, please slow down");
        assert_eq!(message_for_status(502, None), "Bad gateway");
        assert_eq!(message_for_status(507, None), "Server error (507)");
    }

    #[test]
    fn test_422_prefers_server_detail() {
        assert_eq!(message_for_status(422, Some("email is invalid")), "email is invalid");
        assert_eq!(message_for_status(422, None), "Validation failed");
    }

    #[test]
    fn test_unmapped_status() {
        assert_eq!(message_for_status(409, Some("already enrolled")), "already enrolled");
        assert_eq!(message_for_status(418, None), "Connection error (418)");
    }

    #[test]
    fn test_server_detail_shapes() {
        assert_eq!(
            server_detail(&json!({"detail": "Course is full"})).as_deref(),
            Some("Course is full")
        );
        assert_eq!(
            server_detail(&json!({"detail": [{"msg": "field required"}, {"msg": "too short"}]}))
                .as_deref(),
            Some("field required; too short")
        );
        assert_eq!(
            server_detail(&json!({"code": 1, "message": "nope"})).as_deref(),
            Some("nope")
        );
        assert_eq!(server_detail(&json!({"detail": ""})), None);
        assert_eq!(server_detail(&json!(null)), None);
    }
}

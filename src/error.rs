//! Unified SDK error types.

use serde::Serialize;
use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// HTTP-layer errors.
///
/// The `message` carried by each variant is the resolved, user-facing text
/// (the same text that is shown in a notification), so callers never need to
/// look at transport-specific shapes.
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    /// Network unreachable, connection reset, timeout.
    #[error("{message}")]
    Transport { message: String, timeout: bool },

    /// Non-2xx HTTP status.
    #[error("{message} (status {status})")]
    Status {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Envelope with `code != 0`.
    #[error("{message} (code {code})")]
    Application {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Envelope `code == 401` or HTTP status 401.
    #[error("{message}")]
    AuthExpired { message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Normalized error shape `{message, status?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl HttpError {
    /// The user-facing message.
    pub fn message(&self) -> String {
        match self {
            HttpError::Transport { message, .. }
            | HttpError::Status { message, .. }
            | HttpError::Application { message, .. }
            | HttpError::AuthExpired { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::AuthExpired { .. } => Some(401),
            HttpError::Transport { timeout: true, .. } => Some(408),
            _ => None,
        }
    }

    /// Server-supplied payload accompanying the failure.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            HttpError::Status { data, .. } | HttpError::Application { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, HttpError::AuthExpired { .. })
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            message: self.message(),
            status: self.status(),
            data: self.data().cloned(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Transport {
                message: crate::http::status::TIMEOUT_MESSAGE.to_string(),
                timeout: true,
            }
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else if e.is_builder() {
            HttpError::InvalidRequest(e.to_string())
        } else {
            tracing::debug!("transport failure: {}", e);
            HttpError::Transport {
                message: crate::http::status::NETWORK_MESSAGE.to_string(),
                timeout: false,
            }
        }
    }
}

/// WebSocket errors.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Not connected")]
    NotConnected,

    #[error("No session token available for the chat connection")]
    NoToken,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Connection closed: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },
}

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Account has no administrator privileges")]
    NotAdmin,
}

/// Session persistence errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_info_for_status_error() {
        let err = HttpError::Status {
            status: 422,
            message: "username too short".into(),
            data: Some(json!({"detail": "username too short"})),
        };
        let info = err.info();
        assert_eq!(info.message, "username too short");
        assert_eq!(info.status, Some(422));
        assert_eq!(info.data, Some(json!({"detail": "username too short"})));
    }

    #[test]
    fn test_info_for_auth_expired() {
        let err = HttpError::AuthExpired {
            message: "Unauthorized, please log in".into(),
        };
        assert!(err.is_auth_expired());
        assert_eq!(err.status(), Some(401));
        assert!(err.data().is_none());
    }

    #[test]
    fn test_info_serializes_without_empty_fields() {
        let err = HttpError::Transport {
            message: "Network error".into(),
            timeout: false,
        };
        let value = serde_json::to_value(err.info()).unwrap();
        assert_eq!(value, json!({"message": "Network error"}));
    }

    #[test]
    fn test_sdk_error_wraps_http() {
        let err: SdkError = HttpError::Decode("bad json".into()).into();
        assert!(matches!(err, SdkError::Http(HttpError::Decode(_))));
        assert_eq!(err.to_string(), "HTTP error: Decode error: bad json");
    }
}

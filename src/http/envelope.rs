//! Response envelope `{code, data, message, total?, page?}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HttpError;

/// Envelope code signalling success.
pub const CODE_OK: i64 = 0;

/// Envelope code signalling expired or invalid authentication.
pub const CODE_AUTH_EXPIRED: i64 = 401;

/// Full envelope, returned when the server attached pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Other pagination fields (`size`, `pages`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a successful call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// Plain response: only the envelope's `data`.
    Data(T),
    /// Paginated response: the whole envelope.
    Page(Envelope<T>),
}

impl<T> Payload<T> {
    /// The data, discarding pagination metadata.
    pub fn into_data(self) -> T {
        match self {
            Payload::Data(data) => data,
            Payload::Page(envelope) => envelope.data,
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Payload::Data(data) => data,
            Payload::Page(envelope) => &envelope.data,
        }
    }

    pub fn page(&self) -> Option<&Envelope<T>> {
        match self {
            Payload::Page(envelope) => Some(envelope),
            Payload::Data(_) => None,
        }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, Payload::Page(_))
    }
}

/// Result of inspecting a 2xx body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Classified {
    Data(Value),
    Page(Value),
    Failure {
        code: i64,
        message: Option<String>,
        data: Option<Value>,
    },
}

/// Classify a 2xx body.
///
/// Bodies without an integer `code` are not envelopes and pass through whole
/// as data.
pub(crate) fn classify(body: Value) -> Classified {
    let Some(code) = body.get("code").and_then(Value::as_i64) else {
        return Classified::Data(body);
    };

    if code != CODE_OK {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let data = body.get("data").filter(|d| !d.is_null()).cloned();
        return Classified::Failure {
            code,
            message,
            data,
        };
    }

    match body {
        Value::Object(mut obj) if obj.contains_key("total") || obj.contains_key("page") => {
            obj.entry("data").or_insert(Value::Null);
            Classified::Page(Value::Object(obj))
        }
        Value::Object(mut obj) => Classified::Data(obj.remove("data").unwrap_or(Value::Null)),
        other => Classified::Data(other),
    }
}

/// Decode a classified success into the caller's type.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    classified: Classified,
) -> Result<Payload<T>, HttpError> {
    let decode_err =
        |e: serde_json::Error| HttpError::Decode(format!("Failed to deserialize response: {}", e));
    match classified {
        Classified::Data(value) => serde_json::from_value(value)
            .map(Payload::Data)
            .map_err(decode_err),
        Classified::Page(value) => serde_json::from_value(value)
            .map(Payload::Page)
            .map_err(decode_err),
        Classified::Failure { code, .. } => Err(HttpError::Decode(format!(
            "Cannot decode a failed envelope (code {})",
            code
        ))),
    }
}

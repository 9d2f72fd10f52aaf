//! Query parameters.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::error::HttpError;

/// Ordered query parameters. Repeated keys are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.push(key, value);
        self
    }

    /// Insert only when `value` is `Some`.
    pub fn insert_opt(mut self, key: impl Into<String>, value: Option<impl Display>) -> Self {
        if let Some(v) = value {
            self.push(key, v);
        }
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Flatten a serializable struct or map into parameters.
    ///
    /// `null` fields are skipped, arrays become repeated keys and nested
    /// objects are sent as JSON text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, HttpError> {
        let value = serde_json::to_value(value)
            .map_err(|e| HttpError::InvalidRequest(format!("Unserializable params: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(HttpError::InvalidRequest(
                "Query params must serialize to an object".into(),
            ));
        };

        let mut params = Self::new();
        for (key, value) in map {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = scalar(&item) {
                            params.push(key.clone(), s);
                        }
                    }
                }
                other => {
                    if let Some(s) = scalar(&other) {
                        params.push(key, s);
                    }
                }
            }
        }
        Ok(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_preserves_order() {
        let params = Params::new()
            .insert("page", 2)
            .insert("size", 20)
            .insert_opt("keyword", None::<&str>)
            .insert_opt("level", Some("beginner"));
        assert_eq!(
            params.pairs(),
            &[
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "20".to_string()),
                ("level".to_string(), "beginner".to_string()),
            ]
        );
        assert_eq!(params.get("size"), Some("20"));
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct Filter {
            page: u32,
            keyword: Option<String>,
            tags: Vec<&'static str>,
            featured: bool,
        }

        let params = Params::from_serialize(&Filter {
            page: 1,
            keyword: None,
            tags: vec!["salsa", "tango"],
            featured: true,
        })
        .unwrap();

        assert_eq!(params.get("page"), Some("1"));
        assert_eq!(params.get("keyword"), None);
        assert_eq!(params.get("featured"), Some("true"));
        let tags: Vec<&str> = params
            .pairs()
            .iter()
            .filter(|(k, _)| k == "tags")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(tags, vec!["salsa", "tango"]);
    }

    #[test]
    fn test_nested_object_is_json_text() {
        let params = Params::from_serialize(&json!({"range": {"from": 1}})).unwrap();
        assert_eq!(params.get("range"), Some(r#"{"from":1}"#));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            Params::from_serialize(&json!([1, 2])),
            Err(HttpError::InvalidRequest(_))
        ));
    }
}

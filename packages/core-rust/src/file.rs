//! File descriptors produced by the file-picking collaborator.

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Standardized file record held in a file field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Unique identifier assigned when the file was picked.
    pub id: String,
    /// Location of the file content.
    pub uri: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Display name.
    pub name: String,
    /// Size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
}

impl FileDescriptor {
    /// Creates a descriptor with a fresh v4 UUID.
    pub fn new(uri: impl Into<String>, mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            uri: uri.into(),
            mime_type: mime_type.into(),
            name: name.into(),
            size: None,
        }
    }

    /// Sets the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Converts the descriptor into a form value (an object).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), Value::from(self.id.as_str()));
        map.insert("uri".to_string(), Value::from(self.uri.as_str()));
        map.insert("type".to_string(), Value::from(self.mime_type.as_str()));
        map.insert("name".to_string(), Value::from(self.name.as_str()));
        if let Some(size) = self.size {
            map.insert("size".to_string(), Value::Int(size as i64));
        }
        Value::Map(map)
    }
}

/// Whether `value` is one of the accepted file representations:
/// an object with a non-empty `uri`, an `http(s)` URL string, or a
/// base64 data URI string.
#[must_use]
pub fn is_file_value(value: &Value) -> bool {
    match value {
        Value::Map(m) => m
            .get("uri")
            .and_then(Value::as_str)
            .is_some_and(|uri| !uri.trim().is_empty()),
        Value::String(s) => is_http_url(s) || is_base64_data_uri(s),
        _ => false,
    }
}

fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty() && !r.chars().any(char::is_whitespace))
}

fn is_base64_data_uri(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("data:") else {
        return false;
    };
    let Some((meta, payload)) = rest.split_once(',') else {
        return false;
    };
    meta.ends_with(";base64")
        && !payload.is_empty()
        && base64::engine::general_purpose::STANDARD
            .decode(payload)
            .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_value_has_a_uri() {
        let file = FileDescriptor::new("file:///tmp/a.jpg", "image/jpeg", "a.jpg").with_size(42);
        assert!(!file.id.is_empty());
        let value = file.to_value();
        assert!(is_file_value(&value));
        assert_eq!(value.as_map().and_then(|m| m.get("size")), Some(&Value::Int(42)));
    }

    #[test]
    fn descriptors_get_distinct_ids() {
        let a = FileDescriptor::new("u", "t", "n");
        let b = FileDescriptor::new("u", "t", "n");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn accepts_urls_and_data_uris() {
        assert!(is_file_value(&Value::from("https://cdn.example.com/a.pdf")));
        assert!(is_file_value(&Value::from("http://x.io/y")));
        assert!(is_file_value(&Value::from("data:image/png;base64,aGVsbG8=")));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(!is_file_value(&Value::from("ftp://x.io/y")));
        assert!(!is_file_value(&Value::from("https://")));
        assert!(!is_file_value(&Value::from("data:image/png;base64,!!!")));
        assert!(!is_file_value(&Value::from("data:text/plain,hello")));
        let mut empty_uri = BTreeMap::new();
        empty_uri.insert("uri".to_string(), Value::from("  "));
        assert!(!is_file_value(&Value::Map(empty_uri)));
        assert!(!is_file_value(&Value::Int(1)));
    }
}

//! Content hashing of canonical JSON.
//!
//! The ETag of a resource is the base64-encoded SHA-256 digest of the UTF-8
//! bytes of its canonical JSON (all inclusion flags on).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque content fingerprint of a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Fingerprint of raw canonical bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(STANDARD.encode(digest))
    }

    /// Fingerprint of a canonical JSON object.
    ///
    /// The object is rendered compactly in its own key order, which is why
    /// callers must pass the fixed-order canonical form.
    #[must_use]
    pub fn of_object(object: &Map<String, Value>) -> Self {
        Self::of_bytes(canonical_text(object).as_bytes())
    }

    /// Text form, suitable for an HTTP `ETag` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact text of a JSON object, keys in insertion order.
#[must_use]
pub fn canonical_text(object: &Map<String, Value>) -> String {
    // Display on Value is infallible for string-keyed maps.
    Value::Object(object.clone()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn equal_content_gives_equal_tags() {
        let a = object(json!({"id": "LOC1", "name": "Depot"}));
        let b = object(json!({"id": "LOC1", "name": "Depot"}));
        assert_eq!(ETag::of_object(&a), ETag::of_object(&b));
    }

    #[test]
    fn any_change_changes_the_tag() {
        let a = object(json!({"id": "LOC1", "name": "Depot"}));
        let b = object(json!({"id": "LOC1", "name": "Depot 2"}));
        assert_ne!(ETag::of_object(&a), ETag::of_object(&b));
    }

    #[test]
    fn key_order_is_significant() {
        let a = object(json!({"id": "LOC1", "name": "Depot"}));
        let mut b = Map::new();
        b.insert("name".into(), json!("Depot"));
        b.insert("id".into(), json!("LOC1"));
        assert_ne!(ETag::of_object(&a), ETag::of_object(&b));
    }

    #[test]
    fn tag_is_base64_sha256() {
        let tag = ETag::of_bytes(b"");
        assert_eq!(tag.as_str(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }
}

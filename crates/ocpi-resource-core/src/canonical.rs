//! Canonical serialization helpers.
//!
//! Resources are emitted as JSON objects whose key order is fixed per type.
//! [`JsonWriter`] appends keys in call order and skips absent optionals and
//! empty optional collections, so each resource's `to_json` reads top to
//! bottom in wire order.

use crate::timestamp::Timestamp;
use serde_json::{Map, Value};

/// Toggles for the optional sections of a serialized resource.
///
/// Switching a section off never reorders the remaining keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit `country_code` and `party_id`
    pub include_owner_information: bool,
    /// Emit `version`
    pub include_version_information: bool,
    /// Emit `created`
    pub include_created_timestamp: bool,
    /// Emit `custom_data`
    pub include_extensions: bool,
}

impl SerializeOptions {
    /// Everything on. This is the form that is hashed and patched.
    pub const ALL: Self = Self {
        include_owner_information: true,
        include_version_information: true,
        include_created_timestamp: true,
        include_extensions: true,
    };

    /// Form used for children embedded in their parent: the owner is implied
    /// by the parent.
    pub const EMBEDDED: Self = Self {
        include_owner_information: false,
        ..Self::ALL
    };

    /// Same options with owner information switched off.
    #[must_use]
    pub fn without_owner(self) -> Self {
        Self {
            include_owner_information: false,
            ..self
        }
    }

    /// Same options with version information switched off.
    #[must_use]
    pub fn without_version(self) -> Self {
        Self {
            include_version_information: false,
            ..self
        }
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::ALL
    }
}

/// Ordered JSON object builder.
#[derive(Debug, Default)]
pub struct JsonWriter {
    object: Map<String, Value>,
}

impl JsonWriter {
    /// Start an empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mandatory field.
    pub fn field(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.object.insert(key.to_string(), value.into());
        self
    }

    /// Append a field only when present.
    pub fn optional(&mut self, key: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(value) = value {
            self.object.insert(key.to_string(), value.into());
        }
        self
    }

    /// Append a field only when `condition` holds.
    pub fn field_if(&mut self, condition: bool, key: &str, value: impl Into<Value>) -> &mut Self {
        if condition {
            self.object.insert(key.to_string(), value.into());
        }
        self
    }

    /// Append a timestamp in wire form.
    pub fn timestamp(&mut self, key: &str, value: Timestamp) -> &mut Self {
        self.field(key, value.to_wire())
    }

    /// Append an optional timestamp in wire form.
    pub fn optional_timestamp(&mut self, key: &str, value: Option<Timestamp>) -> &mut Self {
        self.optional(key, value.map(|t| t.to_wire()))
    }

    /// Append a mandatory collection, even when empty.
    pub fn array<I, V>(&mut self, key: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.object.insert(key.to_string(), Value::Array(items));
        self
    }

    /// Append an optional collection; empty collections are omitted.
    pub fn optional_array<I, V>(&mut self, key: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        if !items.is_empty() {
            self.object.insert(key.to_string(), Value::Array(items));
        }
        self
    }

    /// Append a nested object with a fixed key order chosen by the caller.
    pub fn object(&mut self, key: &str, object: Map<String, Value>) -> &mut Self {
        self.object.insert(key.to_string(), Value::Object(object));
        self
    }

    /// Append a free-form object (vendor data) with its keys sorted at
    /// every depth, so equal content always renders the same text.
    pub fn free_form(&mut self, key: &str, object: &Map<String, Value>) -> &mut Self {
        self.object.insert(key.to_string(), Value::Object(sorted_object(object)));
        self
    }

    /// Finish and return the object.
    #[must_use]
    pub fn finish(self) -> Map<String, Value> {
        self.object
    }
}

fn sorted_object(object: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = object.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), sorted_value(value)))
        .collect()
}

fn sorted_value(value: &Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(sorted_object(object)),
        Value::Array(items) => Value::Array(items.iter().map(sorted_value).collect()),
        other => other.clone(),
    }
}

/// Remove duplicates while keeping the first occurrence of each element.
///
/// Works for element types that are only `PartialEq` (e.g. values holding
/// floats), which rules out hash-based sets.
#[must_use]
pub fn dedup_ordered<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_keeps_call_order() {
        let mut writer = JsonWriter::new();
        writer
            .field("id", "LOC1")
            .optional("name", None::<String>)
            .optional("city", Some("Jena"))
            .optional_array("facilities", Vec::<String>::new())
            .array("evses", Vec::<String>::new())
            .field_if(false, "version", 1);
        let object = writer.finish();

        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "city", "evses"]);
    }

    #[test]
    fn free_form_objects_are_sorted_at_every_depth() {
        let a = serde_json::json!({"b": {"y": 1, "x": [{"q": 1, "p": 2}]}, "a": 1});
        let b = serde_json::json!({"a": 1, "b": {"x": [{"p": 2, "q": 1}], "y": 1}});
        let (Value::Object(a), Value::Object(b)) = (a, b) else {
            unreachable!()
        };

        let render = |object: &Map<String, Value>| {
            let mut writer = JsonWriter::new();
            writer.free_form("custom_data", object);
            Value::Object(writer.finish()).to_string()
        };
        assert_eq!(render(&a), render(&b));
        assert_eq!(
            render(&a),
            r#"{"custom_data":{"a":1,"b":{"x":[{"p":2,"q":1}],"y":1}}}"#
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_ordered([3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn embedded_drops_only_owner() {
        let options = SerializeOptions::EMBEDDED;
        assert!(!options.include_owner_information);
        assert!(options.include_version_information);
        assert_eq!(SerializeOptions::ALL.without_owner(), options);
    }
}

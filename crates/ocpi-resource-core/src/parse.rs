//! Typed field access over untrusted JSON objects.
//!
//! [`JsonReader`] turns every problem into a [`ValidationError`] that names
//! the offending field. Optional fields that are absent or `null` read as
//! `None`, optional collections as empty; only mandatory fields fail when
//! missing.

use crate::error::ValidationError;
use crate::timestamp::Timestamp;
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

/// Parse JSON text into a value.
///
/// # Errors
///
/// Returns [`ValidationError::MalformedJson`] for syntax errors.
pub fn parse_text(text: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(text).map_err(|e| ValidationError::MalformedJson(e.to_string()))
}

/// Read-only view over one JSON object.
#[derive(Debug, Clone, Copy)]
pub struct JsonReader<'a> {
    object: &'a Map<String, Value>,
    prefix: &'a str,
}

impl<'a> JsonReader<'a> {
    /// Wrap `value`, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAnObject`] naming `context`.
    pub fn new(value: &'a Value, context: &str) -> Result<Self, ValidationError> {
        Self::nested(value, context, "")
    }

    /// Wrap a nested object; field names in errors are prefixed with
    /// `prefix` (e.g. `charging_periods[0].`).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAnObject`] naming `context`.
    pub fn nested(value: &'a Value, context: &str, prefix: &'a str) -> Result<Self, ValidationError> {
        match value {
            Value::Object(object) => Ok(Self { object, prefix }),
            _ => Err(ValidationError::NotAnObject {
                context: context.to_string(),
            }),
        }
    }

    /// The underlying object.
    #[must_use]
    pub fn object(&self) -> &'a Map<String, Value> {
        self.object
    }

    /// Field name as reported in errors.
    #[must_use]
    pub fn field_name(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Value at `key`, treating `null` as absent.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    /// `true` if `key` holds a non-null value.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Mandatory value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] if absent or null.
    pub fn required(&self, key: &str) -> Result<&'a Value, ValidationError> {
        self.value(key)
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    fn invalid(&self, key: &str, expected: &str, found: &Value) -> ValidationError {
        ValidationError::invalid(
            self.field_name(key),
            format!("expected {expected}, found {}", kind_of(found)),
        )
    }

    /// Optional string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for non-string values.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    /// Mandatory string.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a string.
    pub fn string(&self, key: &str) -> Result<String, ValidationError> {
        self.optional_string(key)?
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    /// Optional boolean.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for non-boolean values.
    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    /// Mandatory boolean.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a boolean.
    pub fn bool(&self, key: &str) -> Result<bool, ValidationError> {
        self.optional_bool(key)?
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    /// Optional unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for anything but a
    /// non-negative integer.
    pub fn optional_u64(&self, key: &str) -> Result<Option<u64>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", value)),
        }
    }

    /// Optional decimal number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for non-numeric values.
    pub fn optional_f64(&self, key: &str) -> Result<Option<f64>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number", value)),
        }
    }

    /// Mandatory decimal number.
    ///
    /// # Errors
    ///
    /// Fails if absent or not a number.
    pub fn f64(&self, key: &str) -> Result<f64, ValidationError> {
        self.optional_f64(key)?
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    /// Optional ISO-8601 timestamp.
    ///
    /// # Errors
    ///
    /// Fails if present but not a valid timestamp string.
    pub fn optional_timestamp(&self, key: &str) -> Result<Option<Timestamp>, ValidationError> {
        self.optional_string(key)?
            .map(|raw| {
                raw.parse::<Timestamp>()
                    .map_err(|e| ValidationError::invalid(self.field_name(key), e.to_string()))
            })
            .transpose()
    }

    /// Mandatory ISO-8601 timestamp.
    ///
    /// # Errors
    ///
    /// Fails if absent or malformed.
    pub fn timestamp(&self, key: &str) -> Result<Timestamp, ValidationError> {
        self.optional_timestamp(key)?
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    /// Optional value parsed from a string token (enumerations, codes).
    ///
    /// # Errors
    ///
    /// Fails if present but not a string, or if the token is rejected.
    pub fn optional_token<T>(&self, key: &str) -> Result<Option<T>, ValidationError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional_string(key)?
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| ValidationError::invalid(self.field_name(key), e.to_string()))
            })
            .transpose()
    }

    /// Mandatory value parsed from a string token.
    ///
    /// # Errors
    ///
    /// Fails if absent, not a string, or rejected.
    pub fn token<T>(&self, key: &str) -> Result<T, ValidationError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional_token(key)?
            .ok_or_else(|| ValidationError::missing(self.field_name(key)))
    }

    /// Array at `key`; absent or `null` reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for non-array values.
    pub fn array(&self, key: &str) -> Result<&'a [Value], ValidationError> {
        match self.value(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.invalid(key, "an array", other)),
        }
    }

    /// Deduplicated, order-preserving set of string tokens.
    ///
    /// # Errors
    ///
    /// Fails if the field is not an array of acceptable tokens.
    pub fn token_set<T>(&self, key: &str) -> Result<IndexSet<T>, ValidationError>
    where
        T: FromStr + Hash + Eq,
        T::Err: Display,
    {
        let mut set = IndexSet::new();
        for (index, item) in self.array(key)?.iter().enumerate() {
            let field = format!("{}[{index}]", self.field_name(key));
            let raw = item
                .as_str()
                .ok_or_else(|| ValidationError::invalid(&field, "expected a string"))?;
            let token = raw
                .parse::<T>()
                .map_err(|e| ValidationError::invalid(&field, e.to_string()))?;
            set.insert(token);
        }
        Ok(set)
    }

    /// Parse every element of the array at `key` with `parse`.
    ///
    /// `parse` receives the element and its error prefix
    /// (`key[index].`).
    ///
    /// # Errors
    ///
    /// Propagates the first element error.
    pub fn each<T, F>(&self, key: &str, mut parse: F) -> Result<Vec<T>, ValidationError>
    where
        F: FnMut(&Value, &str) -> Result<T, ValidationError>,
    {
        self.array(key)?
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let prefix = format!("{}[{index}].", self.field_name(key));
                parse(item, &prefix)
            })
            .collect()
    }

    /// Optional nested object, cloned.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidValue`] for non-object values.
    pub fn optional_object(&self, key: &str) -> Result<Option<Map<String, Value>>, ValidationError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(self.invalid(key, "an object", other)),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_objects() {
        let value = json!([1, 2]);
        let err = JsonReader::new(&value, "Location").unwrap_err();
        assert_eq!(err.to_string(), "'Location' must be a JSON object");
    }

    #[test]
    fn null_is_absent() {
        let value = json!({"name": null, "facilities": null});
        let reader = JsonReader::new(&value, "Location").unwrap();
        assert_eq!(reader.optional_string("name").unwrap(), None);
        assert!(reader.array("facilities").unwrap().is_empty());
        assert_eq!(
            reader.string("name").unwrap_err(),
            ValidationError::missing("name")
        );
    }

    #[test]
    fn wrong_types_name_the_field() {
        let value = json!({"publish": "yes", "kwh": "12"});
        let reader = JsonReader::new(&value, "Location").unwrap();
        let err = reader.bool("publish").unwrap_err();
        assert_eq!(err.field(), Some("publish"));
        assert!(err.to_string().contains("expected a boolean, found a string"));
        assert_eq!(reader.f64("kwh").unwrap_err().field(), Some("kwh"));
    }

    #[test]
    fn token_set_deduplicates_in_order() {
        let value = json!({"tariff_ids": ["B", "A", "B"]});
        let reader = JsonReader::new(&value, "Cdr").unwrap();
        let set: IndexSet<String> = reader.token_set("tariff_ids").unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), ["B", "A"]);
    }

    #[test]
    fn nested_errors_carry_the_prefix() {
        let value = json!({"periods": [{"start": "2024-01-01T00:00:00Z"}, {}]});
        let reader = JsonReader::new(&value, "Cdr").unwrap();
        let err = reader
            .each("periods", |item, prefix| {
                let nested = JsonReader::nested(item, "period", prefix)?;
                nested.timestamp("start")
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::missing("periods[1].start"));
    }

    #[test]
    fn malformed_text_is_reported() {
        assert!(matches!(
            parse_text("{\"id\":").unwrap_err(),
            ValidationError::MalformedJson(_)
        ));
    }
}

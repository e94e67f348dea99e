//! Field rules shared by several entities.

use ocpi_resource_core::{
    ConstructionError, IdentityHints, JsonReader, Parseable, PartyId, SerializeOptions,
    Serializable, ValidationError,
};
use serde_json::Value;
use std::sync::Arc;

/// Monetary or metered amount: finite and not negative. `-0.0` becomes
/// `0.0` so both render (and hash) the same.
pub(crate) fn amount(field: &str, value: f64) -> Result<f64, ConstructionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value + 0.0)
    } else {
        Err(ConstructionError::invalid(
            field,
            format!("{value} is not a finite, non-negative number"),
        ))
    }
}

/// ISO 4217 currency code.
pub(crate) fn currency(field: &str, code: String) -> Result<String, ConstructionError> {
    upper_alpha(field, code, 3, "an ISO 4217 currency code")
}

/// ISO 3166-1 alpha-3 country code.
pub(crate) fn country(field: &str, code: String) -> Result<String, ConstructionError> {
    upper_alpha(field, code, 3, "an ISO 3166-1 alpha-3 country code")
}

fn upper_alpha(
    field: &str,
    code: String,
    len: usize,
    expected: &str,
) -> Result<String, ConstructionError> {
    if code.len() == len && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(ConstructionError::invalid(
            field,
            format!("'{code}' is not {expected}"),
        ))
    }
}

/// Parse embedded children, hinting the owner's party.
pub(crate) fn read_children<C: Parseable>(
    reader: &JsonReader<'_>,
    key: &str,
    party_id: &PartyId,
) -> Result<Vec<C>, ValidationError> {
    let hints = IdentityHints::party(party_id.clone());
    reader.each(key, |item, prefix| {
        C::from_json(item, &hints).map_err(|e| e.within(prefix))
    })
}

/// Embedded form of registry children: owner information is implied by the
/// parent.
pub(crate) fn embedded<C: Serializable>(children: &[Arc<C>], options: SerializeOptions) -> Vec<Value> {
    children
        .iter()
        .map(|child| Value::Object(child.to_json(options.without_owner())))
        .collect()
}

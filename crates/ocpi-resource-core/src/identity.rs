//! Identity and version model shared by every resource.
//!
//! A resource is identified by `(PartyId, ResourceId, VersionId)`. The party
//! is itself a pair of an ISO-3166 alpha-2 country code and a three character
//! party code, and travels on the wire as the two keys `country_code` and
//! `party_id`.

use crate::error::{ConstructionError, ValidationError};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a resource id.
pub const MAX_ID_LEN: usize = 36;

/// Wire key of the country half of a party identity.
pub const COUNTRY_CODE_KEY: &str = "country_code";

/// Wire key of the party half of a party identity.
pub const PARTY_ID_KEY: &str = "party_id";

/// Wire key of the version id.
pub const VERSION_KEY: &str = "version";

/// Identifies the party (CPO or eMSP) that issued a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId {
    country_code: String,
    party: String,
}

impl PartyId {
    /// Create a party identity, validating both halves.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `country_code` or `party_id` if a
    /// half is malformed.
    pub fn new(country_code: &str, party: &str) -> Result<Self, ValidationError> {
        if country_code.len() != 2 || !country_code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::invalid(
                COUNTRY_CODE_KEY,
                format!("'{country_code}' is not two upper-case letters"),
            ));
        }
        if party.len() != 3
            || !party
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(ValidationError::invalid(
                PARTY_ID_KEY,
                format!("'{party}' is not three upper-case alphanumerics"),
            ));
        }
        Ok(Self {
            country_code: country_code.to_string(),
            party: party.to_string(),
        })
    }

    /// ISO-3166 alpha-2 country code.
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Three character party code.
    #[must_use]
    pub fn party(&self) -> &str {
        &self.party
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.country_code, self.party)
    }
}

impl FromStr for PartyId {
    type Err = ValidationError;

    /// Parse the `DE*GEF` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (country, party) = s.split_once('*').ok_or_else(|| {
            ValidationError::invalid(PARTY_ID_KEY, format!("'{s}' is not of the form CC*PPP"))
        })?;
        Self::new(country, party)
    }
}

/// Validate a resource id.
///
/// # Errors
///
/// Returns a construction error naming `field` if the id is empty or longer
/// than [`MAX_ID_LEN`] characters.
pub fn validate_id(field: &str, id: &str) -> Result<(), ConstructionError> {
    let len = id.chars().count();
    if len == 0 || len > MAX_ID_LEN {
        return Err(ConstructionError::invalid(
            field,
            format!("id must be 1..={MAX_ID_LEN} characters, got {len}"),
        ));
    }
    Ok(())
}

/// The immutable `(party, id, version)` tuple of a resource.
///
/// Ordering follows the field order: party first, then id, then version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Issuing party
    pub party_id: PartyId,
    /// Resource id, unique per party
    pub id: String,
    /// Version of this resource
    pub version: u64,
}

impl ResourceIdentity {
    /// Create a new identity.
    #[must_use]
    pub fn new(party_id: PartyId, id: impl Into<String>, version: u64) -> Self {
        Self {
            party_id,
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.party_id, self.id, self.version)
    }
}

/// Identity values supplied out of band, typically from a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityHints {
    /// Party taken from the path
    pub party_id: Option<PartyId>,
    /// Resource id taken from the path
    pub id: Option<String>,
    /// Version taken from the transport
    pub version: Option<u64>,
}

impl IdentityHints {
    /// No hints at all; every identity field must come from the body.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Hint only the party, as used for children embedded in a parent.
    #[must_use]
    pub fn party(party_id: PartyId) -> Self {
        Self {
            party_id: Some(party_id),
            ..Self::default()
        }
    }

    /// Hint all three identity fields.
    #[must_use]
    pub fn from_identity(identity: &ResourceIdentity) -> Self {
        Self {
            party_id: Some(identity.party_id.clone()),
            id: Some(identity.id.clone()),
            version: Some(identity.version),
        }
    }

    /// Build hints from raw, percent-encoded URL path segments.
    ///
    /// A party hint requires both the country and the party segment.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a segment is not valid UTF-8 after
    /// decoding or if the party segments are malformed.
    pub fn from_path_segments(
        country_code: Option<&str>,
        party: Option<&str>,
        id: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let party_id = match (country_code, party) {
            (Some(country), Some(party)) => Some(PartyId::new(
                &decode_segment(COUNTRY_CODE_KEY, country)?,
                &decode_segment(PARTY_ID_KEY, party)?,
            )?),
            (None, None) => None,
            (Some(_), None) => return Err(ValidationError::missing(PARTY_ID_KEY)),
            (None, Some(_)) => return Err(ValidationError::missing(COUNTRY_CODE_KEY)),
        };
        let id = id.map(|raw| decode_segment("id", raw)).transpose()?;
        Ok(Self {
            party_id,
            id,
            version: None,
        })
    }

    /// Attach a version hint.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }
}

/// Reconcile a transport hint with a body value.
///
/// Both present: they must be equal. One present: it is used. Neither:
/// the field is missing.
///
/// # Errors
///
/// Returns [`ValidationError::IdentityMismatch`] or
/// [`ValidationError::MissingField`] naming `field`.
pub fn reconcile<T>(field: &str, hint: Option<&T>, body: Option<T>) -> Result<T, ValidationError>
where
    T: PartialEq + Clone + fmt::Display,
{
    match (hint, body) {
        (Some(hint), Some(body)) if *hint == body => Ok(body),
        (Some(hint), Some(body)) => Err(ValidationError::IdentityMismatch {
            field: field.to_string(),
            hint: hint.to_string(),
            body: body.to_string(),
        }),
        (Some(hint), None) => Ok(hint.clone()),
        (None, Some(body)) => Ok(body),
        (None, None) => Err(ValidationError::missing(field)),
    }
}

fn decode_segment(field: &str, raw: &str) -> Result<String, ValidationError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| ValidationError::invalid(field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gef() -> PartyId {
        PartyId::new("DE", "GEF").unwrap()
    }

    #[test]
    fn party_id_display_and_parse() {
        assert_eq!(gef().to_string(), "DE*GEF");
        assert_eq!("DE*GEF".parse::<PartyId>().unwrap(), gef());
        assert!("DEGEF".parse::<PartyId>().is_err());
    }

    #[test]
    fn party_id_rejects_lower_case() {
        let err = PartyId::new("de", "GEF").unwrap_err();
        assert_eq!(err.field(), Some(COUNTRY_CODE_KEY));

        let err = PartyId::new("DE", "ge").unwrap_err();
        assert_eq!(err.field(), Some(PARTY_ID_KEY));
    }

    #[test]
    fn identity_orders_by_party_then_id_then_version() {
        let a = ResourceIdentity::new(gef(), "LOC1", 2);
        let b = ResourceIdentity::new(gef(), "LOC2", 1);
        let c = ResourceIdentity::new(gef(), "LOC1", 3);
        assert!(a < b);
        assert!(a < c);
        assert!(c < b);
    }

    #[test]
    fn reconcile_rules() {
        assert_eq!(reconcile("id", Some(&"A".to_string()), Some("A".to_string())).unwrap(), "A");
        assert_eq!(reconcile("id", Some(&"A".to_string()), None).unwrap(), "A");
        assert_eq!(reconcile::<String>("id", None, Some("B".to_string())).unwrap(), "B");

        let err = reconcile("id", Some(&"A".to_string()), Some("B".to_string())).unwrap_err();
        assert!(matches!(err, ValidationError::IdentityMismatch { .. }));

        let err = reconcile::<String>("id", None, None).unwrap_err();
        assert_eq!(err, ValidationError::missing("id"));
    }

    #[test]
    fn hints_from_percent_encoded_segments() {
        let hints = IdentityHints::from_path_segments(Some("DE"), Some("GEF"), Some("LOC%201"))
            .unwrap()
            .with_version(4);
        assert_eq!(hints.party_id, Some(gef()));
        assert_eq!(hints.id.as_deref(), Some("LOC 1"));
        assert_eq!(hints.version, Some(4));

        assert!(IdentityHints::from_path_segments(Some("DE"), None, None).is_err());
    }

    #[test]
    fn id_length_is_bounded() {
        assert!(validate_id("id", "").is_err());
        assert!(validate_id("id", &"x".repeat(MAX_ID_LEN)).is_ok());
        assert!(validate_id("id", &"x".repeat(MAX_ID_LEN + 1)).is_err());
    }
}

//! Error taxonomy for parsing, construction and patching.
//!
//! Every variant names the offending field or key so that the transport
//! layer can hand a readable message back to the remote party.

use std::fmt;

/// A value could not be constructed from the supplied fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// A mandatory scalar field is absent.
    #[error("missing mandatory field '{field}'")]
    MissingField {
        /// Wire name of the field
        field: String,
    },
    /// A mandatory collection is empty.
    #[error("mandatory collection '{field}' must not be empty")]
    EmptyCollection {
        /// Wire name of the collection
        field: String,
    },
    /// Two children share the same key inside one parent.
    #[error("duplicate child '{key}' in '{field}'")]
    DuplicateChild {
        /// Wire name of the child collection
        field: String,
        /// The colliding child key
        key: String,
    },
    /// A field holds a value outside its allowed range or shape.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Wire name of the field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConstructionError {
    /// Shorthand for [`ConstructionError::MissingField`].
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Shorthand for [`ConstructionError::EmptyCollection`].
    #[must_use]
    pub fn empty(field: impl Into<String>) -> Self {
        Self::EmptyCollection {
            field: field.into(),
        }
    }

    /// Shorthand for [`ConstructionError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Untrusted input could not be turned into a typed resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The input is not syntactically valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    /// The input (or a nested value) is not a JSON object.
    #[error("'{context}' must be a JSON object")]
    NotAnObject {
        /// Resource kind or field that was expected to be an object
        context: String,
    },
    /// A mandatory field is absent or null.
    #[error("missing mandatory field '{field}'")]
    MissingField {
        /// Wire name of the field
        field: String,
    },
    /// A field is present but its value is malformed.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Wire name of the field
        field: String,
        /// What is wrong with it
        reason: String,
    },
    /// The transport hint and the body disagree on an identity field.
    #[error("identity mismatch for '{field}': transport says '{hint}', body says '{body}'")]
    IdentityMismatch {
        /// Wire name of the identity field
        field: String,
        /// Value supplied out of band
        hint: String,
        /// Value found in the body
        body: String,
    },
    /// The parsed fields were rejected by the resource constructor.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Re-anchor the error inside an enclosing document, e.g. under
    /// `charging_stations[0].`.
    #[must_use]
    pub fn within(self, prefix: &str) -> Self {
        let at = |field: String| format!("{prefix}{field}");
        match self {
            Self::MissingField { field } => Self::MissingField { field: at(field) },
            Self::InvalidValue { field, reason } => Self::InvalidValue {
                field: at(field),
                reason,
            },
            Self::IdentityMismatch { field, hint, body } => Self::IdentityMismatch {
                field: at(field),
                hint,
                body,
            },
            Self::NotAnObject { .. } => Self::NotAnObject {
                context: prefix.trim_end_matches('.').to_string(),
            },
            Self::Construction(err) => Self::Construction(match err {
                ConstructionError::MissingField { field } => {
                    ConstructionError::MissingField { field: at(field) }
                }
                ConstructionError::EmptyCollection { field } => {
                    ConstructionError::EmptyCollection { field: at(field) }
                }
                ConstructionError::DuplicateChild { field, key } => {
                    ConstructionError::DuplicateChild {
                        field: at(field),
                        key,
                    }
                }
                ConstructionError::InvalidValue { field, reason } => {
                    ConstructionError::InvalidValue {
                        field: at(field),
                        reason,
                    }
                }
            }),
            Self::MalformedJson(message) => Self::MalformedJson(message),
        }
    }

    /// Wire name of the offending field, if the error is tied to one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field }
            | Self::InvalidValue { field, .. }
            | Self::IdentityMismatch { field, .. } => Some(field),
            Self::Construction(
                ConstructionError::MissingField { field }
                | ConstructionError::EmptyCollection { field }
                | ConstructionError::DuplicateChild { field, .. }
                | ConstructionError::InvalidValue { field, .. },
            ) => Some(field),
            Self::MalformedJson(_) | Self::NotAnObject { .. } => None,
        }
    }
}

/// A merge patch was rejected. The target resource is never modified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The patch document itself is unusable.
    #[error("invalid patch: {message}")]
    InvalidPatch {
        /// Description of the problem
        message: String,
    },
    /// The patch tries to change an identity key.
    #[error("patching protected field '{key}' is not allowed")]
    ProtectedField {
        /// The protected key found in the patch
        key: String,
    },
    /// The patch would move `last_updated` backwards.
    #[error("last_updated '{requested}' is older than the current value '{current}'")]
    StaleLastUpdated {
        /// Current `last_updated` of the resource
        current: String,
        /// Value requested by the patch
        requested: String,
    },
    /// The merged document did not validate.
    #[error("patched resource is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation findings collected by a builder.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warnings(Vec<ValidationError>);

impl Warnings {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a finding.
    pub fn push(&mut self, warning: impl Into<ValidationError>) {
        self.0.push(warning.into());
    }

    /// Record a missing field if `value` is `None`.
    pub fn require<T>(&mut self, field: &str, value: Option<&T>) {
        if value.is_none() {
            self.push(ValidationError::missing(field));
        }
    }

    /// `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the findings in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Err(self)` if anything was recorded, `Ok(())` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected warnings when non-empty.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for Warnings {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ConstructionError> for Warnings {
    fn from(err: ConstructionError) -> Self {
        Self(vec![err.into()])
    }
}

impl IntoIterator for Warnings {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, warning) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{warning}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Warnings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_field() {
        let err = ValidationError::missing("charging_periods");
        assert_eq!(err.to_string(), "missing mandatory field 'charging_periods'");
        assert_eq!(err.field(), Some("charging_periods"));

        let err: ValidationError = ConstructionError::empty("charging_periods").into();
        assert_eq!(err.field(), Some("charging_periods"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let err = ValidationError::missing("status").within("evses[1].");
        assert_eq!(err.field(), Some("evses[1].status"));

        let err: ValidationError = ConstructionError::empty("dimensions").into();
        assert_eq!(
            err.within("charging_periods[0].").field(),
            Some("charging_periods[0].dimensions")
        );

        let err = ValidationError::NotAnObject {
            context: "Evse".into(),
        };
        assert_eq!(
            err.within("evses[0].").to_string(),
            "'evses[0]' must be a JSON object"
        );
    }

    #[test]
    fn patch_error_wraps_validation() {
        let err: PatchError = ValidationError::missing("address").into();
        assert!(err.to_string().contains("'address'"));
    }

    #[test]
    fn warnings_display_joins_findings() {
        let mut warnings = Warnings::new();
        warnings.require::<String>("address", None);
        warnings.require("city", Some(&"Jena".to_string()));
        warnings.push(ConstructionError::empty("tariff_ids"));

        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings.to_string(),
            "missing mandatory field 'address'; mandatory collection 'tariff_ids' must not be empty"
        );
        assert!(warnings.into_result().is_err());
        assert!(Warnings::new().into_result().is_ok());
    }
}

//! Merge-patch engine.
//!
//! Applies an RFC 7396 merge patch to the canonical JSON of a resource and
//! re-validates the result through the resource's parser.
//!
//! # Rules
//!
//! | Patch value | Effect on the base |
//! |-------------|--------------------|
//! | `null` | key removed |
//! | object | merged recursively (replaces a non-object base value) |
//! | scalar / array | replaces the base value wholesale |
//!
//! On top of the plain merge:
//! - identity keys (`country_code`, `party_id`, id key) are protected,
//! - `last_updated` is injected as "now" when absent and must not move
//!   backwards unless downgrades are allowed.
//!
//! Patching is all-or-nothing: the source resource is only read, and the
//! result is a new resource with a freshly computed ETag.

use crate::canonical::SerializeOptions;
use crate::error::{PatchError, ValidationError};
use crate::identity::IdentityHints;
use crate::resource::{Parseable, Serializable, LAST_UPDATED_KEY};
use crate::timestamp::Timestamp;
use serde_json::Value;

/// Knobs for a single patch application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Accept a `last_updated` older than the current one
    pub allow_downgrade: bool,
    /// Value injected when the patch carries no `last_updated`
    /// (defaults to the wall clock)
    pub now: Option<Timestamp>,
}

impl PatchOptions {
    /// Allow `last_updated` to move backwards.
    #[must_use]
    pub fn allowing_downgrade(mut self) -> Self {
        self.allow_downgrade = true;
        self
    }

    /// Pin the injected "now".
    #[must_use]
    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }
}

/// Resources that accept merge patches.
///
/// Implemented for every [`Serializable`] + [`Parseable`] resource.
pub trait Patchable: Serializable + Parseable {
    /// Patch under the resource's aggregate lock.
    ///
    /// # Errors
    ///
    /// Returns a [`PatchError`]; `self` is unchanged either way.
    fn try_patch(&self, patch: &Value, options: PatchOptions) -> Result<Self, PatchError> {
        let _guard = self.meta().lock();
        apply_merge_patch(self, patch, options)
    }
}

impl<T: Serializable + Parseable> Patchable for T {}

/// Apply `patch` to `resource` and return the patched copy.
///
/// Does not take the aggregate lock; use [`Patchable::try_patch`] unless
/// the caller already holds it.
///
/// # Errors
///
/// - [`PatchError::InvalidPatch`] if the patch is not an object or removes
///   `last_updated`
/// - [`PatchError::ProtectedField`] if an identity key is present
/// - [`PatchError::StaleLastUpdated`] if `last_updated` moves backwards
///   without permission
/// - [`PatchError::Validation`] if the merged document does not parse
pub fn apply_merge_patch<T>(
    resource: &T,
    patch: &Value,
    options: PatchOptions,
) -> Result<T, PatchError>
where
    T: Serializable + Parseable,
{
    let result = merge_and_parse(resource, patch, options);
    match &result {
        Ok(patched) => tracing::debug!(
            kind = T::KIND,
            id = %resource.identity().id,
            old_etag = %resource.etag(),
            new_etag = %patched.etag(),
            "Applied merge patch"
        ),
        Err(err) => tracing::warn!(
            kind = T::KIND,
            id = %resource.identity().id,
            error = %err,
            "Rejected merge patch"
        ),
    }
    result
}

fn merge_and_parse<T>(resource: &T, patch: &Value, options: PatchOptions) -> Result<T, PatchError>
where
    T: Serializable + Parseable,
{
    let Value::Object(patch_object) = patch else {
        return Err(PatchError::InvalidPatch {
            message: "a merge patch must be a JSON object".to_string(),
        });
    };

    if let Some(key) = T::protected_keys()
        .into_iter()
        .find(|key| patch_object.contains_key(*key))
    {
        return Err(PatchError::ProtectedField {
            key: key.to_string(),
        });
    }

    let mut patch_object = patch_object.clone();
    match patch_object.get(LAST_UPDATED_KEY) {
        None => {
            let now = options.now.unwrap_or_else(Timestamp::now);
            patch_object.insert(LAST_UPDATED_KEY.to_string(), Value::String(now.to_wire()));
        }
        Some(Value::Null) => {
            return Err(PatchError::InvalidPatch {
                message: format!("'{LAST_UPDATED_KEY}' cannot be removed"),
            });
        }
        Some(value) => {
            let requested = value
                .as_str()
                .ok_or_else(|| ValidationError::invalid(LAST_UPDATED_KEY, "expected a string"))?
                .parse::<Timestamp>()
                .map_err(|e| ValidationError::invalid(LAST_UPDATED_KEY, e.to_string()))?;
            let current = resource.meta().last_updated();
            if requested < current && !options.allow_downgrade {
                return Err(PatchError::StaleLastUpdated {
                    current: current.to_wire(),
                    requested: requested.to_wire(),
                });
            }
        }
    }

    let mut document = Value::Object(resource.to_json(SerializeOptions::ALL));
    json_patch::merge(&mut document, &Value::Object(patch_object));

    // Party and id are protected and therefore unchanged; the version may
    // legitimately be patched, so it is not hinted.
    let identity = resource.identity();
    let hints = IdentityHints {
        party_id: Some(identity.party_id.clone()),
        id: Some(identity.id.clone()),
        version: None,
    };
    Ok(T::from_json(&document, &hints)?)
}

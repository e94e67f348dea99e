//! The versioned resource shape and its capability traits.
//!
//! Every concrete entity embeds a [`ResourceMeta`] (identity, timestamps,
//! vendor extensions, cached ETag, aggregate lock) and implements
//! [`Resource`], [`Serializable`] and [`Parseable`]. Hashing and patching are
//! then provided by blanket implementations of [`Hashable`] and
//! [`crate::patch::Patchable`].

use crate::canonical::{JsonWriter, SerializeOptions};
use crate::error::{ConstructionError, ValidationError};
use crate::hash::{canonical_text, ETag};
use crate::identity::{
    reconcile, validate_id, IdentityHints, PartyId, ResourceIdentity, COUNTRY_CODE_KEY,
    PARTY_ID_KEY, VERSION_KEY,
};
use crate::parse::{parse_text, JsonReader};
use crate::timestamp::Timestamp;
use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Wire key of the creation timestamp.
pub const CREATED_KEY: &str = "created";

/// Wire key of the last modification timestamp.
pub const LAST_UPDATED_KEY: &str = "last_updated";

/// Wire key of the vendor extension object.
pub const CUSTOM_DATA_KEY: &str = "custom_data";

/// Hook applied to a freshly parsed resource, e.g. to inject vendor data.
///
/// Receives the raw JSON and the parsed value and returns the value to hand
/// back to the caller.
pub type CustomParser<T> = dyn Fn(&Value, T) -> T + Send + Sync;

/// Fields shared by every resource.
pub struct ResourceMeta {
    identity: ResourceIdentity,
    created: Timestamp,
    last_updated: Timestamp,
    custom_data: Map<String, Value>,
    etag: ETag,
    lock: Mutex<()>,
}

impl ResourceMeta {
    /// Create the shared fields, defaulting the timestamps from each other.
    #[must_use]
    pub fn new(
        identity: ResourceIdentity,
        created: Option<Timestamp>,
        last_updated: Option<Timestamp>,
    ) -> Self {
        let (created, last_updated) = Timestamp::resolve_pair(created, last_updated);
        Self {
            identity,
            created,
            last_updated,
            custom_data: Map::new(),
            etag: ETag::of_bytes(&[]),
            lock: Mutex::new(()),
        }
    }

    /// Attach vendor extension data.
    #[must_use]
    pub fn with_custom_data(mut self, custom_data: Map<String, Value>) -> Self {
        self.custom_data = custom_data;
        self
    }

    /// Identity tuple.
    #[must_use]
    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// Creation time.
    #[must_use]
    pub fn created(&self) -> Timestamp {
        self.created
    }

    /// Last modification time.
    #[must_use]
    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    /// Vendor extension data; empty when none was supplied.
    #[must_use]
    pub fn custom_data(&self) -> &Map<String, Value> {
        &self.custom_data
    }

    /// Content hash sealed by the owning constructor.
    #[must_use]
    pub(crate) fn sealed_etag(&self) -> &ETag {
        &self.etag
    }

    /// Store the content hash computed by the owning constructor.
    ///
    /// Only constructors hold a mutable `ResourceMeta`; a constructed
    /// resource hands out shared references exclusively.
    pub fn seal(&mut self, etag: ETag) {
        self.etag = etag;
    }

    /// Take the per-aggregate lock that serializes patches and registry
    /// mutations of the owning resource.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Check the invariants every constructor relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::InvalidValue`] naming `id_key` if the id
    /// is empty or too long.
    pub fn check(&self, id_key: &str) -> Result<(), ConstructionError> {
        validate_id(id_key, &self.identity.id)
    }

    /// Emit `country_code`, `party_id`, the id key and `version`.
    pub fn write_identity(&self, writer: &mut JsonWriter, id_key: &str, options: SerializeOptions) {
        let party = &self.identity.party_id;
        writer
            .field_if(
                options.include_owner_information,
                COUNTRY_CODE_KEY,
                party.country_code(),
            )
            .field_if(options.include_owner_information, PARTY_ID_KEY, party.party())
            .field(id_key, self.identity.id.as_str())
            .field_if(
                options.include_version_information,
                VERSION_KEY,
                self.identity.version,
            );
    }

    /// Emit `custom_data`, `created` and `last_updated`.
    pub fn write_trailer(&self, writer: &mut JsonWriter, options: SerializeOptions) {
        if options.include_extensions && !self.custom_data.is_empty() {
            writer.free_form(CUSTOM_DATA_KEY, &self.custom_data);
        }
        if options.include_created_timestamp {
            writer.timestamp(CREATED_KEY, self.created);
        }
        writer.timestamp(LAST_UPDATED_KEY, self.last_updated);
    }

    /// Read the shared fields, reconciling identity with `hints`.
    ///
    /// # Errors
    ///
    /// Fails on identity mismatch, missing identity or malformed values.
    pub fn read(
        reader: &JsonReader<'_>,
        id_key: &str,
        hints: &IdentityHints,
    ) -> Result<Self, ValidationError> {
        let body_party = match (
            reader.optional_string(COUNTRY_CODE_KEY)?,
            reader.optional_string(PARTY_ID_KEY)?,
        ) {
            (Some(country), Some(party)) => Some(PartyId::new(&country, &party)?),
            (None, None) => None,
            (Some(_), None) => return Err(ValidationError::missing(PARTY_ID_KEY)),
            (None, Some(_)) => return Err(ValidationError::missing(COUNTRY_CODE_KEY)),
        };
        let party_id = reconcile(PARTY_ID_KEY, hints.party_id.as_ref(), body_party)?;
        let id = reconcile(id_key, hints.id.as_ref(), reader.optional_string(id_key)?)?;
        let version = reconcile(
            VERSION_KEY,
            hints.version.as_ref(),
            reader.optional_u64(VERSION_KEY)?,
        )?;

        let meta = Self::new(
            ResourceIdentity::new(party_id, id, version),
            reader.optional_timestamp(CREATED_KEY)?,
            reader.optional_timestamp(LAST_UPDATED_KEY)?,
        );
        Ok(match reader.optional_object(CUSTOM_DATA_KEY)? {
            Some(custom_data) => meta.with_custom_data(custom_data),
            None => meta,
        })
    }
}

impl Clone for ResourceMeta {
    /// Clones get their own lock.
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            created: self.created,
            last_updated: self.last_updated,
            custom_data: self.custom_data.clone(),
            etag: self.etag.clone(),
            lock: Mutex::new(()),
        }
    }
}

impl fmt::Debug for ResourceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMeta")
            .field("identity", &self.identity)
            .field("created", &self.created)
            .field("last_updated", &self.last_updated)
            .field("custom_data", &self.custom_data)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// A versioned, party-issued resource.
pub trait Resource {
    /// Human readable type name used in errors and logs.
    const KIND: &'static str;
    /// Wire key of the resource id (`id` or `uid`).
    const ID_KEY: &'static str;

    /// Shared fields.
    fn meta(&self) -> &ResourceMeta;

    /// Identity tuple.
    fn identity(&self) -> &ResourceIdentity {
        self.meta().identity()
    }

    /// Content hash of the current canonical JSON.
    ///
    /// Immutable resources return the hash sealed at construction.
    /// Resources whose registries can change after construction override
    /// this to hash their live content.
    fn etag(&self) -> ETag {
        self.meta().sealed_etag().clone()
    }

    /// Top-level keys a merge patch may never touch.
    fn protected_keys() -> [&'static str; 3] {
        [COUNTRY_CODE_KEY, PARTY_ID_KEY, Self::ID_KEY]
    }
}

/// Resources with a canonical JSON form.
pub trait Serializable: Resource {
    /// Emit the resource in its fixed key order.
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value>;

    /// Compact JSON text of [`Serializable::to_json`].
    fn to_json_text(&self, options: SerializeOptions) -> String {
        canonical_text(&self.to_json(options))
    }
}

/// Resources that can be rebuilt from untrusted JSON.
pub trait Parseable: Resource + Sized {
    /// Validate `json` and construct the resource.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError>;

    /// [`Parseable::from_json`] followed by an optional custom hook, which
    /// is always the last step.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    fn parse(
        json: &Value,
        hints: &IdentityHints,
        custom: Option<&CustomParser<Self>>,
    ) -> Result<Self, ValidationError> {
        match Self::from_json(json, hints) {
            Ok(parsed) => Ok(match custom {
                Some(hook) => hook(json, parsed),
                None => parsed,
            }),
            Err(err) => {
                tracing::debug!(kind = Self::KIND, error = %err, "Rejected resource JSON");
                Err(err)
            }
        }
    }

    /// Parse JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed text or invalid content.
    fn parse_text(text: &str, hints: &IdentityHints) -> Result<Self, ValidationError> {
        Self::parse(&parse_text(text)?, hints, None)
    }
}

/// Resources whose content hash can be recomputed on demand.
pub trait Hashable {
    /// Hash of the current canonical JSON.
    fn content_hash(&self) -> ETag;
}

impl<T: Serializable> Hashable for T {
    fn content_hash(&self) -> ETag {
        ETag::of_object(&self.to_json(SerializeOptions::ALL))
    }
}

/// Total order over resources of one type.
///
/// Identity first, then `created`, `last_updated`, the content hash and
/// finally the canonical JSON text.
pub fn compare_resources<T: Serializable>(a: &T, b: &T) -> Ordering {
    let (ma, mb) = (a.meta(), b.meta());
    ma.identity()
        .cmp(mb.identity())
        .then_with(|| ma.created().cmp(&mb.created()))
        .then_with(|| ma.last_updated().cmp(&mb.last_updated()))
        .then_with(|| a.etag().cmp(&b.etag()))
        .then_with(|| {
            a.to_json_text(SerializeOptions::ALL)
                .cmp(&b.to_json_text(SerializeOptions::ALL))
        })
}

/// Implement `PartialEq`, `Eq`, `PartialOrd`, `Ord` and `Hash` for a
/// resource type in terms of [`compare_resources`] and its ETag.
#[macro_export]
macro_rules! impl_resource_ordering {
    ($ty:ty) => {
        impl ::std::cmp::PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::resource::compare_resources(self, other) == ::std::cmp::Ordering::Equal
            }
        }

        impl ::std::cmp::Eq for $ty {}

        impl ::std::cmp::PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<::std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl ::std::cmp::Ord for $ty {
            fn cmp(&self, other: &Self) -> ::std::cmp::Ordering {
                $crate::resource::compare_resources(self, other)
            }
        }

        impl ::std::hash::Hash for $ty {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                ::std::hash::Hash::hash(&$crate::resource::Resource::etag(self), state);
            }
        }
    };
}

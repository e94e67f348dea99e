//! Builder / immutable duality.
//!
//! A builder is a mutable field accumulator. Converting it validates the
//! same mandatory fields as the parser, but reports problems as
//! [`Warnings`] instead of failing hard, and only then invokes the
//! resource constructor (which computes the ETag).

use crate::error::Warnings;
use crate::identity::{PartyId, ResourceIdentity, PARTY_ID_KEY, VERSION_KEY};
use crate::resource::ResourceMeta;
use crate::timestamp::Timestamp;
use serde_json::{Map, Value};

/// Mutable accumulator that converts into an immutable resource.
pub trait Builder {
    /// The resource produced on success.
    type Output;

    /// Validate and construct.
    ///
    /// # Errors
    ///
    /// Returns a non-empty [`Warnings`] list; no value is produced then.
    fn to_immutable(&self) -> Result<Self::Output, Warnings>;

    /// Convenience conversion that only succeeds without warnings.
    ///
    /// Use [`Builder::to_immutable`] to find out what is missing.
    fn build(&self) -> Option<Self::Output> {
        self.to_immutable().ok()
    }
}

/// Resources that can be turned back into a builder.
pub trait ToBuilder {
    /// Builder type, pre-filled with every field of the resource.
    type Builder: Builder;

    /// Copy all fields into a fresh builder.
    fn to_builder(&self) -> Self::Builder;
}

/// Mutable counterpart of [`ResourceMeta`], embedded in every builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaBuilder {
    /// Issuing party
    pub party_id: Option<PartyId>,
    /// Resource id
    pub id: Option<String>,
    /// Version id
    pub version: Option<u64>,
    /// Creation time; defaults from `last_updated`
    pub created: Option<Timestamp>,
    /// Last modification time; defaults from `created`
    pub last_updated: Option<Timestamp>,
    /// Vendor extension data
    pub custom_data: Map<String, Value>,
}

impl MetaBuilder {
    /// Start from an identity.
    #[must_use]
    pub fn with_identity(identity: ResourceIdentity) -> Self {
        Self {
            party_id: Some(identity.party_id),
            id: Some(identity.id),
            version: Some(identity.version),
            ..Self::default()
        }
    }

    /// Copy every field of an existing resource header.
    #[must_use]
    pub fn from_meta(meta: &ResourceMeta) -> Self {
        Self {
            created: Some(meta.created()),
            last_updated: Some(meta.last_updated()),
            custom_data: meta.custom_data().clone(),
            ..Self::with_identity(meta.identity().clone())
        }
    }

    /// Produce the resource header, recording a warning for each missing
    /// identity field. `id_key` is the wire name of the id.
    pub fn build(&self, id_key: &str, warnings: &mut Warnings) -> Option<ResourceMeta> {
        warnings.require(PARTY_ID_KEY, self.party_id.as_ref());
        warnings.require(id_key, self.id.as_ref());
        warnings.require(VERSION_KEY, self.version.as_ref());

        let (Some(party_id), Some(id), Some(version)) =
            (self.party_id.clone(), self.id.clone(), self.version)
        else {
            return None;
        };
        Some(
            ResourceMeta::new(
                ResourceIdentity::new(party_id, id, version),
                self.created,
                self.last_updated,
            )
            .with_custom_data(self.custom_data.clone()),
        )
    }
}

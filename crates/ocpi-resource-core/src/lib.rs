//! # OCPI Resource Core
//!
//! Versioned resource engine shared by every OCPI entity type.
//!
//! This crate provides:
//! - Identity and version model (`(PartyId, ResourceId, VersionId)` plus
//!   created/last-updated timestamps)
//! - Canonical JSON serialization with a fixed per-type key order
//! - Content hashing (ETag) over the canonical form
//! - Validating parser helpers with transport identity reconciliation
//! - Merge-patch engine with protected keys and `last_updated` monotonicity
//! - Builder / immutable duality
//! - Thread-safe containment registries for parent-owned children

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod canonical;
pub mod error;
pub mod hash;
pub mod identity;
pub mod parse;
pub mod patch;
pub mod registry;
pub mod resource;
pub mod timestamp;

pub use builder::{Builder, MetaBuilder, ToBuilder};
pub use canonical::{dedup_ordered, JsonWriter, SerializeOptions};
pub use error::{ConstructionError, PatchError, ValidationError, Warnings};
pub use hash::ETag;
pub use identity::{IdentityHints, PartyId, ResourceIdentity};
pub use parse::JsonReader;
pub use patch::{PatchOptions, Patchable};
pub use registry::{Child, ParentRef, ParentSlot, Registry};
pub use resource::{
    compare_resources, CustomParser, Hashable, Parseable, Resource, ResourceMeta, Serializable,
};
pub use timestamp::Timestamp;

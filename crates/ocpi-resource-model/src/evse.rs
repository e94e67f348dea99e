//! EVSE: one chargeable unit owned by a charging station.

use crate::vocabulary::{Capability, EvseStatus};
use indexmap::IndexSet;
use ocpi_resource_core::{
    impl_resource_ordering, Builder, Child, ConstructionError, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, ParentSlot, Parseable, Resource, ResourceMeta,
    SerializeOptions, Serializable, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};

const EVSE_ID_KEY: &str = "evse_id";
const STATUS_KEY: &str = "status";
const CAPABILITIES_KEY: &str = "capabilities";
const FLOOR_LEVEL_KEY: &str = "floor_level";
const PHYSICAL_REFERENCE_KEY: &str = "physical_reference";

/// Electric Vehicle Supply Equipment.
#[derive(Debug, Clone)]
pub struct Evse {
    meta: ResourceMeta,
    evse_id: Option<String>,
    status: EvseStatus,
    capabilities: IndexSet<Capability>,
    floor_level: Option<String>,
    physical_reference: Option<String>,
    parent: ParentSlot,
}

impl Evse {
    /// Create an EVSE and compute its ETag.
    ///
    /// # Errors
    ///
    /// Fails if the uid is empty or too long.
    pub fn new(
        meta: ResourceMeta,
        evse_id: Option<String>,
        status: EvseStatus,
        capabilities: impl IntoIterator<Item = Capability>,
        floor_level: Option<String>,
        physical_reference: Option<String>,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let mut evse = Self {
            meta,
            evse_id,
            status,
            capabilities: capabilities.into_iter().collect(),
            floor_level,
            physical_reference,
            parent: ParentSlot::new(),
        };
        let etag = evse.content_hash();
        evse.meta.seal(etag);
        Ok(evse)
    }

    /// Unique id within the owning charging station.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.meta.identity().id
    }

    /// eMI3 EVSE id.
    #[must_use]
    pub fn evse_id(&self) -> Option<&str> {
        self.evse_id.as_deref()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> EvseStatus {
        self.status
    }

    /// Capabilities, in first-seen order.
    #[must_use]
    pub fn capabilities(&self) -> &IndexSet<Capability> {
        &self.capabilities
    }

    /// Floor level.
    #[must_use]
    pub fn floor_level(&self) -> Option<&str> {
        self.floor_level.as_deref()
    }

    /// Visible number or label.
    #[must_use]
    pub fn physical_reference(&self) -> Option<&str> {
        self.physical_reference.as_deref()
    }
}

impl Resource for Evse {
    const KIND: &'static str = "EVSE";
    const ID_KEY: &'static str = "uid";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl Serializable for Evse {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .optional(EVSE_ID_KEY, self.evse_id.as_deref())
            .field(STATUS_KEY, self.status)
            .optional_array(CAPABILITIES_KEY, self.capabilities.iter().copied())
            .optional(FLOOR_LEVEL_KEY, self.floor_level.as_deref())
            .optional(PHYSICAL_REFERENCE_KEY, self.physical_reference.as_deref());
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for Evse {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        Ok(Self::new(
            meta,
            reader.optional_string(EVSE_ID_KEY)?,
            reader.token(STATUS_KEY)?,
            reader.token_set::<Capability>(CAPABILITIES_KEY)?,
            reader.optional_string(FLOOR_LEVEL_KEY)?,
            reader.optional_string(PHYSICAL_REFERENCE_KEY)?,
        )?)
    }
}

impl Child for Evse {
    fn key(&self) -> &str {
        self.uid()
    }

    fn parent_slot(&self) -> &ParentSlot {
        &self.parent
    }
}

impl_resource_ordering!(Evse);

/// Mutable accumulator for [`Evse`].
#[derive(Debug, Clone, Default)]
pub struct EvseBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// eMI3 EVSE id
    pub evse_id: Option<String>,
    /// Current status
    pub status: Option<EvseStatus>,
    /// Capabilities
    pub capabilities: IndexSet<Capability>,
    /// Floor level
    pub floor_level: Option<String>,
    /// Visible number or label
    pub physical_reference: Option<String>,
}

impl Builder for EvseBuilder {
    type Output = Evse;

    fn to_immutable(&self) -> Result<Evse, Warnings> {
        let mut warnings = Warnings::new();
        let meta = self.meta.build(Evse::ID_KEY, &mut warnings);
        warnings.require(STATUS_KEY, self.status.as_ref());

        let (Some(meta), Some(status)) = (meta, self.status) else {
            return Err(warnings);
        };
        Ok(Evse::new(
            meta,
            self.evse_id.clone(),
            status,
            self.capabilities.iter().copied(),
            self.floor_level.clone(),
            self.physical_reference.clone(),
        )?)
    }
}

impl ToBuilder for Evse {
    type Builder = EvseBuilder;

    fn to_builder(&self) -> EvseBuilder {
        EvseBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            evse_id: self.evse_id.clone(),
            status: Some(self.status),
            capabilities: self.capabilities.clone(),
            floor_level: self.floor_level.clone(),
            physical_reference: self.physical_reference.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocpi_resource_core::{PartyId, ResourceIdentity, Timestamp};
    use serde_json::json;

    fn meta(uid: &str) -> ResourceMeta {
        let t: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        ResourceMeta::new(
            ResourceIdentity::new(PartyId::new("DE", "GEF").unwrap(), uid, 1),
            Some(t),
            None,
        )
    }

    #[test]
    fn emits_fields_in_wire_order() {
        let evse = Evse::new(
            meta("E1"),
            Some("DE*GEF*E1".into()),
            EvseStatus::Available,
            [Capability::RfidReader, Capability::Reservable, Capability::RfidReader],
            None,
            Some("1".into()),
        )
        .unwrap();

        let json = evse.to_json(SerializeOptions::ALL);
        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "country_code",
                "party_id",
                "uid",
                "version",
                "evse_id",
                "status",
                "capabilities",
                "physical_reference",
                "created",
                "last_updated"
            ]
        );
        assert_eq!(json["capabilities"], json!(["RFID_READER", "RESERVABLE"]));
    }

    #[test]
    fn status_is_mandatory() {
        let value = json!({"country_code": "DE", "party_id": "GEF", "uid": "E1", "version": 1});
        let err = Evse::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err, ValidationError::missing("status"));
    }

    #[test]
    fn builder_reports_every_missing_field() {
        let builder = EvseBuilder::default();
        let warnings = builder.to_immutable().unwrap_err();
        let fields: Vec<_> = warnings.iter().filter_map(ValidationError::field).collect();
        assert_eq!(fields, ["party_id", "uid", "version", "status"]);
        assert!(builder.build().is_none());
    }

    #[test]
    fn overlong_uid_is_rejected() {
        let err = Evse::new(meta(&"E".repeat(37)), None, EvseStatus::Unknown, Vec::new(), None, None)
            .unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidValue { ref field, .. } if field == "uid"));
    }
}

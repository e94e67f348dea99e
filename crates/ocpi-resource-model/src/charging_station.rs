//! Charging stations and the EVSEs they own.

use crate::evse::Evse;
use crate::fields;
use crate::vocabulary::Capability;
use indexmap::{IndexMap, IndexSet};
use ocpi_resource_core::{
    impl_resource_ordering, Builder, Child, ConstructionError, ETag, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, ParentRef, ParentSlot, Parseable, Registry, Resource,
    ResourceMeta, SerializeOptions, Serializable, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};
use std::sync::Arc;

const CAPABILITIES_KEY: &str = "capabilities";
const FLOOR_LEVEL_KEY: &str = "floor_level";
const PHYSICAL_REFERENCE_KEY: &str = "physical_reference";
const EVSES_KEY: &str = "evses";

/// A physical charging station, owning its EVSEs.
#[derive(Debug, Clone)]
pub struct ChargingStation {
    meta: ResourceMeta,
    capabilities: IndexSet<Capability>,
    floor_level: Option<String>,
    physical_reference: Option<String>,
    evses: Registry<Evse>,
    parent: ParentSlot,
}

impl ChargingStation {
    /// Create a station and take ownership of `evses`.
    ///
    /// # Errors
    ///
    /// Fails if the uid is invalid or two EVSEs share a uid.
    pub fn new(
        meta: ResourceMeta,
        capabilities: impl IntoIterator<Item = Capability>,
        floor_level: Option<String>,
        physical_reference: Option<String>,
        evses: impl IntoIterator<Item = Evse>,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let evses = Registry::with_children(parent_ref(&meta), EVSES_KEY, evses)?;
        let station = Self {
            meta,
            capabilities: capabilities.into_iter().collect(),
            floor_level,
            physical_reference,
            evses,
            parent: ParentSlot::new(),
        };
        Ok(station)
    }

    /// Unique id within the owning location.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.meta.identity().id
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

    /// Current EVSEs, ordered by uid.
    #[must_use]
    pub fn evses(&self) -> Vec<Arc<Evse>> {
        self.evses.values()
    }

    /// Look up an EVSE.
    #[must_use]
    pub fn evse(&self, uid: &str) -> Option<Arc<Evse>> {
        self.evses.try_get(uid)
    }

    /// `true` if an EVSE with `uid` is present.
    #[must_use]
    pub fn has_evse(&self, uid: &str) -> bool {
        self.evses.exists(uid)
    }

    /// Add an EVSE unless its uid is taken.
    pub fn try_add_evse(&self, evse: Evse) -> bool {
        let _guard = self.meta.lock();
        self.evses.try_add(evse)
    }

    /// Remove an EVSE.
    pub fn remove_evse(&self, uid: &str) -> Option<Arc<Evse>> {
        let _guard = self.meta.lock();
        self.evses.remove(uid)
    }

    /// Replace the EVSE with the same uid and return the previous one.
    pub fn update_evse(&self, evse: Evse) -> Option<Arc<Evse>> {
        let _guard = self.meta.lock();
        self.evses.update_child(evse)
    }
}

fn parent_ref(meta: &ResourceMeta) -> ParentRef {
    let identity = meta.identity();
    ParentRef::new(
        ChargingStation::KIND,
        identity.party_id.clone(),
        identity.id.clone(),
    )
}

impl Resource for ChargingStation {
    const KIND: &'static str = "ChargingStation";
    const ID_KEY: &'static str = "uid";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    /// Hash of the current content, registries included.
    fn etag(&self) -> ETag {
        self.content_hash()
    }
}

impl Serializable for ChargingStation {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .optional_array(CAPABILITIES_KEY, self.capabilities.iter().copied())
            .optional(FLOOR_LEVEL_KEY, self.floor_level.as_deref())
            .optional(PHYSICAL_REFERENCE_KEY, self.physical_reference.as_deref())
            .optional_array(EVSES_KEY, fields::embedded(&self.evses.values(), options));
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for ChargingStation {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        let evses: Vec<Evse> =
            fields::read_children(&reader, EVSES_KEY, &meta.identity().party_id)?;
        Ok(Self::new(
            meta,
            reader.token_set::<Capability>(CAPABILITIES_KEY)?,
            reader.optional_string(FLOOR_LEVEL_KEY)?,
            reader.optional_string(PHYSICAL_REFERENCE_KEY)?,
            evses,
        )?)
    }
}

impl Child for ChargingStation {
    fn key(&self) -> &str {
        self.uid()
    }

    fn parent_slot(&self) -> &ParentSlot {
        &self.parent
    }
}

impl_resource_ordering!(ChargingStation);

/// Mutable accumulator for [`ChargingStation`].
#[derive(Debug, Clone, Default)]
pub struct ChargingStationBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Capabilities
    pub capabilities: IndexSet<Capability>,
    /// Floor level
    pub floor_level: Option<String>,
    /// Visible number or label
    pub physical_reference: Option<String>,
    evses: IndexMap<String, Evse>,
}

impl ChargingStationBuilder {
    /// Add an EVSE unless its uid is taken.
    ///
    /// The EVSE is attached to this station right away when the station's
    /// party and uid are already set.
    pub fn add_evse(&mut self, evse: Evse) -> bool {
        if self.evses.contains_key(evse.uid()) {
            return false;
        }
        if let (Some(party_id), Some(uid)) = (&self.meta.party_id, &self.meta.id) {
            evse.attach(ParentRef::new(
                ChargingStation::KIND,
                party_id.clone(),
                uid.clone(),
            ));
        }
        self.evses.insert(evse.uid().to_string(), evse);
        true
    }

    /// Drop an EVSE.
    pub fn remove_evse(&mut self, uid: &str) -> Option<Evse> {
        self.evses.shift_remove(uid)
    }

    /// EVSEs added so far, in insertion order.
    pub fn evses(&self) -> impl Iterator<Item = &Evse> {
        self.evses.values()
    }
}

impl Builder for ChargingStationBuilder {
    type Output = ChargingStation;

    fn to_immutable(&self) -> Result<ChargingStation, Warnings> {
        let mut warnings = Warnings::new();
        let Some(meta) = self.meta.build(ChargingStation::ID_KEY, &mut warnings) else {
            return Err(warnings);
        };
        Ok(ChargingStation::new(
            meta,
            self.capabilities.iter().copied(),
            self.floor_level.clone(),
            self.physical_reference.clone(),
            self.evses.values().cloned(),
        )?)
    }
}

impl ToBuilder for ChargingStation {
    type Builder = ChargingStationBuilder;

    fn to_builder(&self) -> ChargingStationBuilder {
        ChargingStationBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            capabilities: self.capabilities.clone(),
            floor_level: self.floor_level.clone(),
            physical_reference: self.physical_reference.clone(),
            evses: self
                .evses
                .values()
                .into_iter()
                .map(|evse| (evse.uid().to_string(), Evse::clone(&evse)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::EvseStatus;
    use ocpi_resource_core::{PartyId, ResourceIdentity, Timestamp};
    use serde_json::json;

    fn gef() -> PartyId {
        PartyId::new("DE", "GEF").unwrap()
    }

    fn meta(id: &str) -> ResourceMeta {
        let t: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        ResourceMeta::new(ResourceIdentity::new(gef(), id, 1), Some(t), None)
    }

    fn evse(uid: &str, status: EvseStatus) -> Evse {
        Evse::new(meta(uid), None, status, Vec::new(), None, None).unwrap()
    }

    #[test]
    fn evses_are_embedded_without_owner() {
        let station = ChargingStation::new(
            meta("CS1"),
            [Capability::RfidReader],
            None,
            None,
            [evse("E2", EvseStatus::Charging), evse("E1", EvseStatus::Available)],
        )
        .unwrap();

        let json = station.to_json(SerializeOptions::ALL);
        assert_eq!(json["country_code"], json!("DE"));
        let evses = json["evses"].as_array().unwrap();
        assert_eq!(evses[0]["uid"], json!("E1"));
        assert!(evses[0].get("party_id").is_none());

        let parsed = ChargingStation::from_json(&Value::Object(json), &IdentityHints::none())
            .unwrap();
        assert_eq!(parsed, station);
        assert_eq!(parsed.evse("E2").unwrap().parent().unwrap().id, "CS1");
    }

    #[test]
    fn duplicate_evses_fail_construction() {
        let err = ChargingStation::new(
            meta("CS1"),
            Vec::new(),
            None,
            None,
            [evse("E1", EvseStatus::Available), evse("E1", EvseStatus::Blocked)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateChild {
                field: "evses".into(),
                key: "E1".into()
            }
        );
    }

    #[test]
    fn child_errors_name_their_position() {
        let value = json!({
            "country_code": "DE", "party_id": "GEF", "uid": "CS1", "version": 1,
            "evses": [{"uid": "E1", "version": 1, "status": "AVAILABLE"}, {"uid": "E2", "version": 1}]
        });
        let err = ChargingStation::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err.field(), Some("evses[1].status"));
    }

    #[test]
    fn builder_attaches_evses_eagerly() {
        let mut builder = ChargingStationBuilder {
            meta: MetaBuilder::with_identity(ResourceIdentity::new(gef(), "CS1", 1)),
            ..ChargingStationBuilder::default()
        };
        assert!(builder.add_evse(evse("E1", EvseStatus::Available)));
        assert!(!builder.add_evse(evse("E1", EvseStatus::Blocked)));

        let attached = builder.evses().next().unwrap();
        assert_eq!(attached.parent().unwrap().kind, "ChargingStation");

        let station = builder.build().unwrap();
        assert_eq!(station.evses().len(), 1);
        assert_eq!(station.evse("E1").unwrap().status(), EvseStatus::Available);
    }

    #[test]
    fn re_id_before_build_reattaches_evses() {
        let mut builder = ChargingStationBuilder {
            meta: MetaBuilder::with_identity(ResourceIdentity::new(gef(), "CS1", 1)),
            ..ChargingStationBuilder::default()
        };
        builder.add_evse(evse("E1", EvseStatus::Available));
        builder.meta.id = Some("CS9".into());

        let station = builder.build().unwrap();
        assert_eq!(station.evse("E1").unwrap().parent().unwrap().id, "CS9");
    }

    #[test]
    fn evse_changes_show_in_etag() {
        let station =
            ChargingStation::new(meta("CS1"), Vec::new(), None, None, Vec::new()).unwrap();
        let empty = station.etag();

        assert!(station.try_add_evse(evse("E1", EvseStatus::Available)));
        assert_ne!(station.etag(), empty);
        station.update_evse(evse("E1", EvseStatus::Charging));
        assert_eq!(station.etag(), station.content_hash());
        assert_eq!(
            ChargingStation::parse_text(
                &station.to_json_text(SerializeOptions::ALL),
                &IdentityHints::none()
            )
            .unwrap(),
            station
        );
    }
}

//! Locations: the root aggregate of the charging infrastructure.
//!
//! A location exclusively owns its charging stations and energy meters.
//! Both collections live in [`Registry`] instances that share the
//! location's aggregate lock with [`ocpi_resource_core::Patchable::try_patch`]:
//! the typed `try_add_*` / `remove_*` / `update_*` wrappers take it, the
//! read accessors do not.

use crate::charging_station::ChargingStation;
use crate::energy_meter::EnergyMeter;
use crate::fields;
use crate::geo::GeoCoordinates;
use crate::vocabulary::Facility;
use indexmap::{IndexMap, IndexSet};
use ocpi_resource_core::{
    impl_resource_ordering, Builder, Child, ConstructionError, ETag, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, ParentRef, Parseable, Registry, Resource, ResourceMeta,
    SerializeOptions, Serializable, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};
use std::sync::Arc;

const PUBLISH_KEY: &str = "publish";
const NAME_KEY: &str = "name";
const ADDRESS_KEY: &str = "address";
const CITY_KEY: &str = "city";
const POSTAL_CODE_KEY: &str = "postal_code";
const STATE_KEY: &str = "state";
const COUNTRY_KEY: &str = "country";
const COORDINATES_KEY: &str = "coordinates";
const TIME_ZONE_KEY: &str = "time_zone";
const FACILITIES_KEY: &str = "facilities";
const CHARGING_STATIONS_KEY: &str = "charging_stations";
const ENERGY_METERS_KEY: &str = "energy_meters";

/// Postal address of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Street and number
    pub address: String,
    /// City or town
    pub city: String,
    /// Postal code
    pub postal_code: Option<String>,
    /// State or province
    pub state: Option<String>,
    /// ISO 3166-1 alpha-3 country code
    pub country: String,
}

/// A charging site.
#[derive(Debug, Clone)]
pub struct Location {
    meta: ResourceMeta,
    publish: bool,
    name: Option<String>,
    address: Address,
    coordinates: GeoCoordinates,
    time_zone: String,
    facilities: IndexSet<Facility>,
    charging_stations: Registry<ChargingStation>,
    energy_meters: Registry<EnergyMeter>,
}

impl Location {
    /// Create a location and take ownership of its children.
    ///
    /// # Errors
    ///
    /// Fails if the id or country code is invalid, the time zone is empty,
    /// or two children of one kind share a key.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: ResourceMeta,
        publish: bool,
        name: Option<String>,
        address: Address,
        coordinates: GeoCoordinates,
        time_zone: String,
        facilities: impl IntoIterator<Item = Facility>,
        charging_stations: impl IntoIterator<Item = ChargingStation>,
        energy_meters: impl IntoIterator<Item = EnergyMeter>,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let address = Address {
            country: fields::country(COUNTRY_KEY, address.country)?,
            ..address
        };
        if time_zone.is_empty() {
            return Err(ConstructionError::missing(TIME_ZONE_KEY));
        }

        let parent = parent_ref(&meta);
        let charging_stations =
            Registry::with_children(parent.clone(), CHARGING_STATIONS_KEY, charging_stations)?;
        let energy_meters = Registry::with_children(parent, ENERGY_METERS_KEY, energy_meters)?;

        let location = Self {
            meta,
            publish,
            name,
            address,
            coordinates,
            time_zone,
            facilities: facilities.into_iter().collect(),
            charging_stations,
            energy_meters,
        };
        Ok(location)
    }

    /// Location id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.identity().id
    }

    /// Whether the location may be published to drivers.
    #[must_use]
    pub fn publish(&self) -> bool {
        self.publish
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Postal address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Coordinates.
    #[must_use]
    pub fn coordinates(&self) -> GeoCoordinates {
        self.coordinates
    }

    /// IANA time zone name.
    #[must_use]
    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    /// Nearby facilities, in first-seen order.
    #[must_use]
    pub fn facilities(&self) -> &IndexSet<Facility> {
        &self.facilities
    }

    /// Current charging stations, ordered by uid.
    #[must_use]
    pub fn charging_stations(&self) -> Vec<Arc<ChargingStation>> {
        self.charging_stations.values()
    }

    /// Look up a charging station.
    #[must_use]
    pub fn charging_station(&self, uid: &str) -> Option<Arc<ChargingStation>> {
        self.charging_stations.try_get(uid)
    }

    /// `true` if a charging station with `uid` is present.
    #[must_use]
    pub fn has_charging_station(&self, uid: &str) -> bool {
        self.charging_stations.exists(uid)
    }

    /// Add a charging station unless its uid is taken.
    pub fn try_add_charging_station(&self, station: ChargingStation) -> bool {
        let _guard = self.meta.lock();
        self.charging_stations.try_add(station)
    }

    /// Remove a charging station.
    pub fn remove_charging_station(&self, uid: &str) -> Option<Arc<ChargingStation>> {
        let _guard = self.meta.lock();
        self.charging_stations.remove(uid)
    }

    /// Replace the charging station with the same uid and return the
    /// previous one.
    pub fn update_charging_station(&self, station: ChargingStation) -> Option<Arc<ChargingStation>> {
        let _guard = self.meta.lock();
        self.charging_stations.update_child(station)
    }

    /// Current energy meters, ordered by id.
    #[must_use]
    pub fn energy_meters(&self) -> Vec<Arc<EnergyMeter>> {
        self.energy_meters.values()
    }

    /// Look up an energy meter.
    #[must_use]
    pub fn energy_meter(&self, id: &str) -> Option<Arc<EnergyMeter>> {
        self.energy_meters.try_get(id)
    }

    /// `true` if an energy meter with `id` is present.
    #[must_use]
    pub fn has_energy_meter(&self, id: &str) -> bool {
        self.energy_meters.exists(id)
    }

    /// Add an energy meter unless its id is taken.
    pub fn try_add_energy_meter(&self, meter: EnergyMeter) -> bool {
        let _guard = self.meta.lock();
        self.energy_meters.try_add(meter)
    }

    /// Remove an energy meter.
    pub fn remove_energy_meter(&self, id: &str) -> Option<Arc<EnergyMeter>> {
        let _guard = self.meta.lock();
        self.energy_meters.remove(id)
    }

    /// Replace the energy meter with the same id and return the previous
    /// one.
    pub fn update_energy_meter(&self, meter: EnergyMeter) -> Option<Arc<EnergyMeter>> {
        let _guard = self.meta.lock();
        self.energy_meters.update_child(meter)
    }
}

fn parent_ref(meta: &ResourceMeta) -> ParentRef {
    let identity = meta.identity();
    ParentRef::new(Location::KIND, identity.party_id.clone(), identity.id.clone())
}

impl Resource for Location {
    const KIND: &'static str = "Location";
    const ID_KEY: &'static str = "id";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    /// Hash of the current content, registries included.
    fn etag(&self) -> ETag {
        self.content_hash()
    }
}

impl Serializable for Location {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .field(PUBLISH_KEY, self.publish)
            .optional(NAME_KEY, self.name.as_deref())
            .field(ADDRESS_KEY, self.address.address.as_str())
            .field(CITY_KEY, self.address.city.as_str())
            .optional(POSTAL_CODE_KEY, self.address.postal_code.as_deref())
            .optional(STATE_KEY, self.address.state.as_deref())
            .field(COUNTRY_KEY, self.address.country.as_str())
            .object(COORDINATES_KEY, self.coordinates.to_json())
            .field(TIME_ZONE_KEY, self.time_zone.as_str())
            .optional_array(FACILITIES_KEY, self.facilities.iter().copied())
            .optional_array(
                CHARGING_STATIONS_KEY,
                fields::embedded(&self.charging_stations.values(), options),
            )
            .optional_array(
                ENERGY_METERS_KEY,
                fields::embedded(&self.energy_meters.values(), options),
            );
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for Location {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        let party_id = meta.identity().party_id.clone();

        let address = Address {
            address: reader.string(ADDRESS_KEY)?,
            city: reader.string(CITY_KEY)?,
            postal_code: reader.optional_string(POSTAL_CODE_KEY)?,
            state: reader.optional_string(STATE_KEY)?,
            country: reader.string(COUNTRY_KEY)?,
        };
        let coordinates = GeoCoordinates::read(
            reader.required(COORDINATES_KEY)?,
            &format!("{COORDINATES_KEY}."),
        )?;
        let charging_stations: Vec<ChargingStation> =
            fields::read_children(&reader, CHARGING_STATIONS_KEY, &party_id)?;
        let energy_meters: Vec<EnergyMeter> =
            fields::read_children(&reader, ENERGY_METERS_KEY, &party_id)?;

        Ok(Self::new(
            meta,
            reader.bool(PUBLISH_KEY)?,
            reader.optional_string(NAME_KEY)?,
            address,
            coordinates,
            reader.string(TIME_ZONE_KEY)?,
            reader.token_set::<Facility>(FACILITIES_KEY)?,
            charging_stations,
            energy_meters,
        )?)
    }
}

impl_resource_ordering!(Location);

/// Mutable accumulator for [`Location`].
#[derive(Debug, Clone, Default)]
pub struct LocationBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Whether the location may be published
    pub publish: Option<bool>,
    /// Display name
    pub name: Option<String>,
    /// Street and number
    pub address: Option<String>,
    /// City or town
    pub city: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// State or province
    pub state: Option<String>,
    /// ISO 3166-1 alpha-3 country code
    pub country: Option<String>,
    /// Coordinates
    pub coordinates: Option<GeoCoordinates>,
    /// IANA time zone name
    pub time_zone: Option<String>,
    /// Nearby facilities
    pub facilities: IndexSet<Facility>,
    charging_stations: IndexMap<String, ChargingStation>,
    energy_meters: IndexMap<String, EnergyMeter>,
}

impl LocationBuilder {
    fn parent(&self) -> Option<ParentRef> {
        match (&self.meta.party_id, &self.meta.id) {
            (Some(party_id), Some(id)) => {
                Some(ParentRef::new(Location::KIND, party_id.clone(), id.clone()))
            }
            _ => None,
        }
    }

    /// Add a charging station unless its uid is taken, attaching it to this
    /// location when the identity is already known.
    pub fn add_charging_station(&mut self, station: ChargingStation) -> bool {
        if self.charging_stations.contains_key(station.uid()) {
            return false;
        }
        if let Some(parent) = self.parent() {
            station.attach(parent);
        }
        self.charging_stations
            .insert(station.uid().to_string(), station);
        true
    }

    /// Drop a charging station.
    pub fn remove_charging_station(&mut self, uid: &str) -> Option<ChargingStation> {
        self.charging_stations.shift_remove(uid)
    }

    /// Charging stations added so far, in insertion order.
    pub fn charging_stations(&self) -> impl Iterator<Item = &ChargingStation> {
        self.charging_stations.values()
    }

    /// Add an energy meter unless its id is taken, attaching it to this
    /// location when the identity is already known.
    pub fn add_energy_meter(&mut self, meter: EnergyMeter) -> bool {
        if self.energy_meters.contains_key(meter.id()) {
            return false;
        }
        if let Some(parent) = self.parent() {
            meter.attach(parent);
        }
        self.energy_meters.insert(meter.id().to_string(), meter);
        true
    }

    /// Drop an energy meter.
    pub fn remove_energy_meter(&mut self, id: &str) -> Option<EnergyMeter> {
        self.energy_meters.shift_remove(id)
    }

    /// Energy meters added so far, in insertion order.
    pub fn energy_meters(&self) -> impl Iterator<Item = &EnergyMeter> {
        self.energy_meters.values()
    }
}

impl Builder for LocationBuilder {
    type Output = Location;

    fn to_immutable(&self) -> Result<Location, Warnings> {
        let mut warnings = Warnings::new();
        let meta = self.meta.build(Location::ID_KEY, &mut warnings);
        warnings.require(PUBLISH_KEY, self.publish.as_ref());
        warnings.require(ADDRESS_KEY, self.address.as_ref());
        warnings.require(CITY_KEY, self.city.as_ref());
        warnings.require(COUNTRY_KEY, self.country.as_ref());
        warnings.require(COORDINATES_KEY, self.coordinates.as_ref());
        warnings.require(TIME_ZONE_KEY, self.time_zone.as_ref());

        let (
            Some(meta),
            Some(publish),
            Some(address),
            Some(city),
            Some(country),
            Some(coordinates),
            Some(time_zone),
        ) = (
            meta,
            self.publish,
            self.address.clone(),
            self.city.clone(),
            self.country.clone(),
            self.coordinates,
            self.time_zone.clone(),
        )
        else {
            return Err(warnings);
        };

        Ok(Location::new(
            meta,
            publish,
            self.name.clone(),
            Address {
                address,
                city,
                postal_code: self.postal_code.clone(),
                state: self.state.clone(),
                country,
            },
            coordinates,
            time_zone,
            self.facilities.iter().copied(),
            self.charging_stations.values().cloned(),
            self.energy_meters.values().cloned(),
        )?)
    }
}

impl ToBuilder for Location {
    type Builder = LocationBuilder;

    fn to_builder(&self) -> LocationBuilder {
        LocationBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            publish: Some(self.publish),
            name: self.name.clone(),
            address: Some(self.address.address.clone()),
            city: Some(self.address.city.clone()),
            postal_code: self.address.postal_code.clone(),
            state: self.address.state.clone(),
            country: Some(self.address.country.clone()),
            coordinates: Some(self.coordinates),
            time_zone: Some(self.time_zone.clone()),
            facilities: self.facilities.clone(),
            charging_stations: self
                .charging_stations
                .values()
                .into_iter()
                .map(|station| (station.uid().to_string(), ChargingStation::clone(&station)))
                .collect(),
            energy_meters: self
                .energy_meters
                .values()
                .into_iter()
                .map(|meter| (meter.id().to_string(), EnergyMeter::clone(&meter)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocpi_resource_core::{PartyId, ResourceIdentity, Timestamp};
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "country_code": "DE",
            "party_id": "GEF",
            "id": "LOC1",
            "version": 3,
            "publish": true,
            "name": "Gentics HQ",
            "address": "Leutragraben 1",
            "city": "Jena",
            "postal_code": "07743",
            "country": "DEU",
            "coordinates": {"latitude": "50.927054", "longitude": "11.5892372"},
            "time_zone": "Europe/Berlin",
            "facilities": ["CAFE", "WIFI", "CAFE"],
            "charging_stations": [{
                "uid": "CS1",
                "version": 1,
                "evses": [{"uid": "E1", "version": 1, "status": "AVAILABLE"}],
                "last_updated": "2024-01-01T00:00:00Z"
            }],
            "energy_meters": [{"id": "M1", "version": 1, "model": "EM-24"}],
            "created": "2023-12-01T08:00:00Z",
            "last_updated": "2024-01-02T00:00:00Z"
        })
    }

    #[test]
    fn parses_the_full_graph() {
        let location = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        assert_eq!(location.name(), Some("Gentics HQ"));
        assert_eq!(location.address().country, "DEU");
        assert_eq!(location.facilities().len(), 2);

        let station = location.charging_station("CS1").unwrap();
        assert_eq!(station.parent().unwrap().kind, "Location");
        assert_eq!(station.identity().party_id.to_string(), "DE*GEF");
        assert_eq!(station.evse("E1").unwrap().parent().unwrap().id, "CS1");
        assert!(location.has_energy_meter("M1"));
    }

    #[test]
    fn canonical_form_is_stable() {
        let location = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        let json = location.to_json(SerializeOptions::ALL);
        assert_eq!(json["coordinates"]["latitude"], json!("50.9270540"));
        assert_eq!(json["facilities"], json!(["CAFE", "WIFI"]));

        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "country_code",
                "party_id",
                "id",
                "version",
                "publish",
                "name",
                "address",
                "city",
                "postal_code",
                "country",
                "coordinates",
                "time_zone",
                "facilities",
                "charging_stations",
                "energy_meters",
                "created",
                "last_updated"
            ]
        );

        let again = Location::from_json(&Value::Object(json), &IdentityHints::none()).unwrap();
        assert_eq!(again, location);
        assert_eq!(again.etag(), location.etag());
    }

    #[test]
    fn missing_coordinates_are_reported() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("coordinates");
        let err = Location::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err, ValidationError::missing("coordinates"));
    }

    #[test]
    fn country_must_be_alpha3() {
        let mut value = sample();
        value["country"] = json!("DE");
        let err = Location::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err.field(), Some("country"));
    }

    #[test]
    fn registry_wrappers() {
        let location = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        let t: Timestamp = "2024-02-01T00:00:00Z".parse().unwrap();
        let station = ChargingStation::new(
            ResourceMeta::new(
                ResourceIdentity::new(PartyId::new("DE", "GEF").unwrap(), "CS2", 1),
                Some(t),
                None,
            ),
            Vec::new(),
            None,
            None,
            Vec::new(),
        )
        .unwrap();

        assert!(location.try_add_charging_station(station.clone()));
        assert!(!location.try_add_charging_station(station));
        assert_eq!(location.charging_stations().len(), 2);
        assert!(location.remove_charging_station("CS1").is_some());
        assert!(!location.has_charging_station("CS1"));
    }

    #[test]
    fn registry_changes_show_in_etag_and_round_trip() {
        let location = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        let before = location.etag();
        let station = ChargingStation::new(
            ResourceMeta::new(
                ResourceIdentity::new(PartyId::new("DE", "GEF").unwrap(), "CS2", 1),
                None,
                Some("2024-02-01T00:00:00Z".parse().unwrap()),
            ),
            Vec::new(),
            None,
            None,
            Vec::new(),
        )
        .unwrap();

        assert!(location.try_add_charging_station(station));
        assert_ne!(location.etag(), before);
        assert_eq!(location.etag(), location.content_hash());

        let text = location.to_json_text(SerializeOptions::ALL);
        let reparsed = Location::parse_text(&text, &IdentityHints::none()).unwrap();
        assert_eq!(reparsed, location);
        assert_eq!(reparsed.etag(), location.etag());

        location.remove_charging_station("CS2");
        assert_eq!(location.etag(), before);
    }

    #[test]
    fn builder_re_id_moves_children_to_the_new_parent() {
        let parsed = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        let mut builder = parsed.to_builder();
        builder.meta.id = Some("LOC2".into());
        let built = builder.build().unwrap();

        let mut value = sample();
        value["id"] = json!("LOC2");
        let direct = Location::from_json(&value, &IdentityHints::none()).unwrap();

        assert_eq!(built, direct);
        let station = built.charging_station("CS1").unwrap();
        assert_eq!(
            station.parent().map(|p| p.id.as_str()),
            direct.charging_station("CS1").unwrap().parent().map(|p| p.id.as_str())
        );
        assert_eq!(station.parent().unwrap().id, "LOC2");
        assert_eq!(built.energy_meter("M1").unwrap().parent().unwrap().id, "LOC2");
        assert_eq!(parsed.charging_station("CS1").unwrap().parent().unwrap().id, "LOC1");
    }

    #[test]
    fn builder_matches_parser() {
        let parsed = Location::from_json(&sample(), &IdentityHints::none()).unwrap();
        let rebuilt = parsed.to_builder().build().unwrap();
        assert_eq!(rebuilt, parsed);

        let mut builder = parsed.to_builder();
        builder.coordinates = None;
        builder.time_zone = None;
        let warnings = builder.to_immutable().unwrap_err();
        let fields: Vec<_> = warnings.iter().filter_map(ValidationError::field).collect();
        assert_eq!(fields, ["coordinates", "time_zone"]);
    }
}

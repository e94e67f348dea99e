//! Charge detail records: the billable summary of a finished session.

use crate::charging_period::{self, ChargingPeriod};
use crate::fields;
use crate::session::SessionPlace;
use crate::vocabulary::AuthMethod;
use indexmap::IndexSet;
use ocpi_resource_core::{
    dedup_ordered, impl_resource_ordering, Builder, ConstructionError, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, Parseable, Resource, ResourceMeta, SerializeOptions,
    Serializable, Timestamp, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};

const START_DATE_TIME_KEY: &str = "start_date_time";
const END_DATE_TIME_KEY: &str = "end_date_time";
const SESSION_ID_KEY: &str = "session_id";
const AUTH_METHOD_KEY: &str = "auth_method";
const CURRENCY_KEY: &str = "currency";
const LOCATION_ID_KEY: &str = "location_id";
const EVSE_UID_KEY: &str = "evse_uid";
const CONNECTOR_ID_KEY: &str = "connector_id";
const TARIFF_IDS_KEY: &str = "tariff_ids";
const CHARGING_PERIODS_KEY: &str = "charging_periods";
const TOTAL_COST_KEY: &str = "total_cost";
const TOTAL_ENERGY_KEY: &str = "total_energy";
const TOTAL_TIME_KEY: &str = "total_time";

/// Totals of a charge detail record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdrTotals {
    /// Total cost in the record's currency
    pub cost: f64,
    /// Total energy in kWh
    pub energy: f64,
    /// Total duration in hours
    pub time: f64,
}

/// Billable record of a finished session.
#[derive(Debug, Clone)]
pub struct ChargeDetailRecord {
    meta: ResourceMeta,
    start_date_time: Timestamp,
    end_date_time: Timestamp,
    session_id: Option<String>,
    auth_method: AuthMethod,
    currency: String,
    place: SessionPlace,
    tariff_ids: IndexSet<String>,
    charging_periods: Vec<ChargingPeriod>,
    totals: CdrTotals,
}

impl ChargeDetailRecord {
    /// Create a record and compute its ETag.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyCollection`] without charging
    /// periods, and fails on an invalid id, currency or amount.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: ResourceMeta,
        start_date_time: Timestamp,
        end_date_time: Timestamp,
        session_id: Option<String>,
        auth_method: AuthMethod,
        currency: String,
        place: SessionPlace,
        tariff_ids: impl IntoIterator<Item = String>,
        charging_periods: impl IntoIterator<Item = ChargingPeriod>,
        totals: CdrTotals,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let charging_periods = dedup_ordered(charging_periods);
        if charging_periods.is_empty() {
            return Err(ConstructionError::empty(CHARGING_PERIODS_KEY));
        }
        let totals = CdrTotals {
            cost: fields::amount(TOTAL_COST_KEY, totals.cost)?,
            energy: fields::amount(TOTAL_ENERGY_KEY, totals.energy)?,
            time: fields::amount(TOTAL_TIME_KEY, totals.time)?,
        };

        let mut cdr = Self {
            meta,
            start_date_time,
            end_date_time,
            session_id,
            auth_method,
            currency: fields::currency(CURRENCY_KEY, currency)?,
            place,
            tariff_ids: tariff_ids.into_iter().collect(),
            charging_periods,
            totals,
        };
        let etag = cdr.content_hash();
        cdr.meta.seal(etag);
        Ok(cdr)
    }

    /// Record id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.identity().id
    }

    /// Start of the charged session.
    #[must_use]
    pub fn start_date_time(&self) -> Timestamp {
        self.start_date_time
    }

    /// End of the charged session.
    #[must_use]
    pub fn end_date_time(&self) -> Timestamp {
        self.end_date_time
    }

    /// Originating session.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// How the session was authorized.
    #[must_use]
    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    /// ISO 4217 currency of all amounts.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Location, EVSE and connector.
    #[must_use]
    pub fn place(&self) -> &SessionPlace {
        &self.place
    }

    /// Applied tariffs, in first-seen order.
    #[must_use]
    pub fn tariff_ids(&self) -> &IndexSet<String> {
        &self.tariff_ids
    }

    /// Metered periods; never empty.
    #[must_use]
    pub fn charging_periods(&self) -> &[ChargingPeriod] {
        &self.charging_periods
    }

    /// Cost, energy and time totals.
    #[must_use]
    pub fn totals(&self) -> CdrTotals {
        self.totals
    }
}

impl Resource for ChargeDetailRecord {
    const KIND: &'static str = "CDR";
    const ID_KEY: &'static str = "id";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl Serializable for ChargeDetailRecord {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .timestamp(START_DATE_TIME_KEY, self.start_date_time)
            .timestamp(END_DATE_TIME_KEY, self.end_date_time)
            .optional(SESSION_ID_KEY, self.session_id.as_deref())
            .field(AUTH_METHOD_KEY, self.auth_method)
            .field(CURRENCY_KEY, self.currency.as_str())
            .field(LOCATION_ID_KEY, self.place.location_id.as_str())
            .field(EVSE_UID_KEY, self.place.evse_uid.as_str())
            .field(CONNECTOR_ID_KEY, self.place.connector_id.as_str())
            .optional_array(TARIFF_IDS_KEY, self.tariff_ids.iter().map(String::as_str))
            .array(
                CHARGING_PERIODS_KEY,
                charging_period::periods_json(&self.charging_periods),
            )
            .field(TOTAL_COST_KEY, self.totals.cost)
            .field(TOTAL_ENERGY_KEY, self.totals.energy)
            .field(TOTAL_TIME_KEY, self.totals.time);
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for ChargeDetailRecord {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        let place = SessionPlace {
            location_id: reader.string(LOCATION_ID_KEY)?,
            evse_uid: reader.string(EVSE_UID_KEY)?,
            connector_id: reader.string(CONNECTOR_ID_KEY)?,
        };
        let totals = CdrTotals {
            cost: reader.f64(TOTAL_COST_KEY)?,
            energy: reader.f64(TOTAL_ENERGY_KEY)?,
            time: reader.f64(TOTAL_TIME_KEY)?,
        };
        Ok(Self::new(
            meta,
            reader.timestamp(START_DATE_TIME_KEY)?,
            reader.timestamp(END_DATE_TIME_KEY)?,
            reader.optional_string(SESSION_ID_KEY)?,
            reader.token(AUTH_METHOD_KEY)?,
            reader.string(CURRENCY_KEY)?,
            place,
            reader.token_set::<String>(TARIFF_IDS_KEY)?,
            charging_period::read_periods(&reader, CHARGING_PERIODS_KEY)?,
            totals,
        )?)
    }
}

impl_resource_ordering!(ChargeDetailRecord);

/// Mutable accumulator for [`ChargeDetailRecord`].
#[derive(Debug, Clone, Default)]
pub struct ChargeDetailRecordBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Start of the charged session
    pub start_date_time: Option<Timestamp>,
    /// End of the charged session
    pub end_date_time: Option<Timestamp>,
    /// Originating session
    pub session_id: Option<String>,
    /// How the session was authorized
    pub auth_method: Option<AuthMethod>,
    /// ISO 4217 currency
    pub currency: Option<String>,
    /// Location id
    pub location_id: Option<String>,
    /// EVSE uid
    pub evse_uid: Option<String>,
    /// Connector id
    pub connector_id: Option<String>,
    /// Applied tariffs
    pub tariff_ids: IndexSet<String>,
    /// Metered periods
    pub charging_periods: Vec<ChargingPeriod>,
    /// Total cost
    pub total_cost: Option<f64>,
    /// Total energy in kWh
    pub total_energy: Option<f64>,
    /// Total duration in hours
    pub total_time: Option<f64>,
}

impl Builder for ChargeDetailRecordBuilder {
    type Output = ChargeDetailRecord;

    fn to_immutable(&self) -> Result<ChargeDetailRecord, Warnings> {
        let mut warnings = Warnings::new();
        let meta = self.meta.build(ChargeDetailRecord::ID_KEY, &mut warnings);
        warnings.require(START_DATE_TIME_KEY, self.start_date_time.as_ref());
        warnings.require(END_DATE_TIME_KEY, self.end_date_time.as_ref());
        warnings.require(AUTH_METHOD_KEY, self.auth_method.as_ref());
        warnings.require(CURRENCY_KEY, self.currency.as_ref());
        warnings.require(LOCATION_ID_KEY, self.location_id.as_ref());
        warnings.require(EVSE_UID_KEY, self.evse_uid.as_ref());
        warnings.require(CONNECTOR_ID_KEY, self.connector_id.as_ref());
        if self.charging_periods.is_empty() {
            warnings.push(ConstructionError::empty(CHARGING_PERIODS_KEY));
        }
        warnings.require(TOTAL_COST_KEY, self.total_cost.as_ref());
        warnings.require(TOTAL_ENERGY_KEY, self.total_energy.as_ref());
        warnings.require(TOTAL_TIME_KEY, self.total_time.as_ref());
        if !warnings.is_empty() {
            return Err(warnings);
        }

        let (
            Some(meta),
            Some(start_date_time),
            Some(end_date_time),
            Some(auth_method),
            Some(currency),
            Some(location_id),
            Some(evse_uid),
            Some(connector_id),
            Some(cost),
            Some(energy),
            Some(time),
        ) = (
            meta,
            self.start_date_time,
            self.end_date_time,
            self.auth_method,
            self.currency.clone(),
            self.location_id.clone(),
            self.evse_uid.clone(),
            self.connector_id.clone(),
            self.total_cost,
            self.total_energy,
            self.total_time,
        )
        else {
            return Err(warnings);
        };

        Ok(ChargeDetailRecord::new(
            meta,
            start_date_time,
            end_date_time,
            self.session_id.clone(),
            auth_method,
            currency,
            SessionPlace {
                location_id,
                evse_uid,
                connector_id,
            },
            self.tariff_ids.iter().cloned(),
            self.charging_periods.iter().cloned(),
            CdrTotals { cost, energy, time },
        )?)
    }
}

impl ToBuilder for ChargeDetailRecord {
    type Builder = ChargeDetailRecordBuilder;

    fn to_builder(&self) -> ChargeDetailRecordBuilder {
        ChargeDetailRecordBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            start_date_time: Some(self.start_date_time),
            end_date_time: Some(self.end_date_time),
            session_id: self.session_id.clone(),
            auth_method: Some(self.auth_method),
            currency: Some(self.currency.clone()),
            location_id: Some(self.place.location_id.clone()),
            evse_uid: Some(self.place.evse_uid.clone()),
            connector_id: Some(self.place.connector_id.clone()),
            tariff_ids: self.tariff_ids.clone(),
            charging_periods: self.charging_periods.clone(),
            total_cost: Some(self.totals.cost),
            total_energy: Some(self.totals.energy),
            total_time: Some(self.totals.time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "country_code": "BE",
            "party_id": "BEC",
            "id": "CDR1",
            "version": 1,
            "start_date_time": "2024-03-01T10:00:00Z",
            "end_date_time": "2024-03-01T11:30:00Z",
            "auth_method": "AUTH_REQUEST",
            "currency": "EUR",
            "location_id": "LOC1",
            "evse_uid": "E1",
            "connector_id": "1",
            "tariff_ids": ["T1", "T1", "T2"],
            "charging_periods": [{
                "start_date_time": "2024-03-01T10:00:00Z",
                "dimensions": [{"type": "ENERGY", "volume": 15.0}]
            }],
            "total_cost": 4.5,
            "total_energy": 15.0,
            "total_time": 1.5,
            "last_updated": "2024-03-01T11:31:00Z"
        })
    }

    #[test]
    fn round_trip() {
        let cdr = ChargeDetailRecord::from_json(&sample(), &IdentityHints::none()).unwrap();
        assert_eq!(cdr.tariff_ids().len(), 2);
        let again = ChargeDetailRecord::from_json(
            &Value::Object(cdr.to_json(SerializeOptions::ALL)),
            &IdentityHints::none(),
        )
        .unwrap();
        assert_eq!(again, cdr);
    }

    #[test]
    fn empty_charging_periods_fail_construction() {
        let mut value = sample();
        value["charging_periods"] = json!([]);
        let err = ChargeDetailRecord::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Construction(ConstructionError::empty("charging_periods"))
        );
    }

    #[test]
    fn builder_warns_about_empty_periods() {
        let cdr = ChargeDetailRecord::from_json(&sample(), &IdentityHints::none()).unwrap();
        let mut builder = cdr.to_builder();
        builder.charging_periods.clear();
        builder.total_time = None;

        let warnings = builder.to_immutable().unwrap_err();
        let fields: Vec<_> = warnings.iter().filter_map(ValidationError::field).collect();
        assert_eq!(fields, ["charging_periods", "total_time"]);
    }
}

//! Charging sessions.

use crate::charging_period::{self, ChargingPeriod};
use crate::fields;
use crate::vocabulary::{AuthMethod, SessionStatus};
use ocpi_resource_core::{
    dedup_ordered, impl_resource_ordering, Builder, ConstructionError, Hashable, IdentityHints,
    JsonReader, JsonWriter, MetaBuilder, Parseable, Resource, ResourceMeta, SerializeOptions,
    Serializable, Timestamp, ToBuilder, ValidationError, Warnings,
};
use serde_json::{Map, Value};

const START_DATE_TIME_KEY: &str = "start_date_time";
const END_DATE_TIME_KEY: &str = "end_date_time";
const KWH_KEY: &str = "kwh";
const AUTH_METHOD_KEY: &str = "auth_method";
const CURRENCY_KEY: &str = "currency";
const LOCATION_ID_KEY: &str = "location_id";
const EVSE_UID_KEY: &str = "evse_uid";
const CONNECTOR_ID_KEY: &str = "connector_id";
const CHARGING_PERIODS_KEY: &str = "charging_periods";
const TOTAL_COST_KEY: &str = "total_cost";
const STATUS_KEY: &str = "status";

/// Where a session takes place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlace {
    /// Location id
    pub location_id: String,
    /// EVSE uid within the location
    pub evse_uid: String,
    /// Connector id within the EVSE
    pub connector_id: String,
}

/// An ongoing or finished charging session.
#[derive(Debug, Clone)]
pub struct Session {
    meta: ResourceMeta,
    start_date_time: Timestamp,
    end_date_time: Option<Timestamp>,
    kwh: f64,
    auth_method: AuthMethod,
    currency: String,
    place: SessionPlace,
    charging_periods: Vec<ChargingPeriod>,
    total_cost: Option<f64>,
    status: SessionStatus,
}

impl Session {
    /// Create a session and compute its ETag.
    ///
    /// # Errors
    ///
    /// Fails on an invalid id, currency or amount.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: ResourceMeta,
        start_date_time: Timestamp,
        end_date_time: Option<Timestamp>,
        kwh: f64,
        auth_method: AuthMethod,
        currency: String,
        place: SessionPlace,
        charging_periods: impl IntoIterator<Item = ChargingPeriod>,
        total_cost: Option<f64>,
        status: SessionStatus,
    ) -> Result<Self, ConstructionError> {
        meta.check(Self::ID_KEY)?;
        let mut session = Self {
            meta,
            start_date_time,
            end_date_time,
            kwh: fields::amount(KWH_KEY, kwh)?,
            auth_method,
            currency: fields::currency(CURRENCY_KEY, currency)?,
            place,
            charging_periods: dedup_ordered(charging_periods),
            total_cost: total_cost
                .map(|cost| fields::amount(TOTAL_COST_KEY, cost))
                .transpose()?,
            status,
        };
        let etag = session.content_hash();
        session.meta.seal(etag);
        Ok(session)
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta.identity().id
    }

    /// Start of the session.
    #[must_use]
    pub fn start_date_time(&self) -> Timestamp {
        self.start_date_time
    }

    /// End of the session, once finished.
    #[must_use]
    pub fn end_date_time(&self) -> Option<Timestamp> {
        self.end_date_time
    }

    /// Energy charged so far.
    #[must_use]
    pub fn kwh(&self) -> f64 {
        self.kwh
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

    /// Metered periods so far.
    #[must_use]
    pub fn charging_periods(&self) -> &[ChargingPeriod] {
        &self.charging_periods
    }

    /// Cost so far.
    #[must_use]
    pub fn total_cost(&self) -> Option<f64> {
        self.total_cost
    }

    /// Lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }
}

impl Resource for Session {
    const KIND: &'static str = "Session";
    const ID_KEY: &'static str = "id";

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl Serializable for Session {
    fn to_json(&self, options: SerializeOptions) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        self.meta.write_identity(&mut writer, Self::ID_KEY, options);
        writer
            .timestamp(START_DATE_TIME_KEY, self.start_date_time)
            .optional_timestamp(END_DATE_TIME_KEY, self.end_date_time)
            .field(KWH_KEY, self.kwh)
            .field(AUTH_METHOD_KEY, self.auth_method)
            .field(CURRENCY_KEY, self.currency.as_str())
            .field(LOCATION_ID_KEY, self.place.location_id.as_str())
            .field(EVSE_UID_KEY, self.place.evse_uid.as_str())
            .field(CONNECTOR_ID_KEY, self.place.connector_id.as_str())
            .optional_array(
                CHARGING_PERIODS_KEY,
                charging_period::periods_json(&self.charging_periods),
            )
            .optional(TOTAL_COST_KEY, self.total_cost)
            .field(STATUS_KEY, self.status);
        self.meta.write_trailer(&mut writer, options);
        writer.finish()
    }
}

impl Parseable for Session {
    fn from_json(json: &Value, hints: &IdentityHints) -> Result<Self, ValidationError> {
        let reader = JsonReader::new(json, Self::KIND)?;
        let meta = ResourceMeta::read(&reader, Self::ID_KEY, hints)?;
        let place = SessionPlace {
            location_id: reader.string(LOCATION_ID_KEY)?,
            evse_uid: reader.string(EVSE_UID_KEY)?,
            connector_id: reader.string(CONNECTOR_ID_KEY)?,
        };
        Ok(Self::new(
            meta,
            reader.timestamp(START_DATE_TIME_KEY)?,
            reader.optional_timestamp(END_DATE_TIME_KEY)?,
            reader.f64(KWH_KEY)?,
            reader.token(AUTH_METHOD_KEY)?,
            reader.string(CURRENCY_KEY)?,
            place,
            charging_period::read_periods(&reader, CHARGING_PERIODS_KEY)?,
            reader.optional_f64(TOTAL_COST_KEY)?,
            reader.token(STATUS_KEY)?,
        )?)
    }
}

impl_resource_ordering!(Session);

/// Mutable accumulator for [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    /// Identity and timestamps
    pub meta: MetaBuilder,
    /// Start of the session
    pub start_date_time: Option<Timestamp>,
    /// End of the session
    pub end_date_time: Option<Timestamp>,
    /// Energy charged so far
    pub kwh: Option<f64>,
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
    /// Metered periods
    pub charging_periods: Vec<ChargingPeriod>,
    /// Cost so far
    pub total_cost: Option<f64>,
    /// Lifecycle state
    pub status: Option<SessionStatus>,
}

impl Builder for SessionBuilder {
    type Output = Session;

    fn to_immutable(&self) -> Result<Session, Warnings> {
        let mut warnings = Warnings::new();
        let meta = self.meta.build(Session::ID_KEY, &mut warnings);
        warnings.require(START_DATE_TIME_KEY, self.start_date_time.as_ref());
        warnings.require(KWH_KEY, self.kwh.as_ref());
        warnings.require(AUTH_METHOD_KEY, self.auth_method.as_ref());
        warnings.require(CURRENCY_KEY, self.currency.as_ref());
        warnings.require(LOCATION_ID_KEY, self.location_id.as_ref());
        warnings.require(EVSE_UID_KEY, self.evse_uid.as_ref());
        warnings.require(CONNECTOR_ID_KEY, self.connector_id.as_ref());
        warnings.require(STATUS_KEY, self.status.as_ref());

        let (
            Some(meta),
            Some(start_date_time),
            Some(kwh),
            Some(auth_method),
            Some(currency),
            Some(location_id),
            Some(evse_uid),
            Some(connector_id),
            Some(status),
        ) = (
            meta,
            self.start_date_time,
            self.kwh,
            self.auth_method,
            self.currency.clone(),
            self.location_id.clone(),
            self.evse_uid.clone(),
            self.connector_id.clone(),
            self.status,
        )
        else {
            return Err(warnings);
        };

        Ok(Session::new(
            meta,
            start_date_time,
            self.end_date_time,
            kwh,
            auth_method,
            currency,
            SessionPlace {
                location_id,
                evse_uid,
                connector_id,
            },
            self.charging_periods.iter().cloned(),
            self.total_cost,
            status,
        )?)
    }
}

impl ToBuilder for Session {
    type Builder = SessionBuilder;

    fn to_builder(&self) -> SessionBuilder {
        SessionBuilder {
            meta: MetaBuilder::from_meta(&self.meta),
            start_date_time: Some(self.start_date_time),
            end_date_time: self.end_date_time,
            kwh: Some(self.kwh),
            auth_method: Some(self.auth_method),
            currency: Some(self.currency.clone()),
            location_id: Some(self.place.location_id.clone()),
            evse_uid: Some(self.place.evse_uid.clone()),
            connector_id: Some(self.place.connector_id.clone()),
            charging_periods: self.charging_periods.clone(),
            total_cost: self.total_cost,
            status: Some(self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "country_code": "NL",
            "party_id": "ABC",
            "id": "S1",
            "version": 1,
            "start_date_time": "2024-03-01T10:00:00Z",
            "kwh": 0.0,
            "auth_method": "WHITELIST",
            "currency": "EUR",
            "location_id": "LOC1",
            "evse_uid": "E1",
            "connector_id": "1",
            "status": "ACTIVE",
            "last_updated": "2024-03-01T10:00:00Z"
        })
    }

    #[test]
    fn optional_fields_are_omitted() {
        let session = Session::from_json(&sample(), &IdentityHints::none()).unwrap();
        let json = session.to_json(SerializeOptions::ALL);
        assert!(!json.contains_key("end_date_time"));
        assert!(!json.contains_key("charging_periods"));
        assert!(!json.contains_key("total_cost"));
        assert!(!json.contains_key("custom_data"));
        assert_eq!(json["created"], json!("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut value = sample();
        value["status"] = json!("active");
        let err = Session::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn negative_energy_is_rejected() {
        let mut value = sample();
        value["kwh"] = json!(-1.5);
        let err = Session::from_json(&value, &IdentityHints::none()).unwrap_err();
        assert_eq!(err.field(), Some("kwh"));
    }

    #[test]
    fn builder_defaults_timestamps_from_each_other() {
        let session = Session::from_json(&sample(), &IdentityHints::none()).unwrap();
        let mut builder = session.to_builder();
        builder.meta.created = None;
        let rebuilt = builder.build().unwrap();
        assert_eq!(rebuilt.meta().created(), session.meta().last_updated());
        assert_eq!(rebuilt, session);
    }
}

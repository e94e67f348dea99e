//! Charging periods: the metered slices of a session or CDR.

use crate::fields;
use crate::vocabulary::CdrDimensionType;
use ocpi_resource_core::{
    dedup_ordered, ConstructionError, JsonReader, JsonWriter, Timestamp, ValidationError,
};
use serde_json::{Map, Value};

const START_DATE_TIME_KEY: &str = "start_date_time";
const DIMENSIONS_KEY: &str = "dimensions";
const TARIFF_ID_KEY: &str = "tariff_id";
const TYPE_KEY: &str = "type";
const VOLUME_KEY: &str = "volume";

/// One measured quantity within a charging period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdrDimension {
    dimension_type: CdrDimensionType,
    volume: f64,
}

impl CdrDimension {
    /// Create a dimension.
    ///
    /// # Errors
    ///
    /// Fails if `volume` is negative or not finite.
    pub fn new(dimension_type: CdrDimensionType, volume: f64) -> Result<Self, ConstructionError> {
        Ok(Self {
            dimension_type,
            volume: fields::amount(VOLUME_KEY, volume)?,
        })
    }

    /// What is measured.
    #[must_use]
    pub fn dimension_type(&self) -> CdrDimensionType {
        self.dimension_type
    }

    /// Measured volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    fn to_json(self) -> Value {
        let mut writer = JsonWriter::new();
        writer
            .field(TYPE_KEY, self.dimension_type)
            .field(VOLUME_KEY, self.volume);
        Value::Object(writer.finish())
    }

    fn read(value: &Value, prefix: &str) -> Result<Self, ValidationError> {
        let reader = JsonReader::nested(value, prefix.trim_end_matches('.'), prefix)?;
        let dimension_type = reader.token(TYPE_KEY)?;
        let volume = reader.f64(VOLUME_KEY)?;
        Self::new(dimension_type, volume).map_err(|e| ValidationError::from(e).within(prefix))
    }
}

/// A time slice with its measured dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingPeriod {
    start_date_time: Timestamp,
    dimensions: Vec<CdrDimension>,
    tariff_id: Option<String>,
}

impl ChargingPeriod {
    /// Create a period. Duplicate dimensions are dropped, keeping the first.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::EmptyCollection`] if no dimension is
    /// given.
    pub fn new(
        start_date_time: Timestamp,
        dimensions: impl IntoIterator<Item = CdrDimension>,
        tariff_id: Option<String>,
    ) -> Result<Self, ConstructionError> {
        let dimensions = dedup_ordered(dimensions);
        if dimensions.is_empty() {
            return Err(ConstructionError::empty(DIMENSIONS_KEY));
        }
        Ok(Self {
            start_date_time,
            dimensions,
            tariff_id,
        })
    }

    /// Start of the period.
    #[must_use]
    pub fn start_date_time(&self) -> Timestamp {
        self.start_date_time
    }

    /// Measured dimensions; never empty.
    #[must_use]
    pub fn dimensions(&self) -> &[CdrDimension] {
        &self.dimensions
    }

    /// Tariff that applies to this period.
    #[must_use]
    pub fn tariff_id(&self) -> Option<&str> {
        self.tariff_id.as_deref()
    }

    /// Wire form.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        writer
            .timestamp(START_DATE_TIME_KEY, self.start_date_time)
            .array(
                DIMENSIONS_KEY,
                self.dimensions.iter().map(|d| d.to_json()),
            )
            .optional(TARIFF_ID_KEY, self.tariff_id.as_deref());
        writer.finish()
    }

    /// Read the wire form. Field names in errors carry `prefix`.
    ///
    /// # Errors
    ///
    /// Fails on missing or malformed fields and on an empty dimension list.
    pub fn read(value: &Value, prefix: &str) -> Result<Self, ValidationError> {
        let reader = JsonReader::nested(value, prefix.trim_end_matches('.'), prefix)?;
        let start_date_time = reader.timestamp(START_DATE_TIME_KEY)?;
        let dimensions = reader.each(DIMENSIONS_KEY, CdrDimension::read)?;
        let tariff_id = reader.optional_string(TARIFF_ID_KEY)?;
        Self::new(start_date_time, dimensions, tariff_id)
            .map_err(|e| ValidationError::from(e).within(prefix))
    }
}

/// Read a list of charging periods, dropping duplicates.
pub(crate) fn read_periods(
    reader: &JsonReader<'_>,
    key: &str,
) -> Result<Vec<ChargingPeriod>, ValidationError> {
    Ok(dedup_ordered(reader.each(key, ChargingPeriod::read)?))
}

/// Wire form of a list of charging periods.
pub(crate) fn periods_json(periods: &[ChargingPeriod]) -> impl Iterator<Item = Value> + '_ {
    periods.iter().map(|p| Value::Object(p.to_json()))
}

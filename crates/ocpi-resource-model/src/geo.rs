//! Geographic coordinates with a fixed decimal encoding.
//!
//! Degrees are stored as integers in units of 10^-7 so that the textual
//! form (`"50.9270000"`) survives any number of round trips unchanged.

use ocpi_resource_core::{ConstructionError, JsonReader, JsonWriter, ValidationError};
use serde_json::{Map, Value};
use std::fmt;

/// Fractional digits emitted for each coordinate.
pub const COORDINATE_PRECISION: usize = 7;

const SCALE: i64 = 10_000_000;

const LATITUDE_KEY: &str = "latitude";
const LONGITUDE_KEY: &str = "longitude";

/// WGS 84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeoCoordinates {
    latitude: i64,
    longitude: i64,
}

impl GeoCoordinates {
    /// Parse decimal degree strings with at most seven fractional digits.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::InvalidValue`] for malformed or
    /// out-of-range values.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, ConstructionError> {
        Self::from_units(
            parse_fixed(LATITUDE_KEY, latitude)?,
            parse_fixed(LONGITUDE_KEY, longitude)?,
        )
    }

    /// Round decimal degrees to the stored precision.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::InvalidValue`] for non-finite or
    /// out-of-range values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_degrees(latitude: f64, longitude: f64) -> Result<Self, ConstructionError> {
        let to_units = |field: &str, degrees: f64| {
            if degrees.is_finite() && degrees.abs() <= 180.0 {
                Ok((degrees * SCALE as f64).round() as i64)
            } else {
                Err(ConstructionError::invalid(field, format!("{degrees} is out of range")))
            }
        };
        Self::from_units(
            to_units(LATITUDE_KEY, latitude)?,
            to_units(LONGITUDE_KEY, longitude)?,
        )
    }

    fn from_units(latitude: i64, longitude: i64) -> Result<Self, ConstructionError> {
        if latitude.abs() > 90 * SCALE {
            return Err(ConstructionError::invalid(
                LATITUDE_KEY,
                "must be within -90..=90 degrees",
            ));
        }
        if longitude.abs() > 180 * SCALE {
            return Err(ConstructionError::invalid(
                LONGITUDE_KEY,
                "must be within -180..=180 degrees",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn latitude(&self) -> f64 {
        self.latitude as f64 / SCALE as f64
    }

    /// Longitude in degrees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn longitude(&self) -> f64 {
        self.longitude as f64 / SCALE as f64
    }

    /// Wire form: `{"latitude": "..", "longitude": ".."}`.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut writer = JsonWriter::new();
        writer
            .field(LATITUDE_KEY, format_fixed(self.latitude))
            .field(LONGITUDE_KEY, format_fixed(self.longitude));
        writer.finish()
    }

    /// Read the wire form. Field names in errors carry `prefix`.
    ///
    /// # Errors
    ///
    /// Fails if either coordinate is missing or malformed.
    pub fn read(value: &Value, prefix: &str) -> Result<Self, ValidationError> {
        let reader = JsonReader::nested(value, prefix.trim_end_matches('.'), prefix)?;
        let latitude = reader.string(LATITUDE_KEY)?;
        let longitude = reader.string(LONGITUDE_KEY)?;
        Self::parse(&latitude, &longitude).map_err(|e| ValidationError::from(e).within(prefix))
    }
}

impl fmt::Display for GeoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            format_fixed(self.latitude),
            format_fixed(self.longitude)
        )
    }
}

fn format_fixed(units: i64) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let abs = units.unsigned_abs();
    let scale = SCALE.unsigned_abs();
    format!(
        "{sign}{}.{:0width$}",
        abs / scale,
        abs % scale,
        width = COORDINATE_PRECISION
    )
}

fn parse_fixed(field: &str, raw: &str) -> Result<i64, ConstructionError> {
    let invalid = || ConstructionError::invalid(field, format!("'{raw}' is not a decimal degree"));

    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty()
        || whole.len() > 3
        || fraction.len() > COORDINATE_PRECISION
        || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let padded = format!("{fraction:0<width$}", width = COORDINATE_PRECISION);
    let fraction: i64 = padded.parse().map_err(|_| invalid())?;
    let units = whole * SCALE + fraction;
    Ok(if negative { -units } else { units })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_precision_round_trip() {
        let coordinates = GeoCoordinates::parse("50.927", "-11.5892372").unwrap();
        assert_eq!(
            Value::Object(coordinates.to_json()),
            json!({"latitude": "50.9270000", "longitude": "-11.5892372"})
        );

        let again = GeoCoordinates::read(&Value::Object(coordinates.to_json()), "coordinates.")
            .unwrap();
        assert_eq!(again, coordinates);
    }

    #[test]
    fn degrees_are_rounded() {
        let coordinates = GeoCoordinates::from_degrees(50.927_000_04, 11.589_237_2).unwrap();
        assert_eq!(coordinates.to_string(), "50.9270000,11.5892372");
        assert!((coordinates.latitude() - 50.927).abs() < 1e-9);
    }

    #[test]
    fn negative_values_below_one_degree_keep_the_sign() {
        let coordinates = GeoCoordinates::parse("-0.5", "0").unwrap();
        assert_eq!(coordinates.to_string(), "-0.5000000,0.0000000");
    }

    #[test]
    fn rejects_malformed_and_out_of_range() {
        assert!(GeoCoordinates::parse("91", "0").is_err());
        assert!(GeoCoordinates::parse("0", "180.0000001").is_err());
        assert!(GeoCoordinates::parse("1.23456789", "0").is_err());
        assert!(GeoCoordinates::parse("1e3", "0").is_err());
        assert!(GeoCoordinates::from_degrees(f64::NAN, 0.0).is_err());

        let err = GeoCoordinates::read(&json!({"latitude": "abc", "longitude": "1"}), "coordinates.")
            .unwrap_err();
        assert_eq!(err.field(), Some("coordinates.latitude"));
    }
}

//! # OCPI Resource Model
//!
//! Concrete OCPI entities built on `ocpi-resource-core`.
//!
//! ## Entities
//!
//! - [`Location`]: owns [`ChargingStation`]s and [`EnergyMeter`]s
//! - [`ChargingStation`]: owns [`Evse`]s
//! - [`Session`] and [`ChargeDetailRecord`], with [`ChargingPeriod`] values
//! - [`TariffAssociation`]
//!
//! Every entity is parseable, serializable, hashable and patchable, and has
//! a builder counterpart.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cdr;
pub mod charging_period;
pub mod charging_station;
pub mod energy_meter;
pub mod evse;
mod fields;
pub mod geo;
pub mod location;
pub mod session;
pub mod tariff_association;
pub mod vocabulary;

pub use cdr::{CdrTotals, ChargeDetailRecord, ChargeDetailRecordBuilder};
pub use charging_period::{CdrDimension, ChargingPeriod};
pub use charging_station::{ChargingStation, ChargingStationBuilder};
pub use energy_meter::{EnergyMeter, EnergyMeterBuilder};
pub use evse::{Evse, EvseBuilder};
pub use geo::GeoCoordinates;
pub use location::{Address, Location, LocationBuilder};
pub use session::{Session, SessionBuilder, SessionPlace};
pub use tariff_association::{TariffAssociation, TariffAssociationBuilder};
pub use vocabulary::{
    AuthMethod, Capability, CdrDimensionType, EvseStatus, Facility, SessionStatus, UnknownToken,
};

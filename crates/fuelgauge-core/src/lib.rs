//! Fuel-gauge telemetry engine
//!
//! Samples the gauge's register file over a [`RegisterTransport`], keeps a
//! cached [`TelemetrySnapshot`], infers charge state from it and serves the
//! result as power-supply style properties.
//!
//! # Example
//!
//! ```
//! use fuelgauge_core::{BatterySupply, MainsSupply, PowerSupply, Property, TelemetryReader};
//! use fuelgauge_hal::mock::MockTransport;
//! use std::sync::Arc;
//!
//! let gauge = MockTransport::new();
//! gauge.set_word(0x144, 4800); // full-charge capacity
//! gauge.set_word(0x1A4, 4600); // remaining capacity
//!
//! let reader = Arc::new(TelemetryReader::new(gauge));
//! let battery = BatterySupply::new(Arc::clone(&reader));
//! let mains = MainsSupply::new(reader);
//!
//! assert_eq!(battery.get_property(Property::Capacity).unwrap().to_string(), "95");
//! assert_eq!(battery.get_by_name("capacity_level").unwrap().to_string(), "Full");
//! assert!(mains.is_online().unwrap());
//! ```

pub mod clock;
mod error;
pub mod evaluator;
pub mod poller;
pub mod projector;
pub mod reader;
pub mod registers;
pub mod snapshot;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::GaugeError;
pub use evaluator::{CapacityLevel, ChargeState, ChargeStatus};
pub use fuelgauge_hal::{RegisterTransport, TransportError};
pub use poller::{Poller, PollerState};
pub use projector::{
    BATTERY_PROPERTIES, BatterySupply, MAINS_PROPERTIES, MainsSupply, PowerSupply, Property,
    PropertyValue, SupplyKind,
};
pub use reader::{RefreshOutcome, TelemetryReader};
pub use snapshot::{CAPACITY_UNKNOWN, StateFlags, TelemetrySnapshot};

/// Core Result type
pub type Result<T> = std::result::Result<T, GaugeError>;

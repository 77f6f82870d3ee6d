//! Power-supply property surfaces
//!
//! [`BatterySupply`] and [`MainsSupply`] answer property queries the way a
//! power-supply class device would, in micro-units. Every query first asks
//! the reader for a non-forced refresh; by default a failed refresh is
//! logged and the last good snapshot is served.

use crate::error::GaugeError;
use crate::evaluator::{self, CapacityLevel, ChargeStatus, DESIGN_CAPACITY_MAH, DESIGN_VOLTAGE_MV};
use crate::reader::TelemetryReader;
use crate::snapshot::TelemetrySnapshot;
use fuelgauge_config::TelemetryConfig;
use fuelgauge_hal::RegisterTransport;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Power-supply property identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Status,
    Present,
    VoltageMinDesign,
    VoltageNow,
    CurrentNow,
    PowerNow,
    ChargeFullDesign,
    EnergyFullDesign,
    ChargeFull,
    EnergyFull,
    ChargeNow,
    EnergyNow,
    Capacity,
    CapacityLevel,
    Online,
}

impl Property {
    /// Get sysfs attribute name
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Status => "status",
            Property::Present => "present",
            Property::VoltageMinDesign => "voltage_min_design",
            Property::VoltageNow => "voltage_now",
            Property::CurrentNow => "current_now",
            Property::PowerNow => "power_now",
            Property::ChargeFullDesign => "charge_full_design",
            Property::EnergyFullDesign => "energy_full_design",
            Property::ChargeFull => "charge_full",
            Property::EnergyFull => "energy_full",
            Property::ChargeNow => "charge_now",
            Property::EnergyNow => "energy_now",
            Property::Capacity => "capacity",
            Property::CapacityLevel => "capacity_level",
            Property::Online => "online",
        }
    }

    /// Parse from sysfs attribute name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "status" => Some(Property::Status),
            "present" => Some(Property::Present),
            "voltage_min_design" => Some(Property::VoltageMinDesign),
            "voltage_now" => Some(Property::VoltageNow),
            "current_now" => Some(Property::CurrentNow),
            "power_now" => Some(Property::PowerNow),
            "charge_full_design" => Some(Property::ChargeFullDesign),
            "energy_full_design" => Some(Property::EnergyFullDesign),
            "charge_full" => Some(Property::ChargeFull),
            "energy_full" => Some(Property::EnergyFull),
            "charge_now" => Some(Property::ChargeNow),
            "energy_now" => Some(Property::EnergyNow),
            "capacity" => Some(Property::Capacity),
            "capacity_level" => Some(Property::CapacityLevel),
            "online" => Some(Property::Online),
            _ => None,
        }
    }
}

/// A property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Status(ChargeStatus),
    Level(CapacityLevel),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Status(status) => f.write_str(status.as_str()),
            PropertyValue::Level(level) => f.write_str(level.as_str()),
            PropertyValue::Bool(value) => write!(f, "{}", u8::from(*value)),
            PropertyValue::Int(value) => write!(f, "{}", value),
        }
    }
}

/// Properties the battery surface answers
pub const BATTERY_PROPERTIES: &[Property] = &[
    Property::Status,
    Property::Present,
    Property::VoltageMinDesign,
    Property::VoltageNow,
    Property::CurrentNow,
    Property::PowerNow,
    Property::ChargeFullDesign,
    Property::EnergyFullDesign,
    Property::ChargeFull,
    Property::EnergyFull,
    Property::ChargeNow,
    Property::EnergyNow,
    Property::Capacity,
    Property::CapacityLevel,
];

/// Properties the mains surface answers
pub const MAINS_PROPERTIES: &[Property] = &[Property::Online];

fn micro(value: u32) -> PropertyValue {
    PropertyValue::Int(i64::from(value) * 1000)
}

fn unsupported(property: Property) -> GaugeError {
    GaugeError::UnsupportedAttribute(property.as_str().to_string())
}

/// Battery property for a snapshot
pub fn project_battery(
    property: Property,
    s: &TelemetrySnapshot,
) -> Result<PropertyValue, GaugeError> {
    let value = match property {
        Property::Status => PropertyValue::Status(evaluator::status(s)),
        Property::Present => PropertyValue::Bool(true),
        Property::VoltageMinDesign => micro(DESIGN_VOLTAGE_MV),
        Property::VoltageNow => micro(s.voltage_now_mv),
        // The gauge reports one rate; both units carry it
        Property::CurrentNow | Property::PowerNow => micro(s.rate_now_ma),
        Property::ChargeFullDesign | Property::EnergyFullDesign => micro(DESIGN_CAPACITY_MAH),
        Property::ChargeFull | Property::EnergyFull => micro(s.full_charge_capacity_mah),
        Property::ChargeNow | Property::EnergyNow => micro(s.capacity_now_mah),
        Property::Capacity => PropertyValue::Int(i64::from(evaluator::percentage(s))),
        Property::CapacityLevel => PropertyValue::Level(evaluator::capacity_level(s)),
        Property::Online => return Err(unsupported(property)),
    };
    Ok(value)
}

/// Mains property for a snapshot
pub fn project_mains(
    property: Property,
    s: &TelemetrySnapshot,
) -> Result<PropertyValue, GaugeError> {
    match property {
        Property::Online => Ok(PropertyValue::Bool(evaluator::ac_online(s))),
        other => Err(unsupported(other)),
    }
}

/// Kind of power supply a surface represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyKind {
    Battery,
    Mains,
}

impl SupplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyKind::Battery => "Battery",
            SupplyKind::Mains => "Mains",
        }
    }
}

/// A property-style view over the shared telemetry
pub trait PowerSupply {
    fn name(&self) -> &str;

    fn kind(&self) -> SupplyKind;

    /// Supported properties, in reporting order
    fn properties(&self) -> &'static [Property];

    /// Map one property of an already-fetched snapshot
    fn project(&self, property: Property, s: &TelemetrySnapshot)
        -> Result<PropertyValue, GaugeError>;

    /// Best-effort refresh, then the snapshot to answer from
    fn current_snapshot(&self) -> Result<TelemetrySnapshot, GaugeError>;

    fn get_property(&self, property: Property) -> Result<PropertyValue, GaugeError> {
        let snapshot = self.current_snapshot()?;
        self.project(property, &snapshot)
    }

    fn get_by_name(&self, name: &str) -> Result<PropertyValue, GaugeError> {
        let property =
            Property::parse(name).ok_or_else(|| GaugeError::UnsupportedAttribute(name.into()))?;
        self.get_property(property)
    }

    /// All supported properties from a single snapshot
    fn read_all(&self) -> Result<Vec<(Property, PropertyValue)>, GaugeError> {
        let snapshot = self.current_snapshot()?;
        self.properties()
            .iter()
            .map(|&property| Ok((property, self.project(property, &snapshot)?)))
            .collect()
    }
}

/// Shared refresh policy of both surfaces
struct Source<T> {
    reader: Arc<TelemetryReader<T>>,
    surface_refresh_errors: bool,
}

impl<T: RegisterTransport> Source<T> {
    fn snapshot(&self) -> Result<TelemetrySnapshot, GaugeError> {
        if let Err(e) = self.reader.refresh(false) {
            if self.surface_refresh_errors {
                return Err(e.into());
            }
            tracing::debug!("Serving cached telemetry after refresh failure: {}", e);
        }
        Ok(self.reader.snapshot())
    }
}

/// Battery surface
pub struct BatterySupply<T> {
    name: String,
    source: Source<T>,
}

impl<T: RegisterTransport> BatterySupply<T> {
    pub const DEFAULT_NAME: &'static str = "fuelgauge_battery";

    pub fn new(reader: Arc<TelemetryReader<T>>) -> Self {
        Self::with_config(reader, &TelemetryConfig::default())
    }

    pub fn with_config(reader: Arc<TelemetryReader<T>>, config: &TelemetryConfig) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            source: Source {
                reader,
                surface_refresh_errors: config.surface_refresh_errors,
            },
        }
    }

    pub fn reader(&self) -> &Arc<TelemetryReader<T>> {
        &self.source.reader
    }
}

impl<T: RegisterTransport> PowerSupply for BatterySupply<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SupplyKind {
        SupplyKind::Battery
    }

    fn properties(&self) -> &'static [Property] {
        BATTERY_PROPERTIES
    }

    fn project(
        &self,
        property: Property,
        s: &TelemetrySnapshot,
    ) -> Result<PropertyValue, GaugeError> {
        project_battery(property, s)
    }

    fn current_snapshot(&self) -> Result<TelemetrySnapshot, GaugeError> {
        self.source.snapshot()
    }
}

/// AC adapter surface
pub struct MainsSupply<T> {
    name: String,
    source: Source<T>,
}

impl<T: RegisterTransport> MainsSupply<T> {
    pub const DEFAULT_NAME: &'static str = "fuelgauge_ac";

    pub fn new(reader: Arc<TelemetryReader<T>>) -> Self {
        Self::with_config(reader, &TelemetryConfig::default())
    }

    pub fn with_config(reader: Arc<TelemetryReader<T>>, config: &TelemetryConfig) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            source: Source {
                reader,
                surface_refresh_errors: config.surface_refresh_errors,
            },
        }
    }

    pub fn is_online(&self) -> Result<bool, GaugeError> {
        let snapshot = self.current_snapshot()?;
        Ok(evaluator::ac_online(&snapshot))
    }
}

impl<T: RegisterTransport> PowerSupply for MainsSupply<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SupplyKind {
        SupplyKind::Mains
    }

    fn properties(&self) -> &'static [Property] {
        MAINS_PROPERTIES
    }

    fn project(
        &self,
        property: Property,
        s: &TelemetrySnapshot,
    ) -> Result<PropertyValue, GaugeError> {
        project_mains(property, s)
    }

    fn current_snapshot(&self) -> Result<TelemetrySnapshot, GaugeError> {
        self.source.snapshot()
    }
}

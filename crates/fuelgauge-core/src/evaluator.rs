//! Charge-state inference
//!
//! Pure functions over a [`TelemetrySnapshot`]. The hardware flags are
//! authoritative and are always consulted before any capacity heuristic.

use crate::snapshot::TelemetrySnapshot;
use serde::Serialize;

/// Nominal pack capacity (mAh)
pub const DESIGN_CAPACITY_MAH: u32 = 4800;
/// Nominal minimum pack voltage (mV)
pub const DESIGN_VOLTAGE_MV: u32 = 3800;
/// Remaining capacity at or below which the level is LOW (mAh)
pub const WARN_CAPACITY_MAH: u32 = 800;
/// Discharge rates below this count as idle (mA)
pub const SMALL_DISCHARGE_RATE_MA: u32 = 200;

/// Coarse charge bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CapacityLevel {
    Critical,
    Low,
    Normal,
    Full,
}

impl CapacityLevel {
    /// Get sysfs name
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityLevel::Critical => "Critical",
            CapacityLevel::Low => "Low",
            CapacityLevel::Normal => "Normal",
            CapacityLevel::Full => "Full",
        }
    }
}

/// Battery charging status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChargeStatus {
    Charging,
    Discharging,
    Full,
    Unknown,
}

impl ChargeStatus {
    /// Get sysfs name
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Charging => "Charging",
            ChargeStatus::Discharging => "Discharging",
            ChargeStatus::Full => "Full",
            ChargeStatus::Unknown => "Unknown",
        }
    }
}

fn discharging_meaningfully(s: &TelemetrySnapshot) -> bool {
    s.is_discharging() && s.rate_now_ma >= SMALL_DISCHARGE_RATE_MA
}

/// Whether the battery should be reported as fully charged
pub fn is_full(s: &TelemetrySnapshot) -> bool {
    if s.is_charging() || discharging_meaningfully(s) {
        return false;
    }

    // Not reporting charge
    if !s.capacity_known() || s.capacity_now_mah == 0 {
        return false;
    }

    // Healthy gauges keep full_charge tracking the pack as it ages
    let full = u64::from(s.full_charge_capacity_mah);
    let remaining = u64::from(s.capacity_now_mah);
    if full * 95 <= remaining * 100 {
        return true;
    }

    // Gauges that never learned a full-charge value fall back to design
    DESIGN_CAPACITY_MAH >= s.capacity_now_mah
}

pub fn capacity_level(s: &TelemetrySnapshot) -> CapacityLevel {
    if s.is_critical() {
        CapacityLevel::Critical
    } else if s.capacity_now_mah <= WARN_CAPACITY_MAH {
        CapacityLevel::Low
    } else if is_full(s) {
        CapacityLevel::Full
    } else {
        CapacityLevel::Normal
    }
}

/// Whether external power appears to be present
pub fn ac_online(s: &TelemetrySnapshot) -> bool {
    if s.is_charging() {
        return true;
    }
    !discharging_meaningfully(s)
}

/// Remaining charge as a percentage of the learned full capacity
pub fn percentage(s: &TelemetrySnapshot) -> u8 {
    if !s.capacity_known() || s.capacity_now_mah == 0 || s.full_charge_capacity_mah == 0 {
        return 0;
    }
    let pct = u64::from(s.capacity_now_mah) * 100 / u64::from(s.full_charge_capacity_mah);
    pct.min(100) as u8
}

/// Discharging wins when the raw word carries both direction bits
pub fn status(s: &TelemetrySnapshot) -> ChargeStatus {
    if s.is_discharging() {
        ChargeStatus::Discharging
    } else if s.is_charging() {
        ChargeStatus::Charging
    } else if is_full(s) {
        ChargeStatus::Full
    } else {
        ChargeStatus::Unknown
    }
}

/// Every derived value for one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeState {
    pub status: ChargeStatus,
    pub level: CapacityLevel,
    pub full: bool,
    pub ac_online: bool,
    pub percentage: u8,
}

impl ChargeState {
    pub fn evaluate(s: &TelemetrySnapshot) -> Self {
        Self {
            status: status(s),
            level: capacity_level(s),
            full: is_full(s),
            ac_online: ac_online(s),
            percentage: percentage(s),
        }
    }
}

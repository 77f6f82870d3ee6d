//! Cached telemetry

use bitflags::bitflags;
use std::time::Instant;

bitflags! {
    /// Battery state word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StateFlags: u16 {
        const CHARGING = 0x0001;
        const DISCHARGING = 0x0002;
        const CRITICAL = 0x0004;
    }
}

/// Remaining capacity value meaning "not reporting"
pub const CAPACITY_UNKNOWN: u32 = 0xFFFF_FFFF;

/// One consistent set of gauge readings.
///
/// Only a complete refresh pass produces a new snapshot; a failed pass
/// leaves the previous one in place, `last_refresh` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    /// Last learned full-charge capacity (mAh)
    pub full_charge_capacity_mah: u32,
    pub state_flags: StateFlags,
    /// Magnitude of the charge or discharge rate (mA)
    pub rate_now_ma: u32,
    /// Remaining capacity (mAh), or [`CAPACITY_UNKNOWN`]
    pub capacity_now_mah: u32,
    /// Battery voltage (mV)
    pub voltage_now_mv: u32,
    /// When the gauge was last read successfully
    pub last_refresh: Option<Instant>,
}

impl TelemetrySnapshot {
    /// Build from the five raw words of a pass, in acquisition order
    pub fn from_words(words: [u16; 5], at: Instant) -> Self {
        let [full, status, rate, remaining, voltage] = words;
        Self {
            full_charge_capacity_mah: u32::from(full),
            state_flags: StateFlags::from_bits_retain(status),
            rate_now_ma: u32::from(rate),
            capacity_now_mah: u32::from(remaining),
            voltage_now_mv: u32::from(voltage),
            last_refresh: Some(at),
        }
    }

    /// Whether any pass has completed yet
    pub fn is_populated(&self) -> bool {
        self.last_refresh.is_some()
    }

    pub fn is_charging(&self) -> bool {
        self.state_flags.contains(StateFlags::CHARGING)
    }

    pub fn is_discharging(&self) -> bool {
        self.state_flags.contains(StateFlags::DISCHARGING)
    }

    pub fn is_critical(&self) -> bool {
        self.state_flags.contains(StateFlags::CRITICAL)
    }

    pub fn capacity_known(&self) -> bool {
        self.capacity_now_mah != CAPACITY_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = TelemetrySnapshot::default();
        assert!(!snapshot.is_populated());
        assert_eq!(snapshot.state_flags, StateFlags::empty());
        assert_eq!(snapshot.capacity_now_mah, 0);
    }

    #[test]
    fn test_from_words() {
        let now = Instant::now();
        let snapshot = TelemetrySnapshot::from_words([4200, 0x0002, 500, 4000, 3900], now);

        assert_eq!(snapshot.full_charge_capacity_mah, 4200);
        assert!(snapshot.is_discharging());
        assert!(!snapshot.is_charging());
        assert_eq!(snapshot.rate_now_ma, 500);
        assert_eq!(snapshot.capacity_now_mah, 4000);
        assert_eq!(snapshot.voltage_now_mv, 3900);
        assert_eq!(snapshot.last_refresh, Some(now));
    }

    #[test]
    fn test_unknown_status_bits_retained() {
        let snapshot = TelemetrySnapshot::from_words([0, 0x8005, 0, 0, 0], Instant::now());
        assert!(snapshot.is_charging());
        assert!(snapshot.is_critical());
        assert_eq!(snapshot.state_flags.bits(), 0x8005);
    }

    #[test]
    fn test_capacity_sentinel() {
        let snapshot = TelemetrySnapshot {
            capacity_now_mah: CAPACITY_UNKNOWN,
            ..Default::default()
        };
        assert!(!snapshot.capacity_known());
    }
}

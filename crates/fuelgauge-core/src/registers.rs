//! Gauge register map
//!
//! Every quantity is a 16-bit big-endian word split over two consecutive
//! 8-bit registers, high byte first.

/// Two registers holding one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPair {
    pub name: &'static str,
    pub base: u16,
}

impl RegisterPair {
    pub const fn new(name: &'static str, base: u16) -> Self {
        Self { name, base }
    }

    /// Index of the high byte
    pub const fn high(&self) -> u16 {
        self.base
    }

    /// Index of the low byte
    pub const fn low(&self) -> u16 {
        self.base + 1
    }
}

pub const FULL_CHARGE_CAPACITY: RegisterPair = RegisterPair::new("full_charge_capacity", 0x144);
pub const STATUS: RegisterPair = RegisterPair::new("status", 0x1A0);
pub const PRESENT_RATE: RegisterPair = RegisterPair::new("present_rate", 0x1A2);
pub const REMAINING_CAPACITY: RegisterPair = RegisterPair::new("remaining_capacity", 0x1A4);
pub const PRESENT_VOLTAGE: RegisterPair = RegisterPair::new("present_voltage", 0x1A6);

/// Order of one refresh pass
pub const ACQUISITION_ORDER: [RegisterPair; 5] = [
    FULL_CHARGE_CAPACITY,
    STATUS,
    PRESENT_RATE,
    REMAINING_CAPACITY,
    PRESENT_VOLTAGE,
];

/// Single-register transactions in one full pass
pub const TRANSACTIONS_PER_PASS: usize = ACQUISITION_ORDER.len() * 2;

/// Join a high and low byte
pub fn compose(high: u8, low: u8) -> u16 {
    u16::from_be_bytes([high, low])
}

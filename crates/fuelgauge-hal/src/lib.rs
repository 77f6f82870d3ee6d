//! Hardware Abstraction Layer (HAL)
//!
//! This crate provides the bus side of the fuelgauge engine: the
//! [`RegisterTransport`] seam the telemetry reader talks through, the two
//! wire protocols the gauge firmware has shipped with, the Linux i2c-dev
//! bus and mock backends for testing without hardware.
//!
//! # Example
//!
//! ```no_run
//! use fuelgauge_hal::{I2cTransport, Protocol, RegisterTransport};
//!
//! fn main() -> Result<(), fuelgauge_hal::TransportError> {
//!     let bus = fuelgauge_hal::linux::open_bus("/dev/i2c-0")?;
//!     let mut transport = I2cTransport::new(bus, 0x10, Protocol::IndexedCommand);
//!
//!     // High byte of the status word
//!     let status_hi = transport.read_register(0x1A0)?;
//!     println!("status high byte: {status_hi:#04x}");
//!     Ok(())
//! }
//! ```

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;
pub mod transport;

#[cfg(target_os = "linux")]
pub use linux::{I2cdev, open_bus};
pub use transport::{
    DATA_COMMAND, DEFAULT_ADDRESS, I2cTransport, INDEX_COMMAND, Protocol, RegisterTransport,
    TransportError,
};

/// HAL Result type
pub type Result<T> = std::result::Result<T, TransportError>;

//! Indexed register transport
//!
//! The gauge exposes its telemetry as 8-bit registers behind a 16-bit index.
//! Reading one register is a two-phase transaction: select the index with
//! the index command, then fetch one byte with the data command. Two wire
//! encodings of that exchange exist in the field; both are provided here and
//! picked once at construction through [`Protocol`].

use embedded_hal::i2c::{ErrorKind, I2c, NoAcknowledgeSource, SevenBitAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bus address the gauge answers on
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x10;

/// Control byte that selects a register index
pub const INDEX_COMMAND: u8 = 0x82;

/// Control byte that reads the selected register
pub const DATA_COMMAND: u8 = 0x80;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device did not acknowledge")]
    NoAcknowledge,

    #[error("Bus transaction timed out")]
    Timeout,

    #[error("Device not present on the bus")]
    DeviceAbsent,

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Translate an embedded-hal bus error
    pub fn from_i2c<E: embedded_hal::i2c::Error>(err: E) -> Self {
        match err.kind() {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => TransportError::DeviceAbsent,
            ErrorKind::NoAcknowledge(_) => TransportError::NoAcknowledge,
            _ => TransportError::Bus(format!("{:?}", err)),
        }
    }
}

/// Something that can perform one indexed register read.
///
/// Implementations must either return the byte or fail promptly; callers
/// never retry on their own.
pub trait RegisterTransport: Send {
    fn read_register(&mut self, index: u16) -> Result<u8, TransportError>;
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read_register(&mut self, index: u16) -> Result<u8, TransportError> {
        (**self).read_register(index)
    }
}

/// Wire encoding of the indexed register read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// Block-write `[INDEX, hi, lo]`, then read-byte-data on `DATA`
    /// (write `[DATA]`, repeated start, read one byte).
    #[default]
    IndexedCommand,
    /// Write `[INDEX, hi, lo]`, write `[DATA]`, then a bare one-byte read.
    SequentialSendReceive,
}

impl Protocol {
    /// Get config name
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::IndexedCommand => "indexed-command",
            Protocol::SequentialSendReceive => "sequential-send-receive",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "indexed-command" => Some(Protocol::IndexedCommand),
            "sequential-send-receive" => Some(Protocol::SequentialSendReceive),
            _ => None,
        }
    }
}

/// Register transport over any embedded-hal I2C bus
pub struct I2cTransport<I> {
    i2c: I,
    address: SevenBitAddress,
    protocol: Protocol,
}

impl<I: I2c> I2cTransport<I> {
    pub fn new(i2c: I, address: SevenBitAddress, protocol: Protocol) -> Self {
        Self {
            i2c,
            address,
            protocol,
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Give the bus back
    pub fn release(self) -> I {
        self.i2c
    }

    fn select(&mut self, index: u16) -> Result<(), TransportError> {
        let [hi, lo] = index.to_be_bytes();
        self.i2c
            .write(self.address, &[INDEX_COMMAND, hi, lo])
            .map_err(TransportError::from_i2c)
    }

    fn fetch(&mut self) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        match self.protocol {
            Protocol::IndexedCommand => self
                .i2c
                .write_read(self.address, &[DATA_COMMAND], &mut buf)
                .map_err(TransportError::from_i2c)?,
            Protocol::SequentialSendReceive => {
                self.i2c
                    .write(self.address, &[DATA_COMMAND])
                    .map_err(TransportError::from_i2c)?;
                self.i2c
                    .read(self.address, &mut buf)
                    .map_err(TransportError::from_i2c)?;
            }
        }
        Ok(buf[0])
    }
}

impl<I: I2c + Send> RegisterTransport for I2cTransport<I> {
    fn read_register(&mut self, index: u16) -> Result<u8, TransportError> {
        self.select(index)?;
        let value = self.fetch()?;
        tracing::trace!("reg {:#05x} = {:#04x}", index, value);
        Ok(value)
    }
}

//! Mock implementations for testing without real hardware
//!
//! [`MockTransport`] stands in for the gauge at the register level: a
//! register file, a log of every read and failure injection. [`MockI2c`]
//! sits one layer lower and records the raw bus operations a transport
//! issues, so wire encodings can be checked byte for byte.
//!
//! # Usage
//!
//! ```
//! use fuelgauge_hal::RegisterTransport;
//! use fuelgauge_hal::mock::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.set_word(0x1A6, 3900);
//!
//! let mut transport = mock.clone();
//! assert_eq!(transport.read_register(0x1A6).unwrap(), 0x0F);
//! assert_eq!(mock.reads(), 1);
//! ```

use crate::transport::{RegisterTransport, TransportError};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared register-level mock state
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Register file; unmapped registers read as zero
    pub registers: HashMap<u16, u8>,
    /// Every register index read, in order
    pub log: Vec<u16>,
    /// Fail the read this many reads from now (1 = next read)
    pub fail_in: Option<usize>,
    /// Fail every read
    pub failing: bool,
}

/// Scriptable fake gauge
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockBusState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Shared state handle
    pub fn state(&self) -> Arc<Mutex<MockBusState>> {
        Arc::clone(&self.state)
    }

    pub fn set_register(&self, index: u16, value: u8) {
        self.lock().registers.insert(index, value);
    }

    /// Store a big-endian word: high byte at `base`, low byte at `base + 1`
    pub fn set_word(&self, base: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        let mut state = self.lock();
        state.registers.insert(base, hi);
        state.registers.insert(base + 1, lo);
    }

    /// Make the `n`th read from now fail once (1-based)
    pub fn fail_nth(&self, n: usize) {
        self.lock().fail_in = Some(n.max(1));
    }

    /// Make every read fail until cleared
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Number of reads attempted since the last `clear_log`
    pub fn reads(&self) -> usize {
        self.lock().log.len()
    }

    pub fn log(&self) -> Vec<u16> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }
}

impl RegisterTransport for MockTransport {
    fn read_register(&mut self, index: u16) -> Result<u8, TransportError> {
        let mut state = self.lock();
        state.log.push(index);

        if state.failing {
            return Err(TransportError::NoAcknowledge);
        }
        if let Some(n) = state.fail_in {
            if n <= 1 {
                state.fail_in = None;
                tracing::debug!("[MOCK] injected failure reading {:#05x}", index);
                return Err(TransportError::Timeout);
            }
            state.fail_in = Some(n - 1);
        }

        Ok(state.registers.get(&index).copied().unwrap_or(0))
    }
}

/// One recorded bus operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Write(SevenBitAddress, Vec<u8>),
    Read(SevenBitAddress, usize),
    WriteRead(SevenBitAddress, Vec<u8>, usize),
    /// Any other operation sequence, by length
    Transaction(SevenBitAddress, usize),
}

#[derive(Debug, Default)]
struct MockI2cState {
    ops: Vec<BusOp>,
    reads: VecDeque<u8>,
    error: Option<ErrorKind>,
}

/// Recording embedded-hal I2C bus
#[derive(Debug, Clone, Default)]
pub struct MockI2c {
    state: Arc<Mutex<MockI2cState>>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockI2cState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a byte to be returned by the next read
    pub fn push_read(&self, value: u8) {
        self.lock().reads.push_back(value);
    }

    /// Fail every operation with `kind`
    pub fn fail_with(&self, kind: ErrorKind) {
        self.lock().error = Some(kind);
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.lock().ops.clone()
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.lock();

        let op = match &*operations {
            [Operation::Write(bytes)] => BusOp::Write(address, bytes.to_vec()),
            [Operation::Read(buf)] => BusOp::Read(address, buf.len()),
            [Operation::Write(bytes), Operation::Read(buf)] => {
                BusOp::WriteRead(address, bytes.to_vec(), buf.len())
            }
            ops => BusOp::Transaction(address, ops.len()),
        };
        state.ops.push(op);

        if let Some(kind) = state.error {
            return Err(kind);
        }

        for operation in operations.iter_mut() {
            if let Operation::Read(buf) = operation {
                for byte in buf.iter_mut() {
                    *byte = state.reads.pop_front().unwrap_or(0);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_registers() {
        let mock = MockTransport::new();
        mock.set_word(0x1A4, 0x1234);

        let mut transport = mock.clone();
        assert_eq!(transport.read_register(0x1A4).unwrap(), 0x12);
        assert_eq!(transport.read_register(0x1A5).unwrap(), 0x34);
        assert_eq!(transport.read_register(0x300).unwrap(), 0x00);
        assert_eq!(mock.log(), vec![0x1A4, 0x1A5, 0x300]);
    }

    #[test]
    fn test_mock_transport_fail_nth() {
        let mock = MockTransport::new();
        mock.fail_nth(2);

        let mut transport = mock.clone();
        assert!(transport.read_register(0x144).is_ok());
        assert!(matches!(
            transport.read_register(0x145),
            Err(TransportError::Timeout)
        ));
        // One-shot
        assert!(transport.read_register(0x145).is_ok());
        assert_eq!(mock.reads(), 3);
    }

    #[test]
    fn test_mock_transport_failing() {
        let mock = MockTransport::new();
        let mut transport = mock.clone();

        mock.set_failing(true);
        assert!(transport.read_register(0x1A0).is_err());
        mock.set_failing(false);
        assert!(transport.read_register(0x1A0).is_ok());

        mock.clear_log();
        assert_eq!(mock.reads(), 0);
    }

    #[test]
    fn test_mock_i2c_records_ops() {
        let mut bus = MockI2c::new();
        bus.push_read(0xAB);

        bus.write(0x10, &[1, 2]).unwrap();
        let mut buf = [0u8; 1];
        bus.write_read(0x10, &[3], &mut buf).unwrap();

        assert_eq!(buf[0], 0xAB);
        assert_eq!(
            bus.ops(),
            vec![
                BusOp::Write(0x10, vec![1, 2]),
                BusOp::WriteRead(0x10, vec![3], 1),
            ]
        );
    }
}

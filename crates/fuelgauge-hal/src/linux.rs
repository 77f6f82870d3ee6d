//! Linux i2c-dev bus backend
//!
//! [`I2cdev`] from linux-embedded-hal implements the embedded-hal `I2c`
//! trait over `/dev/i2c-N`, so it plugs straight into
//! [`I2cTransport`](crate::I2cTransport). Combined write/read exchanges go
//! out as one `I2C_RDWR` transfer with a repeated start.

pub use linux_embedded_hal::I2cdev;

use crate::TransportError;
use std::path::Path;

/// Open an i2c-dev adapter node such as `/dev/i2c-0`
pub fn open_bus(path: impl AsRef<Path>) -> Result<I2cdev, TransportError> {
    let path = path.as_ref();
    let bus = I2cdev::new(path).map_err(|e| TransportError::Io(std::io::Error::other(e)))?;
    tracing::info!("Opened I2C adapter {}", path.display());
    Ok(bus)
}

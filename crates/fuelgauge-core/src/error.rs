use fuelgauge_hal::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GaugeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Unsupported attribute: {0}")]
    UnsupportedAttribute(String),
}

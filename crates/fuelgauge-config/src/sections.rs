//! Configuration sections

use fuelgauge_hal::{DEFAULT_ADDRESS, Protocol};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Telemetry cache behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Minimum age of the snapshot before a non-forced refresh hits the bus
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ms: u64,

    /// Return refresh failures from property reads instead of serving the
    /// stale snapshot
    #[serde(default)]
    pub surface_refresh_errors: bool,
}

fn default_cache_ttl() -> u64 {
    1000
}

impl TelemetryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl(),
            surface_refresh_errors: false,
        }
    }
}

/// Background refresh schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Steady-state period between passes
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Delay before the first pass after a resume
    #[serde(default = "default_resume_delay")]
    pub resume_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

// 60 base ticks of one second
fn default_interval() -> u64 {
    60_000
}

fn default_resume_delay() -> u64 {
    1000
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval(),
            resume_delay_ms: default_resume_delay(),
        }
    }
}

/// Where the gauge lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// i2c-dev adapter node
    #[serde(default = "default_device")]
    pub device: PathBuf,

    /// 7-bit slave address
    #[serde(default = "default_address")]
    pub address: u8,

    /// Wire encoding of register reads
    #[serde(default)]
    pub protocol: Protocol,
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/i2c-0")
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            address: default_address(),
            protocol: Protocol::default(),
        }
    }
}

/// Daemon reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// How often the daemon logs a telemetry summary
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,
}

fn default_report_interval() -> u64 {
    60_000
}

impl DaemonConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: default_report_interval(),
        }
    }
}

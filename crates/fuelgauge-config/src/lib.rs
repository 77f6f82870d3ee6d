//! Configuration management for fuelgauge
//!
//! Handles telemetry cache tuning, the background poll schedule, bus
//! location and daemon settings. TOML-based config files; every field has a
//! default so an empty file is a valid configuration.

mod sections;

pub use sections::{BusConfig, DaemonConfig, PollerConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/fuelgauge";
pub const USER_CONFIG_DIR: &str = "/var/lib/fuelgauge";
pub const CONFIG_FILE: &str = "fuelgauge.toml";

/// Main fuelgauge configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl GaugeConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// The system file is the base; keys present in the user file override
    /// it.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_layered(
            &Path::new(CONFIG_DIR).join(CONFIG_FILE),
            &Path::new(USER_CONFIG_DIR).join(CONFIG_FILE),
        )
    }

    /// Load `base`, then overlay `overlay` on top; either may be missing
    pub fn load_layered(base: &Path, overlay: &Path) -> Result<Self, ConfigError> {
        let mut merged: Option<toml::Value> = None;

        for path in [base, overlay] {
            if !path.exists() {
                continue;
            }
            let value: toml::Value = toml::from_str(&std::fs::read_to_string(path)?)?;
            tracing::debug!("Loaded configuration layer {}", path.display());
            match merged.as_mut() {
                Some(existing) => merge_toml(existing, value),
                None => merged = Some(value),
            }
        }

        let Some(merged) = merged else {
            tracing::warn!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        let config: Self = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.address > 0x7F {
            return Err(ConfigError::Invalid(format!(
                "bus address {:#04x} is not a 7-bit address",
                self.bus.address
            )));
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poller.interval_ms must be greater than zero".into(),
            ));
        }
        if self.daemon.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "daemon.report_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Helper function to merge TOML values
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelgauge_hal::Protocol;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = GaugeConfig::default();
        assert_eq!(config.telemetry.cache_ttl(), Duration::from_millis(1000));
        assert!(!config.telemetry.surface_refresh_errors);
        assert_eq!(config.poller.interval(), Duration::from_secs(60));
        assert_eq!(config.poller.resume_delay(), Duration::from_secs(1));
        assert_eq!(config.bus.address, 0x10);
        assert_eq!(config.bus.protocol, Protocol::IndexedCommand);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: GaugeConfig = toml::from_str("").unwrap();
        assert_eq!(config, GaugeConfig::default());
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = GaugeConfig::default();
        config.telemetry.cache_ttl_ms = 250;
        config.bus.protocol = Protocol::SequentialSendReceive;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GaugeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[telemetry]
cache_ttl_ms = 500

[bus]
device = "/dev/i2c-3"
protocol = "sequential-send-receive"
"#
        )
        .unwrap();

        let config = GaugeConfig::load(file.path()).unwrap();
        assert_eq!(config.telemetry.cache_ttl_ms, 500);
        assert_eq!(config.bus.device, PathBuf::from("/dev/i2c-3"));
        assert_eq!(config.bus.protocol, Protocol::SequentialSendReceive);
        // Untouched sections keep their defaults
        assert_eq!(config.poller, PollerConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = GaugeConfig::load(Path::new("/nonexistent/fuelgauge.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GaugeConfig::default();
        config.bus.address = 0x90;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GaugeConfig::default();
        config.poller.interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_layered_overlay_wins() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.toml");
        let overlay = dir.path().join("overlay.toml");

        std::fs::write(
            &base,
            "[telemetry]\ncache_ttl_ms = 2000\n\n[poller]\ninterval_ms = 30000\n",
        )
        .unwrap();
        std::fs::write(&overlay, "[telemetry]\ncache_ttl_ms = 100\n").unwrap();

        let config = GaugeConfig::load_layered(&base, &overlay).unwrap();
        assert_eq!(config.telemetry.cache_ttl_ms, 100);
        assert_eq!(config.poller.interval_ms, 30000);
    }

    #[test]
    fn test_load_layered_nothing_present() {
        let dir = TempDir::new().unwrap();
        let config =
            GaugeConfig::load_layered(&dir.path().join("a.toml"), &dir.path().join("b.toml"))
                .unwrap();
        assert_eq!(config, GaugeConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = GaugeConfig::default();
        config.poller.resume_delay_ms = 50;
        config.save(&path).unwrap();

        assert_eq!(GaugeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_merge_toml() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();
        merge_toml(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["b"]["z"].as_integer(), Some(4));
    }
}

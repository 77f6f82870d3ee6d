//! Text and JSON renderings of the power-supply surfaces

use anyhow::Result;
use fuelgauge_core::{GaugeError, PowerSupply};
use serde_json::{Map, Value};

/// `POWER_SUPPLY_<NAME>=<value>` lines, uevent style
pub fn uevent_lines(supply: &dyn PowerSupply) -> std::result::Result<Vec<String>, GaugeError> {
    let mut lines = vec![
        format!("POWER_SUPPLY_NAME={}", supply.name()),
        format!("POWER_SUPPLY_TYPE={}", supply.kind().as_str()),
    ];
    for (property, value) in supply.read_all()? {
        lines.push(format!(
            "POWER_SUPPLY_{}={}",
            property.as_str().to_ascii_uppercase(),
            value
        ));
    }
    Ok(lines)
}

/// One object per surface, keyed by surface name
pub fn to_json(supplies: &[&dyn PowerSupply]) -> Result<Value> {
    let mut root = Map::new();
    for supply in supplies {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::from(supply.kind().as_str()));
        for (property, value) in supply.read_all()? {
            fields.insert(property.as_str().into(), serde_json::to_value(value)?);
        }
        root.insert(supply.name().to_string(), Value::Object(fields));
    }
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelgauge_config::TelemetryConfig;
    use fuelgauge_core::{BatterySupply, MainsSupply, TelemetryReader};
    use fuelgauge_hal::mock::MockTransport;
    use std::sync::Arc;

    fn supplies() -> (BatterySupply<MockTransport>, MainsSupply<MockTransport>) {
        let gauge = MockTransport::new();
        gauge.set_word(0x144, 4200);
        gauge.set_word(0x1A0, 0x2);
        gauge.set_word(0x1A2, 500);
        gauge.set_word(0x1A4, 4000);
        gauge.set_word(0x1A6, 3850);
        let reader = Arc::new(TelemetryReader::new(gauge));
        (
            BatterySupply::new(Arc::clone(&reader)),
            MainsSupply::new(reader),
        )
    }

    #[test]
    fn test_uevent_lines() {
        let (battery, mains) = supplies();

        let lines = uevent_lines(&battery).unwrap();
        assert_eq!(lines[0], "POWER_SUPPLY_NAME=fuelgauge_battery");
        assert_eq!(lines[1], "POWER_SUPPLY_TYPE=Battery");
        assert!(lines.contains(&"POWER_SUPPLY_STATUS=Discharging".to_string()));
        assert!(lines.contains(&"POWER_SUPPLY_VOLTAGE_NOW=3850000".to_string()));
        assert!(lines.contains(&"POWER_SUPPLY_CAPACITY_LEVEL=Normal".to_string()));
        assert!(lines.contains(&"POWER_SUPPLY_PRESENT=1".to_string()));

        let lines = uevent_lines(&mains).unwrap();
        assert_eq!(lines.last().unwrap(), "POWER_SUPPLY_ONLINE=0");
    }

    #[test]
    fn test_json_report() {
        let (battery, mains) = supplies();

        let json = to_json(&[&battery, &mains]).unwrap();
        assert_eq!(json["fuelgauge_battery"]["type"], "Battery");
        assert_eq!(json["fuelgauge_battery"]["status"], "Discharging");
        assert_eq!(json["fuelgauge_battery"]["charge_now"], 4_000_000);
        assert_eq!(json["fuelgauge_battery"]["capacity"], 95);
        assert_eq!(json["fuelgauge_ac"]["online"], false);
    }

    #[test]
    fn test_json_report_propagates_errors() {
        let gauge = MockTransport::new();
        gauge.set_failing(true);
        let config = TelemetryConfig {
            surface_refresh_errors: true,
            ..Default::default()
        };
        let reader = Arc::new(TelemetryReader::new(gauge));
        let battery = BatterySupply::with_config(reader, &config);

        let err = to_json(&[&battery]).unwrap_err();
        assert!(err.downcast_ref::<GaugeError>().is_some());
    }
}

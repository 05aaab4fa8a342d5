pub mod bus_config;
pub mod sensor_config;

pub use bus_config::{load_bus_config, parse_bus_config, BusConfig, BusEntry};
pub use sensor_config::{load_sensor_config, parse_sensor_config, SensorConfig, SensorEntry};

use crate::bus::BusType;
use crate::errors::{ConfigError, ConfigResult};
use crate::sensors::is_supported_driver;
use std::collections::HashSet;

/// Directory used when `CONFIG_PATH` is unset
pub const DEFAULT_CONFIG_DIR: &str = "config";

pub fn config_dir() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string())
}

/// Load and validate `buses.toml` and `sensors.toml` from `dir`
pub fn load_config(dir: &str) -> ConfigResult<(BusConfig, SensorConfig)> {
    let buses = load_bus_config(&format!("{}/buses.toml", dir))?;
    let sensors = load_sensor_config(&format!("{}/sensors.toml", dir))?;
    validate(&buses, &sensors)?;
    Ok((buses, sensors))
}

/// Cross-file checks that serde cannot express
pub fn validate(buses: &BusConfig, sensors: &SensorConfig) -> ConfigResult<()> {
    let mut bus_ids = HashSet::new();
    for bus in &buses.buses {
        if BusType::from_str(&bus.r#type).is_none() {
            return Err(ConfigError::InvalidValue {
                field: format!("bus.{}.type", bus.id),
                reason: format!("unknown bus type '{}'", bus.r#type),
            });
        }
        if !bus_ids.insert(bus.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate bus id '{}'",
                bus.id
            )));
        }
    }

    if sensors.sensors.is_empty() {
        return Err(ConfigError::ValidationError(
            "no sensors configured".to_string(),
        ));
    }

    let mut sensor_ids = HashSet::new();
    for sensor in &sensors.sensors {
        if !sensor_ids.insert(sensor.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate sensor id '{}'",
                sensor.id
            )));
        }
        if !bus_ids.contains(sensor.bus.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: format!("sensor.{}.bus", sensor.id),
                reason: format!("bus '{}' is not declared", sensor.bus),
            });
        }
        if !is_supported_driver(&sensor.driver) {
            return Err(ConfigError::InvalidValue {
                field: format!("sensor.{}.driver", sensor.id),
                reason: format!("unsupported driver '{}'", sensor.driver),
            });
        }
        if sensor.frequency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: format!("sensor.{}.frequency", sensor.id),
                reason: "must be greater than zero".to_string(),
            });
        }
    }

    Ok(())
}

use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// Root configuration struct expecting `[[sensor]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "sensor", default)]
    pub sensors: Vec<SensorEntry>,
}

/// One sensor entry, matching each `[[sensor]]` section.
///
/// Driver-specific settings stay in their raw form here and are checked by
/// the driver that consumes them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub driver: String,
    pub bus: String,
    pub address: Option<u8>,
    /// Poll rate in Hz
    pub frequency: Option<u32>,
    #[serde(default)]
    pub verify_identity: bool,

    // lsm303d
    pub accel_range: Option<String>,
    pub mag_range: Option<String>,

    // hdc100x
    pub temperature_resolution: Option<u8>,
    pub humidity_resolution: Option<u8>,
    pub heater: Option<bool>,
    pub settle_delay_ms: Option<u64>,
}

/// Loads config from TOML file
pub fn load_sensor_config(path: &str) -> ConfigResult<SensorConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_sensor_config(&content)
}

pub fn parse_sensor_config(content: &str) -> ConfigResult<SensorConfig> {
    let parsed: SensorConfig = toml::from_str(content)?;
    Ok(parsed)
}

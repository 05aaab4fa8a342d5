use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;

/// Root structure for loading `[[bus]]` style TOML config
#[derive(Debug, Deserialize)]
pub struct BusConfig {
    #[serde(rename = "bus", default)]
    pub buses: Vec<BusEntry>,
}

/// One bus entry, e.g. `/dev/i2c-1`
#[derive(Debug, Clone, Deserialize)]
pub struct BusEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub path: String,
}

/// Load bus config file
pub fn load_bus_config(path: &str) -> ConfigResult<BusConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_bus_config(&content)
}

pub fn parse_bus_config(content: &str) -> ConfigResult<BusConfig> {
    let parsed: BusConfig = toml::from_str(content)?;
    Ok(parsed)
}

//! TI HDC1000 / HDC1080 temperature and humidity sensor.
//!
//! A measurement is triggered by writing the result register address; the
//! conversion runs asynchronously inside the device and there is no ready
//! flag on this protocol, so every read waits a fixed settle delay before
//! fetching the two result bytes.

use super::{SensorDataFrame, SensorDriver};
use crate::bus::{I2cBus, SharedBus};
use crate::config::SensorEntry;
use crate::errors::{SensorError, SensorResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

pub const DRIVER_NAME: &str = "hdc100x";
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Conversion time budget after a measurement command
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(65);

// Register addresses
const TEMPERATURE: u8 = 0x00;
const HUMIDITY: u8 = 0x01;
const CONFIG_REGISTER: u8 = 0x02;
const MANUFACTURER_ID: u8 = 0xFE;
const DEVICE_ID: u8 = 0xFF;

// Configuration register bits
const CONFIG_HEAT: u16 = 1 << 13;
const CONFIG_TRES_11: u16 = 1 << 10;
const CONFIG_HRES_11: u16 = 1 << 8;
const CONFIG_HRES_8: u16 = 1 << 9;

/// "TI" in ASCII
const TI_MANUFACTURER_ID: u16 = 0x5449;
const HDC1000_DEVICE_ID: u16 = 0x1000;
const HDC1080_DEVICE_ID: u16 = 0x1050;
const ACCEPTED_DEVICE_IDS: [u16; 2] = [HDC1000_DEVICE_ID, HDC1080_DEVICE_ID];

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TemperatureResolution {
    #[default]
    Bits14,
    Bits11,
}

impl TemperatureResolution {
    fn bits(self) -> u16 {
        match self {
            TemperatureResolution::Bits14 => 0,
            TemperatureResolution::Bits11 => CONFIG_TRES_11,
        }
    }

    pub fn from_config(bits: u8) -> Option<Self> {
        match bits {
            14 => Some(TemperatureResolution::Bits14),
            11 => Some(TemperatureResolution::Bits11),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HumidityResolution {
    #[default]
    Bits14,
    Bits11,
    Bits8,
}

impl HumidityResolution {
    fn bits(self) -> u16 {
        match self {
            HumidityResolution::Bits14 => 0,
            HumidityResolution::Bits11 => CONFIG_HRES_11,
            HumidityResolution::Bits8 => CONFIG_HRES_8,
        }
    }

    pub fn from_config(bits: u8) -> Option<Self> {
        match bits {
            14 => Some(HumidityResolution::Bits14),
            11 => Some(HumidityResolution::Bits11),
            8 => Some(HumidityResolution::Bits8),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hdc100xConfig {
    /// Sensor id reported in errors and logs
    pub sensor: String,
    pub address: u8,
    pub temperature_resolution: TemperatureResolution,
    pub humidity_resolution: HumidityResolution,
    pub heater: bool,
    pub settle_delay: Duration,
}

impl Default for Hdc100xConfig {
    fn default() -> Self {
        Self {
            sensor: DRIVER_NAME.to_string(),
            address: DEFAULT_ADDRESS,
            temperature_resolution: TemperatureResolution::default(),
            humidity_resolution: HumidityResolution::default(),
            heater: false,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl Hdc100xConfig {
    pub fn from_entry(entry: &SensorEntry) -> SensorResult<Self> {
        let mut config = Self {
            sensor: entry.id.clone(),
            address: entry.address.unwrap_or(DEFAULT_ADDRESS),
            heater: entry.heater.unwrap_or(false),
            ..Self::default()
        };
        if let Some(bits) = entry.temperature_resolution {
            config.temperature_resolution = TemperatureResolution::from_config(bits)
                .ok_or_else(|| SensorError::ConfigError {
                    sensor: entry.id.clone(),
                    reason: format!("temperature_resolution must be 14 or 11, got {}", bits),
                })?;
        }
        if let Some(bits) = entry.humidity_resolution {
            config.humidity_resolution = HumidityResolution::from_config(bits)
                .ok_or_else(|| SensorError::ConfigError {
                    sensor: entry.id.clone(),
                    reason: format!("humidity_resolution must be 14, 11 or 8, got {}", bits),
                })?;
        }
        if let Some(ms) = entry.settle_delay_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Value of the 16-bit configuration register
    fn config_bits(&self) -> u16 {
        let heat = if self.heater { CONFIG_HEAT } else { 0 };
        heat | self.temperature_resolution.bits() | self.humidity_resolution.bits()
    }
}

pub fn celsius(raw: u16) -> f64 {
    (f64::from(raw) / 65536.0) * 165.0 - 40.0
}

pub fn fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// Relative humidity in percent
pub fn relative_humidity(raw: u16) -> f64 {
    (f64::from(raw) / 65536.0) * 100.0
}

pub struct Hdc100x<B> {
    bus: SharedBus<B>,
    config: Hdc100xConfig,
}

impl<B: I2cBus> Hdc100x<B> {
    /// Put the device in a known addressing state.
    ///
    /// With every configuration bit clear only the configuration register
    /// address is written; otherwise the full register value follows it.
    pub async fn new(bus: SharedBus<B>, config: Hdc100xConfig) -> SensorResult<Self> {
        let address = config.address;
        let bits = config.config_bits();
        {
            let mut guard = bus.lock().await;
            let written = if bits == 0 {
                guard.write_byte(address, CONFIG_REGISTER).await
            } else {
                let [msb, lsb] = bits.to_be_bytes();
                guard.write_bytes(address, &[CONFIG_REGISTER, msb, lsb]).await
            };
            written.map_err(|e| SensorError::init(&config.sensor, CONFIG_REGISTER, e))?;
        }
        debug!(
            "[{}] configured at {:#04x}, config register {:#06x}",
            config.sensor, address, bits
        );

        Ok(Self { bus, config })
    }

    pub fn config(&self) -> &Hdc100xConfig {
        &self.config
    }

    /// Temperature in degrees Fahrenheit
    pub async fn temperature(&self) -> SensorResult<f64> {
        Ok(fahrenheit(self.temperature_celsius().await?))
    }

    pub async fn temperature_celsius(&self) -> SensorResult<f64> {
        let raw = self.measure(TEMPERATURE).await?;
        Ok(celsius(raw))
    }

    /// Relative humidity in percent
    pub async fn humidity(&self) -> SensorResult<f64> {
        let raw = self.measure(HUMIDITY).await?;
        Ok(relative_humidity(raw))
    }

    /// Check the manufacturer and device ID registers
    pub async fn verify_identity(&self) -> SensorResult<()> {
        let manufacturer = self.read_register(MANUFACTURER_ID).await?;
        if manufacturer != TI_MANUFACTURER_ID {
            return Err(SensorError::WrongDeviceId {
                sensor: self.config.sensor.clone(),
                expected: vec![TI_MANUFACTURER_ID],
                actual: manufacturer,
            });
        }

        let device = self.read_register(DEVICE_ID).await?;
        if !ACCEPTED_DEVICE_IDS.contains(&device) {
            return Err(SensorError::WrongDeviceId {
                sensor: self.config.sensor.clone(),
                expected: ACCEPTED_DEVICE_IDS.to_vec(),
                actual: device,
            });
        }
        Ok(())
    }

    /// Command, settle, read two bytes. The bus stays locked throughout.
    async fn measure(&self, command: u8) -> SensorResult<u16> {
        let address = self.config.address;
        let mut bus = self.bus.lock().await;
        bus.write_byte(address, command)
            .await
            .map_err(|e| SensorError::bus(address, e))?;

        sleep(self.config.settle_delay).await;

        let mut buf = [0u8; 2];
        bus.read_bytes(address, &mut buf)
            .await
            .map_err(|e| SensorError::bus(address, e))?;
        Ok(u16::from_be_bytes(buf))
    }

    async fn read_register(&self, register: u8) -> SensorResult<u16> {
        let address = self.config.address;
        let mut bus = self.bus.lock().await;
        bus.write_byte(address, register)
            .await
            .map_err(|e| SensorError::bus(address, e))?;

        let mut buf = [0u8; 2];
        bus.read_bytes(address, &mut buf)
            .await
            .map_err(|e| SensorError::bus(address, e))?;
        Ok(u16::from_be_bytes(buf))
    }
}

#[async_trait]
impl<B: I2cBus + 'static> SensorDriver for Hdc100x<B> {
    async fn read_frame(&self) -> SensorResult<SensorDataFrame> {
        let temperature = self.temperature().await?;
        let humidity = self.humidity().await?;
        Ok(SensorDataFrame {
            temperature_f: Some(temperature),
            humidity: Some(humidity),
            ..Default::default()
        })
    }

    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn default_poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}

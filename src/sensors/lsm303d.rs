//! LSM303D accelerometer / magnetometer.
//!
//! Register map and sensitivities follow the ST datasheet (pages 22-29 for
//! the control and output registers).

use super::{SensorDataFrame, SensorDriver};
use crate::bus::{I2cBus, SharedBus};
use crate::config::SensorEntry;
use crate::errors::{SensorError, SensorResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DRIVER_NAME: &str = "lsm303d";
pub const DEFAULT_ADDRESS: u8 = 0x1D;

// Register addresses for the LSM303D
const WHO_AM_I: u8 = 0x0F;
const CTRL1: u8 = 0x20;
const CTRL2: u8 = 0x21;
const CTRL3: u8 = 0x22;
const CTRL4: u8 = 0x23;
const CTRL5: u8 = 0x24;
const CTRL6: u8 = 0x25;
const CTRL7: u8 = 0x26;

const OUT_X_L_M: u8 = 0x08;
const OUT_X_H_M: u8 = 0x09;
const OUT_Y_L_M: u8 = 0x0A;
const OUT_Y_H_M: u8 = 0x0B;
const OUT_Z_L_M: u8 = 0x0C;
const OUT_Z_H_M: u8 = 0x0D;

const OUT_X_L_A: u8 = 0x28;
const OUT_X_H_A: u8 = 0x29;
const OUT_Y_L_A: u8 = 0x2A;
const OUT_Y_H_A: u8 = 0x2B;
const OUT_Z_L_A: u8 = 0x2C;
const OUT_Z_H_A: u8 = 0x2D;

const LSM303D_WAI: u8 = 0x49;

// CTRL1: 50 Hz ODR, X/Y/Z enabled
const ACCEL_ODR_50HZ_XYZ: u8 = 0x57;
// CTRL2 bits 7:6, anti-alias filter 50 Hz
const ACCEL_ANTI_ALIAS_50HZ: u8 = 3 << 6;
const NO_INTERRUPTS: u8 = 0x00;
// CTRL5 bits 4:2
const MAG_ODR_50HZ: u8 = 4 << 2;
const MAG_CONTINUOUS_CONVERSION: u8 = 0x00;

/// Full-scale ±2^15 counts of a signed output word
const FULL_SCALE_COUNTS: f64 = 32768.0;

/// Matches the 50 Hz output data rate set in CTRL1
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Accelerometer full-scale range, AFS bits of CTRL2
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AccelRange {
    /// ±2g
    #[default]
    G2,
    /// ±4g
    G4,
    /// ±6g
    G6,
    /// ±8g
    G8,
    /// ±16g
    G16,
}

impl AccelRange {
    fn afs_bits(self) -> u8 {
        match self {
            AccelRange::G2 => 0b000,
            AccelRange::G4 => 0b001,
            AccelRange::G6 => 0b010,
            AccelRange::G8 => 0b011,
            AccelRange::G16 => 0b100,
        }
    }

    /// Magnitude in g represented by a full-scale output word
    pub fn full_scale(self) -> f64 {
        match self {
            AccelRange::G2 => 2.0,
            AccelRange::G4 => 4.0,
            AccelRange::G6 => 6.0,
            AccelRange::G8 => 8.0,
            AccelRange::G16 => 16.0,
        }
    }

    pub fn from_config(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "2g" => Some(AccelRange::G2),
            "4g" => Some(AccelRange::G4),
            "6g" => Some(AccelRange::G6),
            "8g" => Some(AccelRange::G8),
            "16g" => Some(AccelRange::G16),
            _ => None,
        }
    }
}

/// Magnetometer full-scale range, MFS bits of CTRL6
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MagRange {
    /// ±2 gauss
    #[default]
    Gauss2,
    /// ±4 gauss
    Gauss4,
    /// ±8 gauss
    Gauss8,
    /// ±12 gauss
    Gauss12,
}

impl MagRange {
    fn mfs_bits(self) -> u8 {
        match self {
            MagRange::Gauss2 => 0x00,
            MagRange::Gauss4 => 0x20,
            MagRange::Gauss8 => 0x40,
            MagRange::Gauss12 => 0x60,
        }
    }

    /// Gauss per LSB (datasheet M_GN)
    pub fn sensitivity(self) -> f64 {
        match self {
            MagRange::Gauss2 => 0.080e-3,
            MagRange::Gauss4 => 0.160e-3,
            MagRange::Gauss8 => 0.320e-3,
            MagRange::Gauss12 => 0.479e-3,
        }
    }

    pub fn from_config(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "2gauss" => Some(MagRange::Gauss2),
            "4gauss" => Some(MagRange::Gauss4),
            "8gauss" => Some(MagRange::Gauss8),
            "12gauss" => Some(MagRange::Gauss12),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lsm303dConfig {
    /// Sensor id reported in errors and logs
    pub sensor: String,
    pub address: u8,
    pub accel_range: AccelRange,
    pub mag_range: MagRange,
}

impl Default for Lsm303dConfig {
    fn default() -> Self {
        Self {
            sensor: DRIVER_NAME.to_string(),
            address: DEFAULT_ADDRESS,
            accel_range: AccelRange::default(),
            mag_range: MagRange::default(),
        }
    }
}

impl Lsm303dConfig {
    pub fn from_entry(entry: &SensorEntry) -> SensorResult<Self> {
        let mut config = Self {
            sensor: entry.id.clone(),
            address: entry.address.unwrap_or(DEFAULT_ADDRESS),
            ..Self::default()
        };
        if let Some(range) = &entry.accel_range {
            config.accel_range =
                AccelRange::from_config(range).ok_or_else(|| SensorError::ConfigError {
                    sensor: entry.id.clone(),
                    reason: format!("unknown accel_range '{}'", range),
                })?;
        }
        if let Some(range) = &entry.mag_range {
            config.mag_range =
                MagRange::from_config(range).ok_or_else(|| SensorError::ConfigError {
                    sensor: entry.id.clone(),
                    reason: format!("unknown mag_range '{}'", range),
                })?;
        }
        Ok(config)
    }

    /// (register, value) pairs written at construction, in order
    fn init_sequence(&self) -> [(u8, u8); 7] {
        [
            (CTRL1, ACCEL_ODR_50HZ_XYZ),
            (CTRL2, ACCEL_ANTI_ALIAS_50HZ | (self.accel_range.afs_bits() << 3)),
            (CTRL3, NO_INTERRUPTS),
            (CTRL4, NO_INTERRUPTS),
            (CTRL5, MAG_ODR_50HZ),
            (CTRL6, self.mag_range.mfs_bits()),
            (CTRL7, MAG_CONTINUOUS_CONVERSION),
        ]
    }
}

/// Convert a signed output word to g for the given full-scale range
pub fn axis_value(raw: i16, full_scale: f64) -> f64 {
    f64::from(raw) / FULL_SCALE_COUNTS * full_scale
}

pub struct Lsm303d<B> {
    bus: SharedBus<B>,
    config: Lsm303dConfig,
}

impl<B: I2cBus> Lsm303d<B> {
    /// Write the control registers and return a ready driver.
    ///
    /// Stops at the first failed write and reports which register it was.
    pub async fn new(bus: SharedBus<B>, config: Lsm303dConfig) -> SensorResult<Self> {
        {
            let mut guard = bus.lock().await;
            for (register, value) in config.init_sequence() {
                guard
                    .write_byte_to_register(config.address, register, value)
                    .await
                    .map_err(|e| SensorError::init(&config.sensor, register, e))?;
            }
        }
        debug!(
            "[{}] configured at {:#04x}, accel {:?}, mag {:?}",
            config.sensor, config.address, config.accel_range, config.mag_range
        );

        Ok(Self { bus, config })
    }

    pub fn config(&self) -> &Lsm303dConfig {
        &self.config
    }

    /// Acceleration in g on (x, y, z)
    pub async fn read(&self) -> SensorResult<(f64, f64, f64)> {
        let mut bus = self.bus.lock().await;
        let address = self.config.address;
        let x = read_word(&mut *bus, address, OUT_X_H_A, OUT_X_L_A).await?;
        let y = read_word(&mut *bus, address, OUT_Y_H_A, OUT_Y_L_A).await?;
        let z = read_word(&mut *bus, address, OUT_Z_H_A, OUT_Z_L_A).await?;

        let scale = self.config.accel_range.full_scale();
        Ok((
            axis_value(x, scale),
            axis_value(y, scale),
            axis_value(z, scale),
        ))
    }

    /// Magnetic field in gauss on (x, y, z)
    pub async fn magnetometer(&self) -> SensorResult<(f64, f64, f64)> {
        let mut bus = self.bus.lock().await;
        let address = self.config.address;
        let x = read_word(&mut *bus, address, OUT_X_H_M, OUT_X_L_M).await?;
        let y = read_word(&mut *bus, address, OUT_Y_H_M, OUT_Y_L_M).await?;
        let z = read_word(&mut *bus, address, OUT_Z_H_M, OUT_Z_L_M).await?;

        let sensitivity = self.config.mag_range.sensitivity();
        Ok((
            f64::from(x) * sensitivity,
            f64::from(y) * sensitivity,
            f64::from(z) * sensitivity,
        ))
    }

    pub async fn verify_identity(&self) -> SensorResult<()> {
        let address = self.config.address;
        let chip_id = self
            .bus
            .lock()
            .await
            .read_byte_from_register(address, WHO_AM_I)
            .await
            .map_err(|e| SensorError::bus(address, e))?;

        if chip_id != LSM303D_WAI {
            return Err(SensorError::WrongChipId {
                sensor: self.config.sensor.clone(),
                expected: LSM303D_WAI,
                actual: chip_id,
            });
        }
        Ok(())
    }
}

/// High byte then low byte, as two single-register reads
async fn read_word<B: I2cBus>(bus: &mut B, address: u8, high: u8, low: u8) -> SensorResult<i16> {
    let high = bus
        .read_byte_from_register(address, high)
        .await
        .map_err(|e| SensorError::bus(address, e))?;
    let low = bus
        .read_byte_from_register(address, low)
        .await
        .map_err(|e| SensorError::bus(address, e))?;
    Ok(i16::from_be_bytes([high, low]))
}

#[async_trait]
impl<B: I2cBus + 'static> SensorDriver for Lsm303d<B> {
    async fn read_frame(&self) -> SensorResult<SensorDataFrame> {
        let (ax, ay, az) = self.read().await?;
        let (mx, my, mz) = self.magnetometer().await?;
        Ok(SensorDataFrame {
            accel: Some([ax, ay, az]),
            mag: Some([mx, my, mz]),
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

#[cfg(feature = "hdc100x")]
pub mod hdc100x;
#[cfg(feature = "lsm303d")]
pub mod lsm303d;

use crate::bus::{I2cBus, SharedBus};
use crate::config::SensorEntry;
use crate::errors::{SensorError, SensorResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// One reading from any driver; fields a driver does not measure stay `None`
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SensorDataFrame {
    /// Acceleration in g (x, y, z)
    pub accel: Option<[f64; 3]>,
    /// Magnetic field in gauss (x, y, z)
    pub mag: Option<[f64; 3]>,
    pub temperature_f: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
}

/// Driver as seen by the registry and the poller
#[async_trait]
pub trait SensorDriver: Send + Sync {
    /// Take a fresh reading of everything the device measures
    async fn read_frame(&self) -> SensorResult<SensorDataFrame>;

    fn name(&self) -> &'static str;

    /// Poll period used when the sensor entry gives no frequency
    fn default_poll_interval(&self) -> Duration;
}

pub static SUPPORTED_DRIVERS: &[&str] = &[
    #[cfg(feature = "lsm303d")]
    lsm303d::DRIVER_NAME,
    #[cfg(feature = "hdc100x")]
    hdc100x::DRIVER_NAME,
];

pub fn is_supported_driver(driver: &str) -> bool {
    SUPPORTED_DRIVERS.contains(&driver)
}

/// Construct and initialize the driver named by `entry.driver` on `bus`
pub async fn create_sensor_driver<B>(
    entry: &SensorEntry,
    bus: SharedBus<B>,
) -> SensorResult<Box<dyn SensorDriver>>
where
    B: I2cBus + 'static,
{
    match entry.driver.as_str() {
        #[cfg(feature = "lsm303d")]
        lsm303d::DRIVER_NAME => {
            let config = lsm303d::Lsm303dConfig::from_entry(entry)?;
            let driver = lsm303d::Lsm303d::new(bus, config).await?;
            if entry.verify_identity {
                driver.verify_identity().await?;
            }
            debug!("[{}] lsm303d ready at {:#04x}", entry.id, driver.config().address);
            Ok(Box::new(driver))
        }
        #[cfg(feature = "hdc100x")]
        hdc100x::DRIVER_NAME => {
            let config = hdc100x::Hdc100xConfig::from_entry(entry)?;
            let driver = hdc100x::Hdc100x::new(bus, config).await?;
            if entry.verify_identity {
                driver.verify_identity().await?;
            }
            debug!(
                "[{}] hdc100x ready at {:#04x}, settle {:?}",
                entry.id,
                driver.config().address,
                driver.config().settle_delay
            );
            Ok(Box::new(driver))
        }
        _ => Err(SensorError::UnsupportedDriver {
            driver: entry.driver.clone(),
        }),
    }
}

// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use bus::{shared, I2cBus, LinuxI2cBus, SharedBus};
pub use config::{load_config, BusConfig, SensorConfig};
pub use errors::{SensorError, SensorResult};
pub use registry::{init_all, register_sensors, RegisteredSensor};
pub use scheduler::{spawn_poller, spawn_sensor_tasks, PollerHandle, Sample, SampleCache};
pub use sensors::{SensorDataFrame, SensorDriver};

#[cfg(feature = "hdc100x")]
pub use sensors::hdc100x::{Hdc100x, Hdc100xConfig};
#[cfg(feature = "lsm303d")]
pub use sensors::lsm303d::{Lsm303d, Lsm303dConfig};

use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the hub logs the latest sample of every sensor
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Initialize tracing with default configuration
pub fn init_tracing() {
    // RUST_LOG=debug for verbose, RUST_LOG=info for normal, RUST_LOG=warn for production
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Run the sensor hub with the given configuration directory until Ctrl-C
pub async fn run_sensor_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[SensorHub] starting up...");

    let (bus_config, sensor_config) = load_config(config_path)?;
    info!(
        "[config] loaded {} bus(es) and {} sensor(s)",
        bus_config.buses.len(),
        sensor_config.sensors.len()
    );

    // Buses stay open for as long as the drivers hold their handles
    let (sensors, _buses) = init_all(&bus_config, &sensor_config).await?;
    info!("[registry] sensors and buses initialized");

    let pollers = spawn_sensor_tasks(sensors);
    info!("[main] {} sensor task(s) launched", pollers.len());
    let caches: Vec<SampleCache> = pollers.iter().map(PollerHandle::cache).collect();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut report = interval(REPORT_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("[main] shutting down");
                break;
            }
            _ = report.tick() => {
                for cache in &caches {
                    match cache.latest() {
                        Some(sample) => match sample.to_json() {
                            Ok(json) => info!("[{}] {}", cache.sensor(), json),
                            Err(e) => warn!("[{}] failed to encode sample: {}", cache.sensor(), e),
                        },
                        None => debug!("[{}] no sample yet", cache.sensor()),
                    }
                }
            }
        }
    }

    for poller in pollers {
        poller.close().await;
    }
    Ok(())
}

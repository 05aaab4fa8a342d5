use crate::bus::{shared, BusType, I2cBus, LinuxI2cBus, SharedBus};
use crate::config::{BusConfig, SensorConfig};
use crate::errors::{ConfigError, RegistryError, RegistryResult, SensorError};
use crate::sensors::{create_sensor_driver, SensorDriver};
use std::collections::HashMap;
use tracing::info;

/// A constructed driver together with its configuration identity
pub struct RegisteredSensor {
    pub id: String,
    pub bus: String,
    pub frequency: Option<u32>,
    pub driver: Box<dyn SensorDriver>,
}

/// Open every configured bus and initialize every configured sensor
pub async fn init_all(
    bus_cfg: &BusConfig,
    sensor_config: &SensorConfig,
) -> RegistryResult<(Vec<RegisteredSensor>, HashMap<String, SharedBus<LinuxI2cBus>>)> {
    let mut bus_map = HashMap::new();
    for b in bus_cfg.buses.iter() {
        match BusType::from_str(&b.r#type) {
            Some(BusType::I2C) => {
                let bus = LinuxI2cBus::new(&b.path).map_err(|e| RegistryError::BusInitError {
                    bus: b.id.clone(),
                    source: Box::new(e),
                })?;
                info!("[registry] opened bus {} at {}", b.id, bus.path());
                bus_map.insert(b.id.clone(), shared(bus));
            }
            None => {
                return Err(RegistryError::Config(ConfigError::InvalidValue {
                    field: format!("bus.{}.type", b.id),
                    reason: format!("unknown bus type '{}'", b.r#type),
                }))
            }
        }
    }

    let sensors = register_sensors(sensor_config, &bus_map).await?;
    Ok((sensors, bus_map))
}

/// Build the configured drivers on already opened buses
pub async fn register_sensors<B>(
    sensor_config: &SensorConfig,
    buses: &HashMap<String, SharedBus<B>>,
) -> RegistryResult<Vec<RegisteredSensor>>
where
    B: I2cBus + 'static,
{
    let mut sensors = Vec::new();
    info!(
        "[registry] initializing {} sensors...",
        sensor_config.sensors.len()
    );
    for s in sensor_config.sensors.iter() {
        let bus = buses.get(&s.bus).ok_or_else(|| {
            RegistryError::DriverCreationError(SensorError::BusNotFound { bus: s.bus.clone() })
        })?;

        let driver = create_sensor_driver(s, bus.clone())
            .await
            .map_err(|e| RegistryError::RegistrationError {
                sensor: s.id.clone(),
                source: e,
            })?;
        info!(
            "[registry] registered sensor: id={} driver={} bus={}",
            s.id, s.driver, s.bus
        );

        sensors.push(RegisteredSensor {
            id: s.id.clone(),
            bus: s.bus.clone(),
            frequency: s.frequency,
            driver,
        });
    }

    Ok(sensors)
}

#[cfg(all(test, feature = "lsm303d", feature = "hdc100x"))]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;
    use crate::config::parse_sensor_config;

    const SENSORS: &str = r#"
[[sensor]]
id = "accel0"
driver = "lsm303d"
bus = "i2c1"
frequency = 10

[[sensor]]
id = "climate0"
driver = "hdc100x"
bus = "i2c1"
"#;

    fn buses() -> (SharedBus<MockBus>, HashMap<String, SharedBus<MockBus>>) {
        let bus = shared(MockBus::new());
        let mut map = HashMap::new();
        map.insert("i2c1".to_string(), bus.clone());
        (bus, map)
    }

    #[tokio::test]
    async fn test_registers_every_sensor_on_shared_bus() {
        let (bus, map) = buses();
        let config = parse_sensor_config(SENSORS).unwrap();

        let sensors = register_sensors(&config, &map).await.unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].id, "accel0");
        assert_eq!(sensors[0].frequency, Some(10));
        assert_eq!(sensors[0].driver.name(), "lsm303d");
        assert_eq!(sensors[1].id, "climate0");
        assert_eq!(sensors[1].frequency, None);
        assert_eq!(sensors[1].driver.name(), "hdc100x");

        assert_eq!(bus.lock().await.ops.len(), 8);
    }

    #[tokio::test]
    async fn test_missing_bus_is_driver_creation_error() {
        let (_, map) = buses();
        let config = parse_sensor_config(
            "[[sensor]]\nid = \"a\"\ndriver = \"hdc100x\"\nbus = \"i2c0\"\n",
        )
        .unwrap();

        match register_sensors(&config, &map).await {
            Err(RegistryError::DriverCreationError(SensorError::BusNotFound { bus })) => {
                assert_eq!(bus, "i2c0")
            }
            _ => panic!("expected BusNotFound"),
        }
    }

    #[tokio::test]
    async fn test_init_failure_names_the_sensor() {
        let (bus, map) = buses();
        // first write of the second sensor
        bus.lock().await.fail_at(7);
        let config = parse_sensor_config(SENSORS).unwrap();

        match register_sensors(&config, &map).await {
            Err(RegistryError::RegistrationError { sensor, source }) => {
                assert_eq!(sensor, "climate0");
                assert!(matches!(source, SensorError::InitError { register: 0x02, .. }));
            }
            _ => panic!("expected RegistrationError"),
        }
    }
}

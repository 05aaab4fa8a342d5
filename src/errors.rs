use thiserror::Error;

/// Transport error carried out of an [`I2cBus`](crate::bus::I2cBus) implementation
pub type BusError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the sensor drivers and the poller
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("I2C transaction with device {address:#04x} failed: {source}")]
    Bus {
        address: u8,
        #[source]
        source: BusError,
    },

    #[error("Sensor '{sensor}' initialization failed writing register {register:#04x}: {source}")]
    InitError {
        sensor: String,
        register: u8,
        #[source]
        source: BusError,
    },

    #[error("Sensor '{sensor}' wrong chip ID: expected {expected:#04x}, got {actual:#04x}")]
    WrongChipId { sensor: String, expected: u8, actual: u8 },

    #[error("Sensor '{sensor}' wrong device ID {actual:#06x}, expected one of {expected:04x?}")]
    WrongDeviceId {
        sensor: String,
        expected: Vec<u16>,
        actual: u16,
    },

    #[error("Invalid sensor configuration for '{sensor}': {reason}")]
    ConfigError { sensor: String, reason: String },

    #[error("Unsupported sensor driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Bus '{bus}' not found or unavailable")]
    BusNotFound { bus: String },

    #[error("Poller for sensor '{sensor}' has stopped")]
    PollerStopped { sensor: String },
}

impl SensorError {
    pub(crate) fn bus<E>(address: u8, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SensorError::Bus {
            address,
            source: Box::new(source),
        }
    }

    pub(crate) fn init<E>(sensor: &str, register: u8, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SensorError::InitError {
            sensor: sensor.to_string(),
            register,
            source: Box::new(source),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus '{bus}' could not be opened: {source}")]
    BusInitError {
        bus: String,
        #[source]
        source: BusError,
    },

    #[error("Failed to create sensor driver: {0}")]
    DriverCreationError(#[source] SensorError),

    #[error("Sensor '{sensor}' registration failed: {source}")]
    RegistrationError {
        sensor: String,
        #[source]
        source: SensorError,
    },
}

/// Result type aliases for convenience
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;

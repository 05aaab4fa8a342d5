use super::I2cBus;
use async_trait::async_trait;

#[cfg(target_os = "linux")]
use i2cdev::core::I2CDevice;
#[cfg(target_os = "linux")]
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};

/// I2C bus error type - platform specific
#[cfg(target_os = "linux")]
pub type I2CError = LinuxI2CError;

#[cfg(not(target_os = "linux"))]
#[derive(Debug)]
pub struct I2CError(String);

#[cfg(not(target_os = "linux"))]
impl std::fmt::Display for I2CError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I2C not supported on this platform: {}", self.0)
    }
}

#[cfg(not(target_os = "linux"))]
impl std::error::Error for I2CError {}

/// `/dev/i2c-N` character device
#[cfg(target_os = "linux")]
pub struct LinuxI2cBus {
    device: LinuxI2CDevice,
    path: String,
}

#[cfg(not(target_os = "linux"))]
pub struct LinuxI2cBus {
    _phantom: std::marker::PhantomData<()>,
}

#[cfg(target_os = "linux")]
impl LinuxI2cBus {
    pub fn new(path: &str) -> Result<Self, I2CError> {
        let device = LinuxI2CDevice::new(path, 0)?;
        tracing::debug!("[i2c] opened {}", path);
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(target_os = "linux")]
#[async_trait]
impl I2cBus for LinuxI2cBus {
    type Error = I2CError;

    async fn write_byte(&mut self, address: u8, value: u8) -> Result<(), I2CError> {
        self.device.set_slave_address(address as u16)?;
        self.device.smbus_write_byte(value)
    }

    async fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), I2CError> {
        self.device.set_slave_address(address as u16)?;
        self.device.write(data)
    }

    async fn write_byte_to_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), I2CError> {
        self.device.set_slave_address(address as u16)?;
        self.device.smbus_write_byte_data(register, value)
    }

    async fn read_byte_from_register(&mut self, address: u8, register: u8) -> Result<u8, I2CError> {
        self.device.set_slave_address(address as u16)?;
        self.device.smbus_read_byte_data(register)
    }

    async fn read_bytes(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2CError> {
        self.device.set_slave_address(address as u16)?;
        // Plain read, the register pointer was set by the preceding write
        self.device.read(buf)
    }
}

#[cfg(not(target_os = "linux"))]
impl LinuxI2cBus {
    pub fn new(_path: &str) -> Result<Self, I2CError> {
        Err(I2CError("I2C character devices are only available on Linux".to_string()))
    }

    pub fn path(&self) -> &str {
        ""
    }
}

#[cfg(not(target_os = "linux"))]
#[async_trait]
impl I2cBus for LinuxI2cBus {
    type Error = I2CError;

    async fn write_byte(&mut self, _address: u8, _value: u8) -> Result<(), I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }

    async fn write_bytes(&mut self, _address: u8, _data: &[u8]) -> Result<(), I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }

    async fn write_byte_to_register(
        &mut self,
        _address: u8,
        _register: u8,
        _value: u8,
    ) -> Result<(), I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }

    async fn read_byte_from_register(
        &mut self,
        _address: u8,
        _register: u8,
    ) -> Result<u8, I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }

    async fn read_bytes(&mut self, _address: u8, _buf: &mut [u8]) -> Result<(), I2CError> {
        Err(I2CError("I2C is only supported on Linux".to_string()))
    }
}

pub mod i2c;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use self::i2c::{I2CError, LinuxI2cBus};

/// Byte-level I2C access used by the drivers.
///
/// Every operation addresses a device by its 7-bit address. Implementations
/// are not required to be safe for concurrent use; callers share them
/// through [`SharedBus`].
#[async_trait]
pub trait I2cBus: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write one byte to the device's current register pointer
    async fn write_byte(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;

    /// Write a raw block, first byte being the register pointer
    async fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    async fn write_byte_to_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), Self::Error>;

    async fn read_byte_from_register(&mut self, address: u8, register: u8)
        -> Result<u8, Self::Error>;

    /// Read `buf.len()` bytes following the last addressed register
    async fn read_bytes(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Bus handle shared between the caller and the drivers built on it.
///
/// Holding the lock for a whole command/settle/read sequence keeps that
/// sequence atomic with respect to other drivers on the same bus.
pub type SharedBus<B> = Arc<Mutex<B>>;

pub fn shared<B: I2cBus>(bus: B) -> SharedBus<B> {
    Arc::new(Mutex::new(bus))
}

/// Bus type enum for the `type` field of a bus entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    I2C,
}

impl BusType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i2c" => Some(BusType::I2C),
            _ => None,
        }
    }
}

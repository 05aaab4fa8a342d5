//! Recording bus used by the unit tests

use super::I2cBus;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::time::Instant;

/// One bus transaction as seen by the simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    WriteByte { address: u8, value: u8 },
    WriteBytes { address: u8, data: Vec<u8> },
    WriteRegister { address: u8, register: u8, value: u8 },
    ReadRegister { address: u8, register: u8 },
    ReadBytes { address: u8, len: usize },
}

#[derive(Debug, Error)]
#[error("simulated bus fault on operation {0}")]
pub(crate) struct MockBusError(pub usize);

#[derive(Debug, Default)]
pub(crate) struct MockBus {
    pub ops: Vec<Op>,
    /// When each entry of `ops` was issued
    pub times: Vec<Instant>,
    registers: HashMap<(u8, u8), u8>,
    /// Last pointer byte written per device address
    pointer: HashMap<u8, u8>,
    /// Bytes returned by `read_bytes` keyed on (address, pointer)
    blocks: HashMap<(u8, u8), Vec<u8>>,
    fail_at: Option<usize>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&mut self, address: u8, register: u8, value: u8) {
        self.registers.insert((address, register), value);
    }

    /// Store a big-endian word split over a high and a low register
    pub fn set_word(&mut self, address: u8, high: u8, low: u8, value: i16) {
        let [h, l] = value.to_be_bytes();
        self.set_register(address, high, h);
        self.set_register(address, low, l);
    }

    pub fn set_block(&mut self, address: u8, pointer: u8, bytes: &[u8]) {
        self.blocks.insert((address, pointer), bytes.to_vec());
    }

    /// Make the operation with this zero-based index fail
    pub fn fail_at(&mut self, index: usize) {
        self.fail_at = Some(index);
    }

    /// Operation index the next transaction will get
    pub fn next_index(&self) -> usize {
        self.ops.len()
    }

    /// Time between the first operations matching `from` and `to`
    pub fn elapsed_between(
        &self,
        from: impl Fn(&Op) -> bool,
        to: impl Fn(&Op) -> bool,
    ) -> Option<std::time::Duration> {
        let start = self.ops.iter().position(from)?;
        let end = self.ops.iter().position(to)?;
        Some(self.times[end].duration_since(self.times[start]))
    }

    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::WriteRegister {
                    register, value, ..
                } => Some((*register, *value)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, op: Op) -> Result<(), MockBusError> {
        let index = self.ops.len();
        self.ops.push(op);
        self.times.push(Instant::now());
        if self.fail_at == Some(index) {
            return Err(MockBusError(index));
        }
        Ok(())
    }
}

#[async_trait]
impl I2cBus for MockBus {
    type Error = MockBusError;

    async fn write_byte(&mut self, address: u8, value: u8) -> Result<(), MockBusError> {
        self.record(Op::WriteByte { address, value })?;
        self.pointer.insert(address, value);
        Ok(())
    }

    async fn write_bytes(&mut self, address: u8, data: &[u8]) -> Result<(), MockBusError> {
        self.record(Op::WriteBytes {
            address,
            data: data.to_vec(),
        })?;
        if let Some(&pointer) = data.first() {
            self.pointer.insert(address, pointer);
        }
        Ok(())
    }

    async fn write_byte_to_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), MockBusError> {
        self.record(Op::WriteRegister {
            address,
            register,
            value,
        })?;
        self.registers.insert((address, register), value);
        Ok(())
    }

    async fn read_byte_from_register(
        &mut self,
        address: u8,
        register: u8,
    ) -> Result<u8, MockBusError> {
        self.record(Op::ReadRegister { address, register })?;
        Ok(self
            .registers
            .get(&(address, register))
            .copied()
            .unwrap_or(0))
    }

    async fn read_bytes(&mut self, address: u8, buf: &mut [u8]) -> Result<(), MockBusError> {
        self.record(Op::ReadBytes {
            address,
            len: buf.len(),
        })?;
        let pointer = self.pointer.get(&address).copied().unwrap_or(0);
        let block = self.blocks.get(&(address, pointer));
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = block.and_then(|b| b.get(i)).copied().unwrap_or(0);
        }
        Ok(())
    }
}

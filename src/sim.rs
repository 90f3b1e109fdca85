//! In-memory MMA865x for tests and hardware-free runs
//!
//! [`SimulatedBus`] models the registers the driver touches: identity, status,
//! the sample block, `XYZ_DATA_CFG` and `CTRL_REG1`. Every transaction is
//! recorded. Clones share the same chip, so a test can hand one clone to the
//! driver and keep another to inspect and steer it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::BusError;
use crate::registers::{
    encode_sample, ChipVariant, Sample, CTRL_REG1_ACTIVE, REG_CTRL_REG1, REG_OUT_X_MSB,
    REG_STATUS, REG_WHO_AM_I, SAMPLE_BLOCK_LEN, STATUS_ZYXDR,
};
use crate::transport::RegisterTransport;

const REGISTER_COUNT: usize = 0x32;

/// One recorded bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read { reg: u8, value: u8 },
    Write { reg: u8, value: u8 },
    ReadBlock { reg: u8, len: usize },
}

/// Generates a new sample each time the status register is read while active
pub type SampleGenerator = Box<dyn FnMut(u64) -> Sample + Send>;

struct Chip {
    registers: [u8; REGISTER_COUNT],
    queued: VecDeque<Sample>,
    generator: Option<SampleGenerator>,
    generated: u64,
    ops: Vec<BusOp>,
    fail_next_read: bool,
    fail_next_write: bool,
    fail_writes_to: Option<u8>,
    short_block: Option<usize>,
    unplugged: bool,
}

impl Chip {
    fn new(id: u8) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        registers[REG_WHO_AM_I as usize] = id;
        Self {
            registers,
            queued: VecDeque::new(),
            generator: None,
            generated: 0,
            ops: Vec::new(),
            fail_next_read: false,
            fail_next_write: false,
            fail_writes_to: None,
            short_block: None,
            unplugged: false,
        }
    }

    fn is_active(&self) -> bool {
        self.registers[REG_CTRL_REG1 as usize] & CTRL_REG1_ACTIVE != 0
    }

    /// Latch the next sample into the output registers
    fn refresh_data(&mut self) {
        if !self.is_active() {
            return;
        }

        let next = match self.queued.pop_front() {
            Some(sample) => Some(sample),
            None => match self.generator.as_mut() {
                Some(generate) => {
                    let sample = generate(self.generated);
                    self.generated += 1;
                    Some(sample)
                }
                None => None,
            },
        };

        if let Some(sample) = next {
            let block = encode_sample(sample);
            let start = REG_OUT_X_MSB as usize;
            self.registers[start..start + 6].copy_from_slice(&block[..6]);
            self.registers[REG_STATUS as usize] |= STATUS_ZYXDR;
        }
    }

    fn check_read(&mut self) -> Result<(), BusError> {
        if self.unplugged {
            return Err(BusError::NoDevice);
        }
        if std::mem::take(&mut self.fail_next_read) {
            return Err(BusError::I2c(embedded_hal::i2c::ErrorKind::Other));
        }
        Ok(())
    }
}

/// Simulated MMA865x register file
#[derive(Clone)]
pub struct SimulatedBus {
    chip: Arc<Mutex<Chip>>,
}

impl SimulatedBus {
    /// A chip answering with the MMA8652 identity
    pub fn new() -> Self {
        Self::with_id(ChipVariant::Mma8652.id())
    }

    /// A chip answering with an arbitrary identity byte
    pub fn with_id(id: u8) -> Self {
        Self {
            chip: Arc::new(Mutex::new(Chip::new(id))),
        }
    }

    fn chip(&self) -> MutexGuard<'_, Chip> {
        self.chip.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue samples; each becomes readable on a later status poll
    pub fn push_samples<I: IntoIterator<Item = Sample>>(&self, samples: I) {
        self.chip().queued.extend(samples);
    }

    /// Produce samples on demand once the queue is empty
    pub fn set_generator<F>(&self, generator: F)
    where
        F: FnMut(u64) -> Sample + Send + 'static,
    {
        self.chip().generator = Some(Box::new(generator));
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.chip().registers.get(reg as usize).copied().unwrap_or(0)
    }

    /// Poke a register without recording a transaction
    pub fn set_register(&self, reg: u8, value: u8) {
        if let Some(slot) = self.chip().registers.get_mut(reg as usize) {
            *slot = value;
        }
    }

    /// Physical state of the ACTIVE bit
    pub fn power_bit(&self) -> bool {
        self.chip().is_active()
    }

    /// Every transaction since creation or the last [`clear_ops`](Self::clear_ops)
    pub fn ops(&self) -> Vec<BusOp> {
        self.chip().ops.clone()
    }

    /// Recorded writes as `(register, value)` pairs
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.chip()
            .ops
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write { reg, value } => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.chip().ops.clear();
    }

    pub fn fail_next_read(&self) {
        self.chip().fail_next_read = true;
    }

    pub fn fail_next_write(&self) {
        self.chip().fail_next_write = true;
    }

    /// Fail every write to `reg` until cleared with `None`
    pub fn fail_writes_to(&self, reg: Option<u8>) {
        self.chip().fail_writes_to = reg;
    }

    /// Truncate block reads to `len` bytes until cleared with `None`
    pub fn short_block_reads(&self, len: Option<usize>) {
        self.chip().short_block = len;
    }

    /// Stop (or resume) answering on the bus
    pub fn set_unplugged(&self, unplugged: bool) {
        self.chip().unplugged = unplugged;
    }

    /// Simulate supply loss: every register except identity returns to reset
    pub fn power_cycle(&self) {
        let mut chip = self.chip();
        let id = chip.registers[REG_WHO_AM_I as usize];
        chip.registers = [0u8; REGISTER_COUNT];
        chip.registers[REG_WHO_AM_I as usize] = id;
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTransport for SimulatedBus {
    fn read_byte(&mut self, reg: u8) -> Result<u8, BusError> {
        let mut chip = self.chip();
        chip.check_read()?;

        if reg == REG_STATUS && chip.registers[REG_STATUS as usize] & STATUS_ZYXDR == 0 {
            chip.refresh_data();
        }

        let value = chip.registers.get(reg as usize).copied().unwrap_or(0);
        chip.ops.push(BusOp::Read { reg, value });
        Ok(value)
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        let mut chip = self.chip();
        if chip.unplugged {
            return Err(BusError::NoDevice);
        }
        if std::mem::take(&mut chip.fail_next_write) || chip.fail_writes_to == Some(reg) {
            return Err(BusError::I2c(embedded_hal::i2c::ErrorKind::Other));
        }

        chip.ops.push(BusOp::Write { reg, value });
        if let Some(slot) = chip.registers.get_mut(reg as usize) {
            *slot = value;
        }
        Ok(())
    }

    fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, BusError> {
        let mut chip = self.chip();
        chip.check_read()?;
        chip.ops.push(BusOp::ReadBlock { reg, len });

        let available = chip.short_block.map_or(len, |short| short.min(len));
        let start = reg as usize;
        let data: Vec<u8> = (start..start + available)
            .map(|addr| chip.registers.get(addr).copied().unwrap_or(0))
            .collect();

        // Reading the sample block acknowledges it
        if reg == REG_OUT_X_MSB && len >= SAMPLE_BLOCK_LEN - 1 {
            chip.registers[REG_STATUS as usize] &= !STATUS_ZYXDR;
        }

        if data.len() != len {
            return Err(BusError::Transfer {
                expected: len,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::REG_XYZ_DATA_CFG;

    #[test]
    fn test_status_latches_queued_sample_only_when_active() {
        let mut bus = SimulatedBus::new();
        bus.push_samples([Sample::new(1, 2, 3)]);

        assert_eq!(bus.read_byte(REG_STATUS).unwrap() & STATUS_ZYXDR, 0);

        bus.write_byte(REG_CTRL_REG1, CTRL_REG1_ACTIVE).unwrap();
        assert_ne!(bus.read_byte(REG_STATUS).unwrap() & STATUS_ZYXDR, 0);

        let block = bus.read_block(REG_OUT_X_MSB, SAMPLE_BLOCK_LEN).unwrap();
        assert_eq!(crate::registers::decode_sample(&block).unwrap(), Sample::new(1, 2, 3));
        assert_eq!(bus.register(REG_STATUS) & STATUS_ZYXDR, 0);
    }

    #[test]
    fn test_short_block_is_an_error() {
        let mut bus = SimulatedBus::new();
        bus.short_block_reads(Some(4));
        assert_eq!(
            bus.read_block(REG_OUT_X_MSB, SAMPLE_BLOCK_LEN),
            Err(BusError::Transfer {
                expected: SAMPLE_BLOCK_LEN,
                actual: 4
            })
        );
    }

    #[test]
    fn test_power_cycle_keeps_identity() {
        let mut bus = SimulatedBus::with_id(0x5A);
        bus.write_byte(REG_XYZ_DATA_CFG, 2).unwrap();
        bus.write_byte(REG_CTRL_REG1, 0x01).unwrap();

        bus.power_cycle();

        assert_eq!(bus.register(REG_XYZ_DATA_CFG), 0);
        assert!(!bus.power_bit());
        assert_eq!(bus.read_byte(REG_WHO_AM_I).unwrap(), 0x5A);
    }

    #[test]
    fn test_failure_injection_is_one_shot() {
        let mut bus = SimulatedBus::new();
        bus.fail_next_write();
        assert!(bus.write_byte(REG_CTRL_REG1, 1).is_err());
        assert!(bus.write_byte(REG_CTRL_REG1, 1).is_ok());
        assert_eq!(bus.writes(), vec![(REG_CTRL_REG1, 1)]);
    }
}

//! Register transports
//!
//! The driver never touches a bus directly. It issues byte and block register
//! transactions through [`RegisterTransport`], which can be backed by any
//! embedded-hal I2C bus ([`I2cTransport`]), the FT232H USB bridge
//! (`Ft232Transport`, feature `ftdi`) or the in-memory
//! [`SimulatedBus`](crate::sim::SimulatedBus).

use embedded_hal::i2c::{Error as _, I2c};

use crate::error::BusError;
use crate::registers::MMA865X_I2C_ADDRESS;

/// Byte-addressed register access to one device
pub trait RegisterTransport: Send {
    /// Read a single register
    fn read_byte(&mut self, reg: u8) -> Result<u8, BusError>;

    /// Write a single register
    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), BusError>;

    /// Read `len` consecutive registers starting at `reg`.
    ///
    /// A transfer of fewer than `len` bytes is an error, never a truncated
    /// success.
    fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, BusError>;

    /// 7-bit bus address of the device behind this transport
    fn address(&self) -> u8 {
        MMA865X_I2C_ADDRESS
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    fn read_byte(&mut self, reg: u8) -> Result<u8, BusError> {
        (**self).read_byte(reg)
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        (**self).write_byte(reg, value)
    }

    fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, BusError> {
        (**self).read_block(reg, len)
    }

    fn address(&self) -> u8 {
        (**self).address()
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read_byte(&mut self, reg: u8) -> Result<u8, BusError> {
        (**self).read_byte(reg)
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        (**self).write_byte(reg, value)
    }

    fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, BusError> {
        (**self).read_block(reg, len)
    }

    fn address(&self) -> u8 {
        (**self).address()
    }
}

/// [`RegisterTransport`] over an embedded-hal I2C bus
pub struct I2cTransport<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cTransport<I2C> {
    /// Create a transport at the fixed MMA865x address (0x1D)
    pub const fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: MMA865X_I2C_ADDRESS,
        }
    }

    /// Create a transport at a custom 7-bit address
    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Consume the transport and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> RegisterTransport for I2cTransport<I2C>
where
    I2C: I2c + Send,
{
    fn read_byte(&mut self, reg: u8) -> Result<u8, BusError> {
        let mut data = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut data)
            .map_err(|e| BusError::I2c(e.kind()))?;
        Ok(data[0])
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|e| BusError::I2c(e.kind()))
    }

    fn read_block(&mut self, reg: u8, len: usize) -> Result<Vec<u8>, BusError> {
        let mut data = vec![0u8; len];
        self.i2c
            .write_read(self.address, &[reg], &mut data)
            .map_err(|e| BusError::I2c(e.kind()))?;
        Ok(data)
    }

    fn address(&self) -> u8 {
        self.address
    }
}

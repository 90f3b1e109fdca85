//! FT232H USB-to-I2C transport via libMPSSE

use std::ptr;

use crate::error::{BusError, Mma865xError, Result};
use crate::ffi::*;
use crate::registers::MMA865X_I2C_ADDRESS;
use crate::transport::RegisterTransport;

fn ftdi_error(status: FT_STATUS) -> BusError {
    BusError::Ftdi {
        status,
        description: status_to_string(status),
    }
}

fn check(status: FT_STATUS) -> std::result::Result<(), BusError> {
    if status == FT_OK {
        Ok(())
    } else {
        Err(ftdi_error(status))
    }
}

/// MMA865x register access through an FT232H MPSSE I2C channel
pub struct Ft232Transport {
    handle: FT_HANDLE,
    address: u8,
}

// The handle is only used behind `&mut self`
unsafe impl Send for Ft232Transport {}

impl Ft232Transport {
    /// Open and initialize an I2C channel
    ///
    /// # Arguments
    /// * `channel_index` - Index of the I2C channel to use (usually 0)
    pub fn open(channel_index: u32) -> Result<Self> {
        let mut num_channels: DWORD = 0;
        let status = unsafe { I2C_GetNumChannels(&mut num_channels) };
        check(status).map_err(Mma865xError::io("enumerate FT232H channels"))?;

        if channel_index >= num_channels {
            return Err(Mma865xError::InvalidConfig(format!(
                "FT232H channel {channel_index} not present ({num_channels} found)"
            )));
        }

        let mut handle: FT_HANDLE = ptr::null_mut();
        let status = unsafe { I2C_OpenChannel(channel_index, &mut handle) };
        check(status).map_err(Mma865xError::io("open FT232H channel"))?;

        let mut config = ChannelConfig {
            ClockRate: I2C_CLOCK_FAST_MODE,
            LatencyTimer: 1,
            Options: 0,
            Pin: 0,
            currentPinState: 0,
        };

        let status = unsafe { I2C_InitChannel(handle, &mut config) };
        if status != FT_OK {
            unsafe { I2C_CloseChannel(handle) };
            return Err(Mma865xError::io("init FT232H channel")(ftdi_error(status)));
        }

        Ok(Self {
            handle,
            address: MMA865X_I2C_ADDRESS,
        })
    }

    /// Select the register pointer without releasing the bus
    fn select_register(&mut self, reg: u8) -> std::result::Result<(), BusError> {
        let reg_buf = [reg];
        let mut transferred: DWORD = 0;
        let status = unsafe {
            I2C_DeviceWrite(
                self.handle,
                self.address,
                1,
                reg_buf.as_ptr(),
                &mut transferred,
                I2C_TRANSFER_OPTIONS_START_BIT | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK,
            )
        };
        check(status)
    }
}

impl RegisterTransport for Ft232Transport {
    fn read_byte(&mut self, reg: u8) -> std::result::Result<u8, BusError> {
        let data = self.read_block(reg, 1)?;
        Ok(data[0])
    }

    fn write_byte(&mut self, reg: u8, value: u8) -> std::result::Result<(), BusError> {
        let buffer = [reg, value];
        let mut transferred: DWORD = 0;
        let status = unsafe {
            I2C_DeviceWrite(
                self.handle,
                self.address,
                2,
                buffer.as_ptr(),
                &mut transferred,
                I2C_TRANSFER_OPTIONS_START_BIT
                    | I2C_TRANSFER_OPTIONS_STOP_BIT
                    | I2C_TRANSFER_OPTIONS_BREAK_ON_NACK,
            )
        };
        check(status)?;

        if transferred != 2 {
            return Err(BusError::Transfer {
                expected: 2,
                actual: transferred as usize,
            });
        }
        Ok(())
    }

    fn read_block(&mut self, reg: u8, len: usize) -> std::result::Result<Vec<u8>, BusError> {
        self.select_register(reg)?;

        // Repeated START, then read
        let mut data = vec![0u8; len];
        let mut transferred: DWORD = 0;
        let status = unsafe {
            I2C_DeviceRead(
                self.handle,
                self.address,
                len as DWORD,
                data.as_mut_ptr(),
                &mut transferred,
                I2C_TRANSFER_OPTIONS_START_BIT
                    | I2C_TRANSFER_OPTIONS_STOP_BIT
                    | I2C_TRANSFER_OPTIONS_NACK_LAST_BYTE,
            )
        };
        check(status)?;

        // Without FAST_TRANSFER the count is in bytes
        if transferred as usize != len {
            return Err(BusError::Transfer {
                expected: len,
                actual: transferred as usize,
            });
        }
        Ok(data)
    }

    fn address(&self) -> u8 {
        self.address
    }
}

impl Drop for Ft232Transport {
    fn drop(&mut self) {
        unsafe {
            I2C_CloseChannel(self.handle);
        }
    }
}

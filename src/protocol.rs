//! Register-level protocol for the MMA865x
//!
//! [`DeviceProtocol`] turns semantic operations (identify, configure, power,
//! sample) into transactions on a [`RegisterTransport`]. It holds no driver
//! state; callers serialize access to it.

use log::{error, trace};

use crate::error::{Mma865xError, Result};
use crate::registers::{
    decode_sample, with_power_bit, ChipVariant, Range, Sample, CTRL_REG1_ACTIVE, REG_CTRL_REG1,
    REG_OUT_X_MSB, REG_STATUS, REG_WHO_AM_I, REG_XYZ_DATA_CFG, SAMPLE_BLOCK_LEN, STATUS_ZYXDR,
    XYZ_DATA_CFG_FS_MASK,
};
use crate::transport::RegisterTransport;

/// Protocol layer over one transport
pub struct DeviceProtocol<T> {
    bus: T,
}

impl<T: RegisterTransport> DeviceProtocol<T> {
    pub fn new(bus: T) -> Self {
        Self { bus }
    }

    /// Read `WHO_AM_I` and match it against the supported chips.
    ///
    /// An unknown identity and an unreadable register both yield `NotFound`.
    pub fn identify(&mut self) -> Result<ChipVariant> {
        match self.bus.read_byte(REG_WHO_AM_I) {
            Ok(id) => ChipVariant::from_id(id).ok_or(Mma865xError::NotFound { id: Some(id) }),
            Err(e) => {
                trace!("WHO_AM_I read failed: {e}");
                Err(Mma865xError::NotFound { id: None })
            }
        }
    }

    /// Force standby, then select `range`.
    ///
    /// The range register only accepts writes in standby. Both writes are
    /// attempted even when the first one fails.
    pub fn configure(&mut self, range: Range) -> Result<()> {
        let standby = self.bus.write_byte(REG_CTRL_REG1, 0);
        let select = self.bus.write_byte(REG_XYZ_DATA_CFG, range.register_value());

        if standby.is_err() || select.is_err() {
            let err = Mma865xError::Configure {
                standby_write: standby.err(),
                range_write: select.err(),
            };
            error!("error when configuring MMA865x: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Read-modify-write the ACTIVE bit of CTRL_REG1
    pub fn set_power(&mut self, on: bool) -> Result<()> {
        let ctrl = self
            .bus
            .read_byte(REG_CTRL_REG1)
            .map_err(Mma865xError::io("read CTRL_REG1"))?;
        self.bus
            .write_byte(REG_CTRL_REG1, with_power_bit(ctrl, on))
            .map_err(Mma865xError::io("write CTRL_REG1"))
    }

    /// Live state of the ACTIVE bit
    pub fn power_bit(&mut self) -> Result<bool> {
        let ctrl = self
            .bus
            .read_byte(REG_CTRL_REG1)
            .map_err(Mma865xError::io("read CTRL_REG1"))?;
        Ok(ctrl & CTRL_REG1_ACTIVE != 0)
    }

    /// Whether a fresh X/Y/Z sample is waiting
    pub fn read_status(&mut self) -> Result<bool> {
        let status = self
            .bus
            .read_byte(REG_STATUS)
            .map_err(Mma865xError::io("read STATUS"))?;
        Ok(status & STATUS_ZYXDR != 0)
    }

    /// Block-read and decode one sample
    pub fn read_sample(&mut self) -> Result<Sample> {
        let block = self
            .bus
            .read_block(REG_OUT_X_MSB, SAMPLE_BLOCK_LEN)
            .map_err(Mma865xError::io("read sample block"))?;
        decode_sample(&block).map_err(Mma865xError::io("decode sample block"))
    }

    /// Raw range field currently held by the chip
    pub fn read_range_register(&mut self) -> Result<u8> {
        let cfg = self
            .bus
            .read_byte(REG_XYZ_DATA_CFG)
            .map_err(Mma865xError::io("read XYZ_DATA_CFG"))?;
        Ok(cfg & XYZ_DATA_CFG_FS_MASK)
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.bus
    }

    pub fn release(self) -> T {
        self.bus
    }
}

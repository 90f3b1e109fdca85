//! MMA8652/MMA8653 register map and sample encoding
//!
//! Everything in this module is pure: no bus access, no state. The
//! [`protocol`](crate::protocol) module turns these definitions into register
//! transactions.

use std::fmt;
use std::str::FromStr;

use crate::error::{BusError, Mma865xError, Result};

/// Fixed I2C address of the MMA865x family
pub const MMA865X_I2C_ADDRESS: u8 = 0x1D;

// Register addresses
pub const REG_STATUS: u8 = 0x00;
pub const REG_OUT_X_MSB: u8 = 0x01;
pub const REG_WHO_AM_I: u8 = 0x0D;
pub const REG_XYZ_DATA_CFG: u8 = 0x0E;
pub const REG_CTRL_REG1: u8 = 0x2A;

/// Status register: new X/Y/Z data ready
pub const STATUS_ZYXDR: u8 = 0x08;

/// CTRL_REG1: standby (0) / active (1)
pub const CTRL_REG1_ACTIVE: u8 = 0x01;

/// XYZ_DATA_CFG: full-scale range field
pub const XYZ_DATA_CFG_FS_MASK: u8 = 0x03;

/// Length of the sample block read starting at `OUT_X_MSB`
pub const SAMPLE_BLOCK_LEN: usize = 7;

const MMA8652_ID: u8 = 0x4A;
const MMA8653_ID: u8 = 0x5A;

/// Supported chip variants, identified by `WHO_AM_I`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipVariant {
    /// MMA8652, 12-bit output
    Mma8652,
    /// MMA8653, 10-bit output (same register layout)
    Mma8653,
}

impl ChipVariant {
    /// Match an identity byte against the known chips
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            MMA8652_ID => Some(Self::Mma8652),
            MMA8653_ID => Some(Self::Mma8653),
            _ => None,
        }
    }

    /// `WHO_AM_I` value reported by this chip
    pub const fn id(&self) -> u8 {
        match self {
            Self::Mma8652 => MMA8652_ID,
            Self::Mma8653 => MMA8653_ID,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mma8652 => "MMA8652",
            Self::Mma8653 => "MMA8653",
        }
    }

    /// Significant bits per axis
    pub const fn resolution_bits(&self) -> u8 {
        match self {
            Self::Mma8652 => 12,
            Self::Mma8653 => 10,
        }
    }
}

impl fmt::Display for ChipVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full-scale measurement range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Range {
    /// ±2g (1024 counts/g)
    #[default]
    G2,
    /// ±4g (512 counts/g)
    G4,
    /// ±8g (256 counts/g)
    G8,
}

impl Range {
    pub const ALL: [Range; 3] = [Range::G2, Range::G4, Range::G8];

    /// Value of the `XYZ_DATA_CFG` range field
    pub const fn register_value(&self) -> u8 {
        match self {
            Self::G2 => 0,
            Self::G4 => 1,
            Self::G8 => 2,
        }
    }

    /// Sensitivity of a 12-bit sample at this range
    pub const fn counts_per_g(&self) -> f32 {
        match self {
            Self::G2 => 1024.0,
            Self::G4 => 512.0,
            Self::G8 => 256.0,
        }
    }

    /// Full-scale value in g
    pub const fn full_scale_g(&self) -> f32 {
        match self {
            Self::G2 => 2.0,
            Self::G4 => 4.0,
            Self::G8 => 8.0,
        }
    }
}

impl TryFrom<u8> for Range {
    type Error = Mma865xError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::G2),
            1 => Ok(Self::G4),
            2 => Ok(Self::G8),
            other => Err(Mma865xError::InvalidConfig(format!(
                "range select value must be 0-2, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::G2 => f.write_str("2g"),
            Self::G4 => f.write_str("4g"),
            Self::G8 => f.write_str("8g"),
        }
    }
}

impl FromStr for Range {
    type Err = Mma865xError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('±').to_ascii_lowercase().as_str() {
            "2g" | "2" => Ok(Self::G2),
            "4g" | "4" => Ok(Self::G4),
            "8g" | "8" => Ok(Self::G8),
            other => Err(Mma865xError::InvalidConfig(format!(
                "unsupported range '{other}' (expected 2g, 4g or 8g)"
            ))),
        }
    }
}

/// One decoded acceleration sample, in raw 12-bit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Sample {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Convert raw counts to g at the given range
    pub fn to_g(&self, range: Range) -> (f32, f32, f32) {
        let scale = range.counts_per_g();
        (
            self.x as f32 / scale,
            self.y as f32 / scale,
            self.z as f32 / scale,
        )
    }
}

/// Reassemble one axis: big-endian pair, top 12 bits significant
pub const fn decode_axis(msb: u8, lsb: u8) -> i16 {
    i16::from_be_bytes([msb, lsb]) >> 4
}

/// Pack a 12-bit signed value the way the chip presents it.
///
/// Exact inverse of [`decode_axis`] for values in [-2048, 2047].
pub const fn encode_axis(value: i16) -> [u8; 2] {
    value.wrapping_shl(4).to_be_bytes()
}

/// Decode a sample block read from `OUT_X_MSB`.
///
/// The block must be exactly [`SAMPLE_BLOCK_LEN`] bytes; any other length is
/// a transfer fault and never yields a partial sample.
pub fn decode_sample(block: &[u8]) -> std::result::Result<Sample, BusError> {
    if block.len() != SAMPLE_BLOCK_LEN {
        return Err(BusError::Transfer {
            expected: SAMPLE_BLOCK_LEN,
            actual: block.len(),
        });
    }

    Ok(Sample {
        x: decode_axis(block[0], block[1]),
        y: decode_axis(block[2], block[3]),
        z: decode_axis(block[4], block[5]),
    })
}

/// Build the block a chip would return for `sample`
pub fn encode_sample(sample: Sample) -> [u8; SAMPLE_BLOCK_LEN] {
    let [x_h, x_l] = encode_axis(sample.x);
    let [y_h, y_l] = encode_axis(sample.y);
    let [z_h, z_l] = encode_axis(sample.z);
    [x_h, x_l, y_h, y_l, z_h, z_l, 0]
}

/// Set or clear the ACTIVE bit, leaving the rest of CTRL_REG1 untouched
pub const fn with_power_bit(ctrl: u8, on: bool) -> u8 {
    if on {
        ctrl | CTRL_REG1_ACTIVE
    } else {
        ctrl & !CTRL_REG1_ACTIVE
    }
}

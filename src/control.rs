//! Control surface: the `enable` and `delay` knobs

use std::fmt;
use std::str::FromStr;

use crate::error::{Mma865xError, Result};

/// Get/set access to the user-facing driver settings
pub trait ControlSurface {
    /// Live enabled state, re-read from the device
    fn enabled(&self) -> Result<bool>;

    fn set_enabled(&self, on: bool) -> Result<()>;

    fn poll_interval_ms(&self) -> u32;

    /// Apply a poll interval, returning the clamped value in effect
    fn set_poll_interval_ms(&self, ms: u32) -> u32;

    /// Text value of an attribute, newline-terminated
    fn show(&self, attr: Attribute) -> Result<String> {
        let value = match attr {
            Attribute::Enable => u32::from(self.enabled()?),
            Attribute::Delay => self.poll_interval_ms(),
        };
        Ok(format!("{value}\n"))
    }

    /// Parse and apply a text value
    fn store(&self, attr: Attribute, input: &str) -> Result<()> {
        let value = parse_decimal(attr, input)?;
        match attr {
            Attribute::Enable => self.set_enabled(value > 0),
            Attribute::Delay => {
                let ms = u32::try_from(value).unwrap_or(u32::MAX);
                self.set_poll_interval_ms(ms);
                Ok(())
            }
        }
    }
}

/// Named settings exposed as text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Enable,
    Delay,
}

impl Attribute {
    pub const ALL: [Attribute; 2] = [Attribute::Enable, Attribute::Delay];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Enable => "enable",
            Attribute::Delay => "delay",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Mma865xError;

    fn from_str(s: &str) -> Result<Self> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s.trim())
            .ok_or_else(|| Mma865xError::InvalidConfig(format!("unknown attribute '{s}'")))
    }
}

fn parse_decimal(attr: Attribute, input: &str) -> Result<u64> {
    input.trim().parse::<u64>().map_err(|_| {
        Mma865xError::InvalidConfig(format!(
            "{attr}: expected a non-negative decimal integer, got '{}'",
            input.trim()
        ))
    })
}

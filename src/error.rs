//! Error types for the MMA865x driver

use thiserror::Error;

/// Failure reported by a [`RegisterTransport`](crate::transport::RegisterTransport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Error raised by an embedded-hal I2C bus
    #[error("I2C error: {0:?}")]
    I2c(embedded_hal::i2c::ErrorKind),

    /// Block read transferred a different byte count than requested
    #[error("transfer error: expected {expected} bytes, transferred {actual}")]
    Transfer { expected: usize, actual: usize },

    /// Nothing answered at the bus address
    #[error("no device responding on the bus")]
    NoDevice,

    /// FTDI driver error
    #[cfg(feature = "ftdi")]
    #[error("FTDI error: {status} ({description})")]
    Ftdi {
        status: u32,
        description: &'static str,
    },
}

/// Error type for MMA865x operations
#[derive(Error, Debug)]
pub enum Mma865xError {
    /// A register transaction failed
    #[error("bus error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: BusError,
    },

    /// The two-write configuration sequence failed.
    ///
    /// Both writes are always attempted; each field holds the outcome of one.
    #[error("configuration failed (standby write: {}, range write: {})", outcome(.standby_write), outcome(.range_write))]
    Configure {
        standby_write: Option<BusError>,
        range_write: Option<BusError>,
    },

    /// Identity register did not match a supported chip
    #[error("MMA865x not found (WHO_AM_I: {})", format_id(.id))]
    NotFound { id: Option<u8> },

    /// Invalid configuration parameter
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

fn outcome(result: &Option<BusError>) -> String {
    match result {
        Some(err) => err.to_string(),
        None => "ok".to_string(),
    }
}

fn format_id(id: &Option<u8>) -> String {
    match id {
        Some(id) => format!("0x{id:02X}"),
        None => "unreadable".to_string(),
    }
}

impl Mma865xError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(BusError) -> Self {
        move |source| Mma865xError::Io { context, source }
    }

    /// True for every failure class caused by bus I/O
    pub fn is_io(&self) -> bool {
        matches!(self, Mma865xError::Io { .. } | Mma865xError::Configure { .. })
    }
}

/// Result type for MMA865x operations
pub type Result<T> = std::result::Result<T, Mma865xError>;

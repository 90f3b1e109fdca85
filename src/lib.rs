//! Driver core for the MMA8652/MMA8653 3-axis accelerometers
//!
//! The driver keeps the chip's standby/active mode, polls X/Y/Z samples at a
//! configurable interval, pushes them to a sink and walks the device through
//! system suspend and resume. Register traffic goes through a
//! [`RegisterTransport`]: any embedded-hal I2C bus, the FT232H USB bridge
//! (feature `ftdi`) or the in-memory [`SimulatedBus`].
//!
//! # Quick Start
//!
//! ## Polling into a channel
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ft232_mma865x_interface::{ChannelSink, ControlSurface, DriverConfig, Mma865x, SimulatedBus};
//!
//! let (sink, samples) = ChannelSink::bounded(64);
//! let driver = Mma865x::probe(SimulatedBus::new(), DriverConfig::default(), Arc::new(sink))?;
//! driver.wait_idle();
//!
//! driver.set_poll_interval_ms(20);
//! driver.set_enabled(true)?;
//!
//! while let Ok(sample) = samples.recv_timeout(Duration::from_secs(1)) {
//!     println!("x = {}, y = {}, z = {}", sample.x, sample.y, sample.z);
//! }
//! # Ok::<(), ft232_mma865x_interface::Mma865xError>(())
//! ```
//!
//! ## Text attributes
//! ```no_run
//! use std::sync::Arc;
//! use ft232_mma865x_interface::{Attribute, ControlSurface, DriverConfig, Mma865x, NullSink, SimulatedBus};
//!
//! let driver = Mma865x::probe(SimulatedBus::new(), DriverConfig::default(), Arc::new(NullSink))?;
//! driver.store(Attribute::Enable, "1")?;
//! driver.store(Attribute::Delay, "50")?;
//! assert_eq!(driver.show(Attribute::Delay)?, "50\n");
//! # Ok::<(), ft232_mma865x_interface::Mma865xError>(())
//! ```
//!
//! ## Suspend and resume
//! ```no_run
//! use std::sync::Arc;
//! use ft232_mma865x_interface::{DriverConfig, Mma865x, NullSink, PowerEvents, SimulatedBus, StandbyMode};
//!
//! let config = DriverConfig::default().with_standby(StandbyMode::Super);
//! let driver = Mma865x::probe(SimulatedBus::new(), config, Arc::new(NullSink))?;
//!
//! driver.on_suspend()?;
//! driver.on_resume();
//! driver.wait_idle();
//! # Ok::<(), ft232_mma865x_interface::Mma865xError>(())
//! ```

pub mod config;
pub mod control;
pub mod device;
pub mod driver;
pub mod error;
#[cfg(feature = "ftdi")]
mod ffi;
#[cfg(feature = "ftdi")]
pub mod ft232;
pub mod poll;
pub mod protocol;
pub mod registers;
pub mod sim;
pub mod sink;
pub mod suspend;
pub mod transport;

// Re-export public API
pub use config::{DriverConfig, StandbyMode, MODE_CHANGE_DELAY};
pub use control::{Attribute, ControlSurface};
pub use device::{Device, PowerState, TickOutcome};
pub use driver::{detect, Mma865x};
pub use error::{BusError, Mma865xError, Result};
#[cfg(feature = "ftdi")]
pub use ft232::Ft232Transport;
pub use poll::{clamp_interval_ms, PollConfig, PollScheduler};
pub use protocol::DeviceProtocol;
pub use registers::{ChipVariant, Range, Sample};
pub use sim::SimulatedBus;
pub use sink::{ChannelSink, NullSink, SampleSink};
pub use suspend::{PowerEvents, SuspendCoordinator, SuspendPhase};
pub use transport::{I2cTransport, RegisterTransport};

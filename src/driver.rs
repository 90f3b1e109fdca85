//! Driver bootstrap and teardown
//!
//! [`Mma865x`] owns one bound device together with its poll thread and its
//! deferred-work slot, and is what the platform and the control surface talk
//! to.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::DriverConfig;
use crate::control::ControlSurface;
use crate::device::{Device, PowerState};
use crate::error::Result;
use crate::poll::{PollConfig, PollScheduler};
use crate::protocol::DeviceProtocol;
use crate::registers::{ChipVariant, Range};
use crate::sink::SampleSink;
use crate::suspend::{JobSlot, PowerEvents, SuspendCoordinator, SuspendPhase};
use crate::transport::RegisterTransport;

/// Identify the chip behind `bus` without binding to it
pub fn detect<T: RegisterTransport>(bus: &mut T) -> Result<ChipVariant> {
    let mut protocol = DeviceProtocol::new(bus);
    protocol.identify()
}

/// A bound MMA8652/MMA8653
pub struct Mma865x<T: RegisterTransport + 'static> {
    device: Arc<Device<T>>,
    poll: PollConfig,
    scheduler: PollScheduler,
    suspend: SuspendCoordinator<T>,
    jobs: Arc<JobSlot>,
    torn_down: bool,
}

impl<T: RegisterTransport + 'static> Mma865x<T> {
    /// Identify the chip and bind to it.
    ///
    /// The device starts in standby. Bring-up configuration runs as deferred
    /// work; call [`wait_idle`](Self::wait_idle) to wait for it.
    pub fn probe(bus: T, config: DriverConfig, sink: Arc<dyn SampleSink>) -> Result<Self> {
        config.validate()?;

        let address = bus.address();
        let mut protocol = DeviceProtocol::new(bus);
        let variant = protocol.identify()?;
        info!(
            "{} detected at 0x{:02X} ({}-bit)",
            variant.name(),
            address,
            variant.resolution_bits()
        );

        let device = Arc::new(Device::new(
            protocol,
            address,
            variant,
            config.range,
            config.settle_delay,
        ));
        let jobs = Arc::new(JobSlot::default());

        let bring_up = Arc::clone(&device);
        jobs.spawn("mma865x-init", move || {
            if let Err(e) = bring_up.reinitialize() {
                warn!("MMA865x bring-up failed: {e}");
            }
        })?;

        let poll = PollConfig::new(config.poll_interval_ms, config.parked_interval_ms);
        let scheduler = match PollScheduler::spawn(Arc::clone(&device), poll.clone(), sink) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                jobs.drain();
                return Err(e);
            }
        };

        let suspend = SuspendCoordinator::new(Arc::clone(&device), Arc::clone(&jobs), config.standby);
        debug!("MMA865x probed");

        Ok(Self {
            device,
            poll,
            scheduler,
            suspend,
            jobs,
            torn_down: false,
        })
    }

    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    pub fn variant(&self) -> ChipVariant {
        self.device.variant()
    }

    pub fn power_state(&self) -> PowerState {
        self.device.power_state()
    }

    pub fn suspend_phase(&self) -> SuspendPhase {
        self.suspend.phase()
    }

    /// Block until no deferred work (bring-up or resume) is outstanding
    pub fn wait_idle(&self) {
        self.jobs.drain();
    }

    pub fn is_busy(&self) -> bool {
        self.jobs.is_busy()
    }

    /// Select a new range and replay the init sequence
    pub fn set_range(&self, range: Range) -> Result<()> {
        let _control = self.device.lock_control();
        self.device.reinitialize_with(range)
    }

    /// Stop polling, drain deferred work and power the chip down.
    ///
    /// Returns the number of samples the poll thread reported.
    pub fn shutdown(mut self) -> Result<u64> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<u64> {
        if self.torn_down {
            return Ok(0);
        }
        self.torn_down = true;

        let reported = self.scheduler.stop();
        self.jobs.drain();

        let result = self.device.stop();
        self.device.close_reporting();
        match &result {
            Ok(()) => debug!("MMA865x removed"),
            Err(e) => warn!("power-down at teardown failed: {e}"),
        }
        result.map(|()| reported)
    }
}

impl<T: RegisterTransport + 'static> Drop for Mma865x<T> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

impl<T: RegisterTransport + 'static> ControlSurface for Mma865x<T> {
    fn enabled(&self) -> Result<bool> {
        self.device.is_enabled()
    }

    fn set_enabled(&self, on: bool) -> Result<()> {
        let _control = self.device.lock_control();
        if on {
            self.device.enable()
        } else {
            self.device.disable()
        }
    }

    fn poll_interval_ms(&self) -> u32 {
        self.poll.interval_ms()
    }

    fn set_poll_interval_ms(&self, ms: u32) -> u32 {
        let applied = self.poll.set_interval_ms(ms);
        debug!("poll interval set to {applied} ms");
        applied
    }
}

impl<T: RegisterTransport + 'static> PowerEvents for Mma865x<T> {
    fn on_suspend(&self) -> Result<()> {
        self.suspend.on_suspend()
    }

    fn on_resume(&self) {
        self.suspend.on_resume()
    }
}

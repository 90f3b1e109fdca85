//! Device handle and power state machine
//!
//! One [`Device`] exists per bound sensor. All register traffic and every
//! power transition goes through its handle lock, so no two register
//! sequences can interleave, whichever context (control surface, poll tick,
//! power event) they come from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::error::Result;
use crate::protocol::DeviceProtocol;
use crate::registers::{ChipVariant, Range, Sample};
use crate::sink::{ReportGate, SampleSink};
use crate::transport::RegisterTransport;

/// Logical operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Standby,
    Active,
}

/// Result of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Standby or reporting closed; the bus was not touched
    Parked,
    /// Ready bit clear, nothing to report yet
    NoData,
    Reported(Sample),
    /// Bus error; logged, retried on the next tick
    Failed,
}

/// State guarded by the device lock
pub(crate) struct DeviceHandle<T> {
    pub(crate) protocol: DeviceProtocol<T>,
    pub(crate) range: Range,
    pub(crate) power: PowerState,
    /// Range captured at suspend when the supply is cut
    pub(crate) saved_range: Option<Range>,
    /// Logical state to restore after resume
    pub(crate) resume_active: bool,
}

/// One bound MMA865x
pub struct Device<T> {
    handle: Mutex<DeviceHandle<T>>,
    // Serializes control-surface calls without blocking power events
    control: Mutex<()>,
    address: u8,
    variant: ChipVariant,
    settle_delay: Duration,
    suspend_pending: AtomicBool,
    reporting: ReportGate,
}

impl<T: RegisterTransport> Device<T> {
    pub(crate) fn new(
        protocol: DeviceProtocol<T>,
        address: u8,
        variant: ChipVariant,
        range: Range,
        settle_delay: Duration,
    ) -> Self {
        Self {
            handle: Mutex::new(DeviceHandle {
                protocol,
                range,
                power: PowerState::Standby,
                saved_range: None,
                resume_active: false,
            }),
            control: Mutex::new(()),
            address,
            variant,
            settle_delay,
            suspend_pending: AtomicBool::new(false),
            reporting: ReportGate::default(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DeviceHandle<T>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    pub fn range(&self) -> Range {
        self.lock().range
    }

    /// Last committed logical state
    pub fn power_state(&self) -> PowerState {
        self.lock().power
    }

    /// True between the start of suspend and the end of the resume job
    pub fn is_suspend_pending(&self) -> bool {
        self.suspend_pending.load(Ordering::SeqCst)
    }

    pub(crate) fn set_suspend_pending(&self, pending: bool) {
        self.suspend_pending.store(pending, Ordering::SeqCst);
    }

    pub fn is_reporting(&self) -> bool {
        self.reporting.is_open()
    }

    pub(crate) fn open_reporting(&self) {
        self.reporting.open();
    }

    pub(crate) fn close_reporting(&self) {
        self.reporting.close();
    }

    /// Standby → Active.
    ///
    /// A no-op when already active. On a failed power write the state stays
    /// `Standby` and the error is returned. Reporting opens unless a suspend
    /// is pending; the resume job opens it in that case.
    pub fn enable(&self) -> Result<()> {
        let mut handle = self.lock();
        if handle.power == PowerState::Active {
            return Ok(());
        }

        if let Err(e) = handle.protocol.set_power(true) {
            warn!("enable failed, staying in standby: {e}");
            return Err(e);
        }

        handle.power = PowerState::Active;
        if !self.is_suspend_pending() {
            self.reporting.open();
        }
        debug!("MMA865x active");
        Ok(())
    }

    /// Active → Standby.
    ///
    /// A no-op when already in standby. On a failed power write the state
    /// stays `Active`; the hardware bit may or may not have changed, which
    /// [`is_enabled`](Self::is_enabled) reveals by re-reading it.
    pub fn disable(&self) -> Result<()> {
        let mut handle = self.lock();
        // An explicit disable overrides whatever suspend recorded
        handle.resume_active = false;
        self.disable_locked(&mut handle)
    }

    fn disable_locked(&self, handle: &mut DeviceHandle<T>) -> Result<()> {
        if handle.power == PowerState::Standby {
            return Ok(());
        }

        if let Err(e) = handle.protocol.set_power(false) {
            warn!("disable failed, still marked active: {e}");
            return Err(e);
        }

        handle.power = PowerState::Standby;
        self.reporting.close();
        debug!("MMA865x standby");
        Ok(())
    }

    /// Suspend half: remember the logical state, optionally capture the
    /// range register, drop to standby and close reporting.
    ///
    /// Reporting is closed even when the power write fails.
    pub(crate) fn quiesce(&self, capture_range: bool) -> Result<()> {
        let mut handle = self.lock();
        let was_active = handle.power == PowerState::Active;

        handle.saved_range = None;
        if capture_range {
            let current = handle.range;
            let saved = match handle.protocol.read_range_register() {
                Ok(raw) => Range::try_from(raw).unwrap_or_else(|e| {
                    warn!("unexpected XYZ_DATA_CFG at suspend ({e}), keeping {current}");
                    current
                }),
                Err(e) => {
                    warn!("could not capture range at suspend: {e}");
                    current
                }
            };
            handle.saved_range = Some(saved);
        }

        let result = self.disable_locked(&mut handle);
        handle.resume_active = was_active;
        self.reporting.close();
        result
    }

    /// Resume half, run from the deferred job.
    ///
    /// With `reinit`, the full init sequence is replayed using the range
    /// captured at suspend. The power bit is then re-asserted if the device
    /// was active at suspend (or was enabled since), and only after that is
    /// reporting reopened.
    pub(crate) fn restore(&self, reinit: bool) {
        if reinit {
            let range = {
                let handle = self.lock();
                handle.saved_range.unwrap_or(handle.range)
            };
            if let Err(e) = self.reinitialize_with(range) {
                warn!("re-init after resume failed: {e}");
            }
        }

        let mut handle = self.lock();
        let want_active =
            std::mem::take(&mut handle.resume_active) || handle.power == PowerState::Active;
        handle.saved_range = None;

        if want_active {
            match handle.protocol.set_power(true) {
                Ok(()) => handle.power = PowerState::Active,
                Err(e) => warn!("could not re-enable after resume: {e}"),
            }
        }

        self.set_suspend_pending(false);
        if handle.power == PowerState::Active {
            self.reporting.open();
        }
        debug!("MMA865x resumed ({:?})", handle.power);
    }

    /// Full configuration with the current range
    pub fn reinitialize(&self) -> Result<()> {
        let range = self.range();
        self.reinitialize_with(range)
    }

    /// Power off, select `range`, settle, then re-assert power if the logical
    /// state is `Active`.
    ///
    /// The lock is released during the settle delay; the final step reads the
    /// state as it is after the delay.
    pub fn reinitialize_with(&self, range: Range) -> Result<()> {
        debug!("MMA865x init ({range})");
        {
            let mut handle = self.lock();
            handle.protocol.configure(range)?;
            handle.range = range;
        }

        thread::sleep(self.settle_delay);

        let mut handle = self.lock();
        if handle.power == PowerState::Active {
            handle.protocol.set_power(true)?;
        }
        debug!("MMA865x init end");
        Ok(())
    }

    /// Live enabled state: ACTIVE bit set and logical state `Active`.
    ///
    /// Always re-reads CTRL_REG1 so drift between driver and hardware shows.
    pub fn is_enabled(&self) -> Result<bool> {
        let mut handle = self.lock();
        let bit = handle.protocol.power_bit()?;
        Ok(bit && handle.power == PowerState::Active)
    }

    /// One poll tick: check readiness, read and forward a sample.
    ///
    /// Never touches the bus while reporting is closed or the device is in
    /// standby. Errors are logged and swallowed.
    ///
    /// The sample is handed to the sink with the device lock still held, so
    /// once suspend has closed reporting no tick can deliver a late sample.
    /// Sinks must not block.
    pub fn poll_once(&self, sink: &dyn SampleSink) -> TickOutcome {
        if !self.reporting.is_open() {
            return TickOutcome::Parked;
        }

        let mut handle = self.lock();
        // The gate only changes under this lock; re-check it now that we hold it
        if !self.reporting.is_open() || handle.power != PowerState::Active {
            return TickOutcome::Parked;
        }

        match handle.protocol.read_status() {
            Ok(true) => {}
            Ok(false) => {
                trace!("MMA865x waiting for new data");
                return TickOutcome::NoData;
            }
            Err(e) => {
                debug!("MMA865x status read failed: {e}");
                return TickOutcome::Failed;
            }
        }

        let sample = match handle.protocol.read_sample() {
            Ok(sample) => sample,
            Err(e) => {
                debug!("MMA865x data read failed: {e}");
                return TickOutcome::Failed;
            }
        };

        trace!("x = {}, y = {}, z = {}", sample.x, sample.y, sample.z);
        sink.report(sample);
        drop(handle);
        TickOutcome::Reported(sample)
    }

    /// Power the chip down on teardown. The logical state is not changed.
    pub(crate) fn stop(&self) -> Result<()> {
        let mut handle = self.lock();
        handle.protocol.set_power(false)
    }
}

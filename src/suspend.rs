//! Suspend/resume coordination
//!
//! Suspend runs synchronously on the caller's thread. Resume only queues a
//! deferred job and returns; the job replays whatever the platform may have
//! lost and reopens reporting when it is done.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::config::StandbyMode;
use crate::device::Device;
use crate::error::Result;
use crate::transport::RegisterTransport;

/// Where the device is in a suspend/resume cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuspendPhase {
    #[default]
    Running,
    Suspending,
    Suspended,
    Resuming,
}

/// Hooks the platform calls around system sleep
pub trait PowerEvents {
    /// Quiesce the device. Returns once the standby write has completed or
    /// failed.
    fn on_suspend(&self) -> Result<()>;

    /// Queue re-initialization and return immediately.
    ///
    /// If the job cannot be queued the device stays suspended with reporting
    /// closed, and the next `on_resume` tries again.
    fn on_resume(&self);
}

/// Slot for at most one outstanding deferred job
#[derive(Default)]
pub(crate) struct JobSlot {
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl JobSlot {
    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `job` unless one is still running.
    ///
    /// Returns `Ok(false)` when the slot is busy. A finished job is reaped
    /// first.
    pub(crate) fn spawn<F>(&self, name: &str, job: F) -> Result<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(previous) = slot.take() {
            if !previous.is_finished() {
                *slot = Some(previous);
                return Ok(false);
            }
            if previous.join().is_err() {
                warn!("previous deferred job panicked");
            }
        }

        let handle = thread::Builder::new().name(name.to_string()).spawn(job)?;
        *slot = Some(handle);
        Ok(true)
    }

    /// Wait for the outstanding job, if any
    pub(crate) fn drain(&self) {
        let pending = self.lock().take();
        if let Some(handle) = pending {
            if handle.join().is_err() {
                warn!("deferred job panicked");
            }
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

/// Drives one device through suspend and resume
pub struct SuspendCoordinator<T> {
    device: Arc<Device<T>>,
    jobs: Arc<JobSlot>,
    standby: StandbyMode,
    phase: Arc<Mutex<SuspendPhase>>,
    // Serializes the two hooks against each other
    hook_lock: Mutex<()>,
}

impl<T: RegisterTransport + 'static> SuspendCoordinator<T> {
    pub(crate) fn new(device: Arc<Device<T>>, jobs: Arc<JobSlot>, standby: StandbyMode) -> Self {
        Self {
            device,
            jobs,
            standby,
            phase: Arc::new(Mutex::new(SuspendPhase::Running)),
            hook_lock: Mutex::new(()),
        }
    }

    pub fn phase(&self) -> SuspendPhase {
        *lock_phase(&self.phase)
    }

    pub fn standby_mode(&self) -> StandbyMode {
        self.standby
    }

    fn set_phase(&self, phase: SuspendPhase) {
        *lock_phase(&self.phase) = phase;
    }
}

fn lock_phase(phase: &Mutex<SuspendPhase>) -> MutexGuard<'_, SuspendPhase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: RegisterTransport + 'static> PowerEvents for SuspendCoordinator<T> {
    fn on_suspend(&self) -> Result<()> {
        let _hook = self.hook_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.device.set_suspend_pending(true);
        // A resume job from the previous cycle must finish first
        self.jobs.drain();
        // A drained resume job clears the flag on its way out
        self.device.set_suspend_pending(true);

        if self.phase() == SuspendPhase::Suspended {
            debug!("already suspended");
            return Ok(());
        }
        self.set_phase(SuspendPhase::Suspending);

        let result = {
            let _control = self.device.lock_control();
            self.device.quiesce(self.standby == StandbyMode::Super)
        };
        self.set_phase(SuspendPhase::Suspended);

        match &result {
            Ok(()) => debug!("MMA865x suspended"),
            Err(e) => warn!("standby write at suspend failed: {e}"),
        }
        result
    }

    fn on_resume(&self) {
        let _hook = self.hook_lock.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let mut phase = lock_phase(&self.phase);
            if *phase != SuspendPhase::Suspended {
                debug!("resume ignored in phase {:?}", *phase);
                return;
            }
            *phase = SuspendPhase::Resuming;
        }

        let device = Arc::clone(&self.device);
        let phase = Arc::clone(&self.phase);
        let reinit = self.standby == StandbyMode::Super;

        let queued = self.jobs.spawn("mma865x-resume", move || {
            device.restore(reinit);
            *lock_phase(&phase) = SuspendPhase::Running;
        });

        match queued {
            Ok(true) => debug!("MMA865x resume queued"),
            // Left in Suspended so the next on_resume retries
            Ok(false) => {
                warn!("deferred work still running, resume not queued");
                self.set_phase(SuspendPhase::Suspended);
            }
            Err(e) => {
                warn!("could not queue resume work: {e}");
                self.set_phase(SuspendPhase::Suspended);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::PowerState;
    use crate::protocol::DeviceProtocol;
    use crate::registers::{ChipVariant, Range};
    use crate::sim::SimulatedBus;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn coordinator(standby: StandbyMode) -> (SuspendCoordinator<SimulatedBus>, Arc<JobSlot>, SimulatedBus) {
        let bus = SimulatedBus::new();
        let device = Arc::new(Device::new(
            DeviceProtocol::new(bus.clone()),
            0x1D,
            ChipVariant::Mma8652,
            Range::G2,
            Duration::from_millis(1),
        ));
        let jobs = Arc::new(JobSlot::default());
        (
            SuspendCoordinator::new(device, Arc::clone(&jobs), standby),
            jobs,
            bus,
        )
    }

    #[test]
    fn test_job_slot_holds_one_job() {
        let slot = JobSlot::default();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        assert!(slot
            .spawn("test-job", move || {
                let _ = release_rx.recv();
            })
            .unwrap());
        assert!(slot.is_busy());
        assert!(!slot.spawn("test-job", || {}).unwrap());

        release_tx.send(()).unwrap();
        slot.drain();
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_drain_waits_for_job() {
        let slot = JobSlot::default();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        slot.spawn("test-job", move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
        slot.drain();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_phase_walks_the_cycle() {
        let (coordinator, jobs, bus) = coordinator(StandbyMode::Normal);
        coordinator.device.enable().unwrap();
        assert_eq!(coordinator.phase(), SuspendPhase::Running);

        coordinator.on_suspend().unwrap();
        assert_eq!(coordinator.phase(), SuspendPhase::Suspended);
        assert!(!bus.power_bit());

        coordinator.on_resume();
        jobs.drain();
        assert_eq!(coordinator.phase(), SuspendPhase::Running);
        assert!(bus.power_bit());
        assert_eq!(coordinator.device.power_state(), PowerState::Active);
    }

    #[test]
    fn test_resume_without_suspend_is_ignored() {
        let (coordinator, jobs, bus) = coordinator(StandbyMode::Normal);
        coordinator.on_resume();
        assert!(!jobs.is_busy());
        assert_eq!(coordinator.phase(), SuspendPhase::Running);
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_repeated_suspend_is_a_no_op() {
        let (coordinator, _jobs, bus) = coordinator(StandbyMode::Normal);
        coordinator.device.enable().unwrap();
        coordinator.on_suspend().unwrap();
        bus.clear_ops();

        coordinator.on_suspend().unwrap();
        assert!(bus.ops().is_empty());
        assert!(coordinator.device.is_suspend_pending());
    }

    #[test]
    fn test_failed_standby_write_is_reported() {
        let (coordinator, _jobs, bus) = coordinator(StandbyMode::Normal);
        coordinator.device.enable().unwrap();
        bus.fail_next_write();

        assert!(coordinator.on_suspend().is_err());
        assert!(!coordinator.device.is_reporting());
        assert_eq!(coordinator.phase(), SuspendPhase::Suspended);
    }

    #[test]
    fn test_resume_retries_after_busy_slot() {
        let (coordinator, jobs, bus) = coordinator(StandbyMode::Normal);
        coordinator.device.enable().unwrap();
        coordinator.on_suspend().unwrap();

        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        assert!(jobs
            .spawn("test-job", move || {
                let _ = release_rx.recv();
            })
            .unwrap());

        coordinator.on_resume();
        assert_eq!(coordinator.phase(), SuspendPhase::Suspended);
        assert!(coordinator.device.is_suspend_pending());
        assert!(!coordinator.device.is_reporting());
        assert!(!bus.power_bit());

        release_tx.send(()).unwrap();
        jobs.drain();

        coordinator.on_resume();
        jobs.drain();
        assert_eq!(coordinator.phase(), SuspendPhase::Running);
        assert!(coordinator.device.is_reporting());
        assert!(bus.power_bit());
    }
}

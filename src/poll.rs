//! Periodic sampling
//!
//! The poll thread ticks forever at the configured interval, or at the slower
//! parked interval while reporting is closed. The wait period is re-read at
//! the start of every cycle, so interval changes apply from the next one.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, trace, warn};

use crate::device::{Device, TickOutcome};
use crate::error::Result;
use crate::sink::SampleSink;
use crate::transport::RegisterTransport;

pub const POLL_INTERVAL_MIN_MS: u32 = 1;
pub const POLL_INTERVAL_MAX_MS: u32 = 500;
pub const POLL_INTERVAL_DEFAULT_MS: u32 = 100;
/// Cadence while nothing is being reported
pub const POLL_PARKED_MS: u32 = 200;

/// Clamp a requested interval into [1, 500] ms
pub fn clamp_interval_ms(ms: u32) -> u32 {
    ms.clamp(POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MAX_MS)
}

/// Shared, live-adjustable poll timing
#[derive(Debug, Clone)]
pub struct PollConfig {
    interval_ms: Arc<AtomicU32>,
    parked_ms: u32,
}

impl PollConfig {
    pub fn new(interval_ms: u32, parked_ms: u32) -> Self {
        Self {
            interval_ms: Arc::new(AtomicU32::new(clamp_interval_ms(interval_ms))),
            parked_ms: parked_ms.max(1),
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    /// Store a new interval, returning the clamped value actually applied
    pub fn set_interval_ms(&self, ms: u32) -> u32 {
        let applied = clamp_interval_ms(ms);
        self.interval_ms.store(applied, Ordering::Relaxed);
        applied
    }

    pub fn parked_ms(&self) -> u32 {
        self.parked_ms
    }

    /// Length of the next wait period
    pub fn wait_for(&self, reporting: bool) -> Duration {
        let ms = if reporting {
            self.interval_ms()
        } else {
            self.parked_ms
        };
        Duration::from_millis(u64::from(ms))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(POLL_INTERVAL_DEFAULT_MS, POLL_PARKED_MS)
    }
}

/// Handle to the running poll thread
pub struct PollScheduler {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<u64>>,
}

impl PollScheduler {
    /// Start polling `device` on a dedicated thread
    pub fn spawn<T>(
        device: Arc<Device<T>>,
        config: PollConfig,
        sink: Arc<dyn SampleSink>,
    ) -> Result<Self>
    where
        T: RegisterTransport + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("mma865x-poll".to_string())
            .spawn(move || {
                let mut reported = 0u64;
                let mut failures = 0u64;
                debug!("poll thread started");

                loop {
                    let wait = config.wait_for(device.is_reporting());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    match device.poll_once(sink.as_ref()) {
                        TickOutcome::Reported(_) => reported += 1,
                        TickOutcome::Failed => failures += 1,
                        TickOutcome::NoData | TickOutcome::Parked => {}
                    }
                }

                debug!("poll thread stopped: {reported} samples, {failures} failed ticks");
                reported
            })?;

        Ok(Self {
            stop_tx,
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it; returns the number of samples reported
    pub fn stop(&mut self) -> u64 {
        let Some(thread) = self.thread.take() else {
            return 0;
        };

        let _ = self.stop_tx.try_send(());
        match thread.join() {
            Ok(reported) => reported,
            Err(_) => {
                warn!("poll thread panicked");
                0
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            trace!("stopping poll thread on drop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DeviceProtocol;
    use crate::registers::{ChipVariant, Range, Sample};
    use crate::sim::SimulatedBus;
    use crate::sink::ChannelSink;
    use proptest::prelude::*;

    #[test]
    fn test_interval_boundaries() {
        assert_eq!(clamp_interval_ms(0), 1);
        assert_eq!(clamp_interval_ms(1), 1);
        assert_eq!(clamp_interval_ms(500), 500);
        assert_eq!(clamp_interval_ms(501), 500);
        assert_eq!(clamp_interval_ms(100_000), 500);
    }

    #[test]
    fn test_set_interval_returns_applied_value() {
        let config = PollConfig::default();
        assert_eq!(config.interval_ms(), 100);
        assert_eq!(config.set_interval_ms(750), 500);

        let shared = config.clone();
        assert_eq!(shared.interval_ms(), 500);
    }

    #[test]
    fn test_parked_wait_is_used_without_reporting() {
        let config = PollConfig::new(10, 200);
        assert_eq!(config.wait_for(true), Duration::from_millis(10));
        assert_eq!(config.wait_for(false), Duration::from_millis(200));
    }

    #[test]
    fn test_scheduler_forwards_samples() {
        let bus = SimulatedBus::new();
        bus.push_samples([Sample::new(1, 2, 3), Sample::new(4, 5, 6)]);
        let device = Arc::new(Device::new(
            DeviceProtocol::new(bus.clone()),
            0x1D,
            ChipVariant::Mma8652,
            Range::G2,
            Duration::from_millis(1),
        ));
        device.enable().unwrap();

        let (sink, rx) = ChannelSink::bounded(8);
        let mut scheduler =
            PollScheduler::spawn(Arc::clone(&device), PollConfig::new(1, 5), Arc::new(sink))
                .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, Sample::new(1, 2, 3));
        assert_eq!(second, Sample::new(4, 5, 6));

        assert_eq!(scheduler.stop(), 2);
        assert!(!scheduler.is_running());
    }

    proptest! {
        #[test]
        fn prop_clamped_interval_in_bounds(ms in any::<u32>()) {
            let applied = clamp_interval_ms(ms);
            prop_assert!((POLL_INTERVAL_MIN_MS..=POLL_INTERVAL_MAX_MS).contains(&applied));
            if (POLL_INTERVAL_MIN_MS..=POLL_INTERVAL_MAX_MS).contains(&ms) {
                prop_assert_eq!(applied, ms);
            }
        }
    }
}

//! Sample delivery
//!
//! Samples are pushed to a [`SampleSink`] from the poll thread. Delivery is
//! best-effort: a sink must never block the poll tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::trace;

use crate::registers::Sample;

/// Consumer of reported samples.
///
/// Implemented for any `Fn(Sample) + Send + Sync` closure.
pub trait SampleSink: Send + Sync {
    fn report(&self, sample: Sample);
}

impl<F> SampleSink for F
where
    F: Fn(Sample) + Send + Sync,
{
    fn report(&self, sample: Sample) {
        self(sample)
    }
}

/// Discards every sample
pub struct NullSink;

impl SampleSink for NullSink {
    fn report(&self, _sample: Sample) {}
}

/// Bounded channel sink; drops samples while the receiver lags
pub struct ChannelSink {
    tx: Sender<Sample>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds
    pub fn bounded(capacity: usize) -> (Self, Receiver<Sample>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Samples lost to a full or disconnected channel
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SampleSink for ChannelSink {
    fn report(&self, sample: Sample) {
        match self.tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("sample dropped ({dropped} total)");
            }
        }
    }
}

/// Whether reported samples may reach the sink
#[derive(Debug, Default)]
pub(crate) struct ReportGate {
    open: AtomicBool,
}

impl ReportGate {
    pub(crate) fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, rx) = ChannelSink::bounded(2);
        for i in 0..5 {
            sink.report(Sample::new(i, 0, 0));
        }

        assert_eq!(sink.dropped(), 3);
        let received: Vec<Sample> = rx.try_iter().collect();
        assert_eq!(received, vec![Sample::new(0, 0, 0), Sample::new(1, 0, 0)]);
    }

    #[test]
    fn test_channel_sink_survives_disconnected_receiver() {
        let (sink, rx) = ChannelSink::bounded(4);
        drop(rx);
        sink.report(Sample::default());
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |sample: Sample| seen.lock().unwrap().push(sample);
        sink.report(Sample::new(7, 8, 9));
        assert_eq!(*seen.lock().unwrap(), vec![Sample::new(7, 8, 9)]);
    }

    #[test]
    fn test_report_gate_starts_closed() {
        let gate = ReportGate::default();
        assert!(!gate.is_open());
        gate.open();
        assert!(gate.is_open());
        gate.close();
        assert!(!gate.is_open());
    }
}

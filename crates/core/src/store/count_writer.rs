//! Sequenced persistence of the latest face count.
//!
//! The detection loop must never wait on the store, yet the stored value has
//! to end up equal to the most recently published count. A single-slot cell
//! holds the newest count and one writer thread persists it; values published
//! while a write is in flight overwrite each other in the slot and only the
//! latest is written next.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::store::domain::count_store::CountStore;

type Slot = Arc<Mutex<Option<usize>>>;

/// Creates a connected publisher/writer pair over `store`.
///
/// `settle_delay` is waited before every write.
pub fn count_channel(
    store: Arc<dyn CountStore>,
    settle_delay: Duration,
) -> (CountPublisher, CountWriter) {
    let slot: Slot = Arc::new(Mutex::new(None));
    let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
    (
        CountPublisher {
            slot: Arc::clone(&slot),
            wake: wake_tx,
        },
        CountWriter {
            slot,
            wake: wake_rx,
            store,
            settle_delay,
        },
    )
}

/// Detection-side handle. Publishing never blocks on I/O.
pub struct CountPublisher {
    slot: Slot,
    wake: Sender<()>,
}

impl CountPublisher {
    pub fn publish(&self, count: usize) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(count);
        match self.wake.try_send(()) {
            // A wake-up is already pending; the writer will see the new value.
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                log::debug!("Count writer gone, dropping count {count}");
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterReport {
    pub writes: usize,
    pub failures: usize,
}

/// Store-side half. Runs on its own thread until every publisher is dropped.
pub struct CountWriter {
    slot: Slot,
    wake: Receiver<()>,
    store: Arc<dyn CountStore>,
    settle_delay: Duration,
}

impl CountWriter {
    pub fn run(self) -> WriterReport {
        let mut report = WriterReport::default();

        while self.wake.recv().is_ok() {
            self.flush(&mut report);
        }
        // Publisher dropped; persist anything set after the last wake-up.
        self.flush(&mut report);

        log::debug!(
            "Count writer finished ({} writes, {} failed)",
            report.writes,
            report.failures
        );
        report
    }

    fn flush(&self, report: &mut WriterReport) {
        let Some(count) = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };

        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        match self.store.write(count) {
            Ok(()) => report.writes += 1,
            Err(e) => {
                report.failures += 1;
                log::warn!("Failed to persist face count {count}: {e}");
            }
        }
    }
}

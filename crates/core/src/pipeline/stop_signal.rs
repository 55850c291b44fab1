use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

/// Process-wide cooperative shutdown flag.
///
/// Clones share state. Triggering sets the flag and disconnects the channel
/// behind [`StopSignal::receiver`], so a thread blocked in `select!` on it
/// wakes immediately.
#[derive(Clone)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    sender: Arc<Mutex<Option<Sender<()>>>>,
    receiver: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            sender: Arc::new(Mutex::new(Some(sender))),
            receiver,
        }
    }

    /// Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Never yields a message; becomes ready (disconnected) once triggered.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::RecvTimeoutError;
    use std::time::{Duration, Instant};

    #[test]
    fn test_starts_untriggered() {
        let stop = StopSignal::new();
        assert!(!stop.is_triggered());
        assert_eq!(
            stop.receiver().recv_timeout(Duration::from_millis(5)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn test_trigger_is_visible_to_clones() {
        let stop = StopSignal::new();
        let clone = stop.clone();
        clone.trigger();
        clone.trigger();
        assert!(stop.is_triggered());
        assert_eq!(
            stop.receiver().recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_trigger_wakes_blocked_waiter() {
        let stop = StopSignal::new();
        let waiter = stop.clone();
        let handle = std::thread::spawn(move || {
            let start = Instant::now();
            let woke = waiter.receiver().recv_timeout(Duration::from_secs(30));
            (woke, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(20));
        stop.trigger();

        let (woke, waited) = handle.join().unwrap();
        assert_eq!(woke, Err(RecvTimeoutError::Disconnected));
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_receiver_is_disconnected_after_trigger() {
        let stop = StopSignal::new();
        stop.trigger();
        crossbeam_channel::select! {
            recv(stop.receiver()) -> msg => assert!(msg.is_err()),
            default(Duration::from_secs(5)) => panic!("stop receiver not ready"),
        }
    }
}

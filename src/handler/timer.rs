//! Periodic flush timer
//!
//! A dedicated thread waits on a cancellation channel with the flush
//! interval as timeout: a timeout runs the tick, a disconnect stops the
//! thread. Dropping the sender is the cancellation signal.

use flume::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

pub(crate) struct FlushTimer {
    cancel: Mutex<Option<Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl FlushTimer {
    /// Start ticking every `interval`; a zero interval disables the timer
    pub fn start(interval: Duration, tick: impl Fn() + Send + 'static) -> Self {
        if interval.is_zero() {
            return Self::disabled();
        }

        let (tx, rx) = flume::bounded::<()>(0);
        let spawned = thread::Builder::new()
            .name("oc-log-flush".to_string())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => Self {
                cancel: Mutex::new(Some(tx)),
                thread: Mutex::new(Some(handle)),
            },
            Err(e) => {
                warn!("Failed to spawn flush timer: {}", e);
                Self::disabled()
            }
        }
    }

    fn disabled() -> Self {
        Self {
            cancel: Mutex::new(None),
            thread: Mutex::new(None),
        }
    }

    /// Cancel the timer and wait for its thread to exit
    pub fn stop(&self) {
        drop(self.cancel.lock().take());
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_timer_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let timer = FlushTimer::start(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        timer.stop();
        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 2);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_stop_is_prompt_and_idempotent() {
        let timer = FlushTimer::start(Duration::from_secs(3600), || {});
        let started = Instant::now();
        timer.stop();
        timer.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_zero_interval_disables() {
        let timer = FlushTimer::start(Duration::ZERO, || panic!("must not tick"));
        assert!(timer.thread.lock().is_none());
        timer.stop();
    }
}

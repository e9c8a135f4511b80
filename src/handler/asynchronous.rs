//! Asynchronous handler
//!
//! Callers build the record into a pooled envelope and hand it to a bounded
//! queue. Workers are spawned on demand, up to `max_async_exec`, and retire
//! after a stretch of empty polls, so an idle logger holds no threads.
//!
//! A `None` in the queue is a sentinel: a flush request while running, the
//! stop signal once closed.

use super::timer::FlushTimer;
use super::wait_group::WaitGroup;
use super::Handler;
use crate::config::Settings;
use crate::constants::{
    BUSY_YIELD_THRESHOLD, IDLE_POLL_MS, IDLE_THRESHOLD, MAX_BACKOFF_SHIFT, SPAWN_AFTER_RETRIES,
};
use crate::error::LogError;
use crate::level::Level;
use crate::logger::Shared;
use crate::message::{Message, Payload, Site};
use crate::pusher::Pusher;
use flume::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, trace};

type Envelope = Option<Box<Message>>;

pub(crate) struct AsyncHandler {
    dispatcher: Arc<Dispatcher>,
    timer: FlushTimer,
    /// Serializes closers so every caller returns after the drain
    closing: Mutex<()>,
}

/// State shared between producers and workers
struct Dispatcher {
    settings: Arc<Settings>,
    pusher: Pusher,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    /// Live worker count, never above `max_async_exec`
    exec_count: AtomicUsize,
    closed: AtomicBool,
    workers: Arc<WaitGroup>,
}

impl AsyncHandler {
    pub fn new(settings: Arc<Settings>, owner: Weak<Shared>) -> Self {
        let (tx, rx) = flume::bounded(settings.max_async_buffer);
        let pusher = Pusher::new(settings.clone(), owner);
        pusher.prefill(settings.max_async_buffer);

        let dispatcher = Arc::new(Dispatcher {
            settings: settings.clone(),
            pusher,
            tx,
            rx,
            exec_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            workers: Arc::new(WaitGroup::default()),
        });

        let ticking = dispatcher.clone();
        let timer = FlushTimer::start(settings.flush_interval, move || ticking.request_flush());

        debug!(
            "Async logging: {} workers max, queue of {}",
            settings.max_async_exec, settings.max_async_buffer
        );

        Self {
            dispatcher,
            timer,
            closing: Mutex::new(()),
        }
    }
}

impl Handler for AsyncHandler {
    fn flush(&self) {
        self.dispatcher.request_flush();
    }

    fn close(&self) {
        let _closing = self.closing.lock();
        let d = &self.dispatcher;
        if d.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.timer.stop();
        if !d.rx.is_empty() {
            d.ensure_worker();
        }
        let _ = d.tx.try_send(None);
        d.workers.wait();
        d.pusher.close();
        debug!("Async logging closed");
    }

    fn emit(&self, level: Level, layer: usize, site: Site, payload: Payload<'_>) {
        let d = &self.dispatcher;
        if level < d.settings.level || d.closed.load(Ordering::SeqCst) {
            return;
        }

        let mut m = d.pusher.get();
        d.pusher.assign(&mut m, level, layer, site);
        m.write_text(payload);
        d.enqueue(m);
    }

    fn last_error(&self) -> Option<LogError> {
        self.dispatcher.pusher.last_error()
    }

    fn is_valid(&self) -> bool {
        self.dispatcher.pusher.is_valid()
    }

    fn active_workers(&self) -> usize {
        self.dispatcher.exec_count.load(Ordering::SeqCst)
    }
}

impl Dispatcher {
    // === Producer side ===

    /// Queue a built message, growing the worker pool under pressure
    fn enqueue(self: &Arc<Self>, m: Box<Message>) {
        let mut pending: Envelope = Some(m);
        let mut retry: u32 = 0;

        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    self.ensure_worker();
                    return;
                }
                Err(TrySendError::Disconnected(item)) => {
                    if let Some(m) = item {
                        self.pusher.discard(m);
                    }
                    return;
                }
                Err(TrySendError::Full(item)) => {
                    pending = item;
                    if self.closed.load(Ordering::SeqCst) {
                        if let Some(m) = pending {
                            self.pusher.discard(m);
                        }
                        return;
                    }

                    retry += 1;
                    if retry > SPAWN_AFTER_RETRIES {
                        self.grow();
                    }
                    backoff(retry);
                }
            }
        }
    }

    /// Post a flush sentinel; flush inline when the queue is saturated
    fn request_flush(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.ensure_worker();
        if let Err(TrySendError::Full(_)) = self.tx.try_send(None) {
            self.pusher.flush();
        }
    }

    /// Start a worker when none is running
    fn ensure_worker(self: &Arc<Self>) {
        if self
            .exec_count
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.spawn_worker();
        }
    }

    /// Add a worker unless the pool is at capacity
    fn grow(self: &Arc<Self>) {
        let max = self.settings.max_async_exec;
        if self
            .exec_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .is_ok()
        {
            self.spawn_worker();
        }
    }

    /// Spawn a worker for a slot already counted in `exec_count`
    fn spawn_worker(self: &Arc<Self>) {
        let guard = self.workers.enter();
        let dispatcher = self.clone();

        let spawned = thread::Builder::new()
            .name("oc-log-worker".to_string())
            .spawn(move || {
                let _guard = guard;
                dispatcher.run_worker();
            });

        match spawned {
            Ok(_) => trace!("Async worker started ({} live)", self.exec_count.load(Ordering::SeqCst)),
            Err(e) => {
                self.release_slot();
                error!("Failed to spawn async worker: {}", e);
            }
        }
    }

    // === Worker side ===

    fn run_worker(&self) {
        let poll = Duration::from_millis(IDLE_POLL_MS);
        let mut busy = 0u32;
        let mut idle = 0u32;

        loop {
            match self.rx.recv_timeout(poll) {
                Ok(Some(mut m)) => {
                    idle = 0;
                    busy += 1;
                    if busy > BUSY_YIELD_THRESHOLD {
                        busy = 0;
                        thread::yield_now();
                    }
                    self.pusher.push(&mut m);
                    self.pusher.put(m);
                }
                Ok(None) => {
                    idle = 0;
                    if self.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    self.pusher.flush();
                }
                Err(RecvTimeoutError::Timeout) => {
                    busy = 0;
                    if self.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    idle += 1;
                    if idle > IDLE_THRESHOLD {
                        if self.try_retire() {
                            trace!("Async worker retired");
                            return;
                        }
                        idle = 0;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.drain();
    }

    /// Give up the worker slot unless work arrived meanwhile
    ///
    /// A producer that queued right before the decrement saw a live worker
    /// and spawned nothing, so the queue is checked again after giving up
    /// the slot and the worker takes it back when something is pending.
    fn try_retire(&self) -> bool {
        if self
            .exec_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            return false;
        }
        if self.rx.is_empty() {
            return true;
        }

        let max = self.settings.max_async_exec;
        let revived = self
            .exec_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .is_ok();
        !revived
    }

    /// Push everything left in the queue, then pass the stop signal on
    fn drain(&self) {
        while let Ok(item) = self.rx.try_recv() {
            if let Some(mut m) = item {
                self.pusher.push(&mut m);
                self.pusher.put(m);
            }
        }
        let _ = self.tx.try_send(None);
        self.release_slot();
    }

    fn release_slot(&self) {
        let _ = self
            .exec_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Yield `2^retry` times, capped
fn backoff(retry: u32) {
    for _ in 0..1u32 << retry.min(MAX_BACKOFF_SHIFT) {
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::panic::Location;
    use std::time::Instant;

    fn handler(config: Config) -> AsyncHandler {
        let settings = config
            .with_async(true)
            .with_disable_print(true)
            .with_disable_save(true)
            .with_exec(|task| task())
            .normalize();
        AsyncHandler::new(Arc::new(settings), Weak::new())
    }

    fn collector() -> (Arc<Mutex<Vec<String>>>, Config) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = Config::default().with_msg_callback(move |_, text| sink.lock().push(text.to_string()));
        (seen, config)
    }

    fn wait_until(limit: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while !cond() {
            if Instant::now() > deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    #[test]
    fn test_close_delivers_everything_queued() {
        let (seen, config) = collector();
        let h = handler(config.with_max_async_exec(2).with_max_async_buffer(8));

        for i in 0..500 {
            h.logf(Level::Warning, 0, Location::caller(), format_args!("{}", i));
        }
        h.close();

        assert_eq!(seen.lock().len(), 500);
        assert_eq!(h.active_workers(), 0);
    }

    #[test]
    fn test_zero_capacity_queue_still_delivers() {
        let (seen, config) = collector();
        let h = handler(config.with_max_async_buffer(0).with_max_async_exec(3));

        for i in 0..50 {
            h.logf(Level::Error, 0, Location::caller(), format_args!("{}", i));
        }
        h.close();

        assert_eq!(seen.lock().len(), 50);
    }

    #[test]
    fn test_filtered_levels_never_enqueue() {
        let (seen, config) = collector();
        let h = handler(config.with_level(Level::Error));

        h.log(Level::Debug, 0, Location::caller(), &[&"dropped"]);
        assert_eq!(h.active_workers(), 0);
        assert!(h.dispatcher.rx.is_empty());

        h.close();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_workers_retire_when_idle() {
        let (seen, config) = collector();
        let h = handler(config.with_max_async_exec(4));

        for _ in 0..100 {
            h.logln(Level::Warning, 0, Location::caller(), &[&"tick"]);
        }
        assert!(h.active_workers() <= 4);
        assert!(wait_until(Duration::from_secs(10), || seen.lock().len() == 100));
        assert!(wait_until(Duration::from_secs(10), || h.active_workers() == 0));

        // A retired pool comes back on demand
        h.logln(Level::Warning, 0, Location::caller(), &[&"again"]);
        h.close();
        assert_eq!(seen.lock().len(), 101);
    }

    #[test]
    fn test_emit_after_close_is_dropped() {
        let (seen, config) = collector();
        let h = handler(config);

        h.close();
        h.close();
        h.log(Level::Error, 0, Location::caller(), &[&"late"]);
        h.flush();

        assert!(seen.lock().is_empty());
        assert_eq!(h.active_workers(), 0);
    }

    #[test]
    fn test_concurrent_closers_both_return() {
        let (seen, config) = collector();
        let h = Arc::new(handler(config.with_max_async_exec(2)));

        for _ in 0..200 {
            h.log(Level::Warning, 0, Location::caller(), &[&"x"]);
        }
        let closers: Vec<_> = (0..2)
            .map(|_| {
                let h = h.clone();
                thread::spawn(move || h.close())
            })
            .collect();
        for c in closers {
            c.join().unwrap();
        }

        assert_eq!(seen.lock().len(), 200);
    }
}

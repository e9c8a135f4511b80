//! Join primitive for dynamically spawned workers

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Counts live workers; `wait` blocks until the count reaches zero.
///
/// Unlike joining thread handles, any number of closers can wait at once.
#[derive(Default)]
pub(crate) struct WaitGroup {
    count: Mutex<usize>,
    zero: Condvar,
}

/// Registration of one worker, released on drop
pub(crate) struct WaitGuard(Arc<WaitGroup>);

impl WaitGroup {
    pub fn enter(self: &Arc<Self>) -> WaitGuard {
        *self.count.lock() += 1;
        WaitGuard(self.clone())
    }

    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zero.wait(&mut count);
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.zero.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_without_workers_returns() {
        let wg = Arc::new(WaitGroup::default());
        wg.wait();
    }

    #[test]
    fn test_wait_blocks_until_all_guards_drop() {
        let wg = Arc::new(WaitGroup::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let guard = wg.enter();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10 * i));
                    drop(guard);
                })
            })
            .collect();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let wg = wg.clone();
                thread::spawn(move || wg.wait())
            })
            .collect();

        for w in waiters {
            w.join().unwrap();
        }
        assert_eq!(*wg.count.lock(), 0);
        for h in handles {
            h.join().unwrap();
        }
    }
}

//! Thread-safe object pools
//!
//! A pool is a mutex-guarded free list. Objects are reset through
//! [`Recycle`] before they go back on the list, so a value obtained from
//! [`Pool::get`] never carries data from a previous user.

use crate::constants::{INITIAL_BUFFER_CAPACITY, MAX_POOLED_CAPACITY};
use bytes::BytesMut;
use parking_lot::Mutex;

/// Objects that can be reset for reuse
pub(crate) trait Recycle {
    /// Clear all content. Returns false when the object should be dropped
    /// instead of pooled.
    fn recycle(&mut self) -> bool;
}

impl Recycle for BytesMut {
    fn recycle(&mut self) -> bool {
        self.clear();
        self.capacity() <= MAX_POOLED_CAPACITY
    }
}

impl<T: Recycle> Recycle for Box<T> {
    fn recycle(&mut self) -> bool {
        (**self).recycle()
    }
}

/// Bounded free list of reusable objects
pub(crate) struct Pool<T> {
    free: Mutex<Vec<T>>,
    limit: usize,
    make: fn() -> T,
}

impl<T: Recycle> Pool<T> {
    pub fn new(limit: usize, make: fn() -> T) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            limit,
            make,
        }
    }

    /// Take a cleared object, allocating when the free list is empty
    pub fn get(&self) -> T {
        let pooled = self.free.lock().pop();
        pooled.unwrap_or_else(self.make)
    }

    /// Clear an object and return it to the free list
    pub fn put(&self, mut item: T) {
        if !item.recycle() {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.limit {
            free.push(item);
        }
    }

    /// Pre-allocate up to `count` objects
    pub fn prefill(&self, count: usize) {
        let count = count.min(self.limit);
        let mut free = self.free.lock();
        while free.len() < count {
            free.push((self.make)());
        }
    }

    #[cfg(test)]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// Pool of byte buffers used for message segments
pub(crate) type BufferPool = Pool<BytesMut>;

pub(crate) fn new_buffer() -> BytesMut {
    BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity, overwrite-oldest event history.
//!
//! Each job keeps the most recent events here so that stream readers who
//! attach late can be replayed what they missed.

use parking_lot::RwLock;

/// Thread-safe circular buffer holding the most recent `capacity` items.
///
/// Pushing never blocks on capacity and never fails; when full, the oldest
/// item is overwritten. Readers take point-in-time copies.
pub struct RingBuffer<T> {
    inner: RwLock<Ring<T>>,
}

struct Ring<T> {
    slots: Vec<Option<T>>,
    /// Next slot to write
    head: usize,
    len: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer; a capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Self { inner: RwLock::new(Ring { slots, head: 0, len: 0 }) }
    }

    pub fn push(&self, item: T) {
        let mut ring = self.inner.write();
        let capacity = ring.slots.len();
        let head = ring.head;
        ring.slots[head] = Some(item);
        ring.head = (head + 1) % capacity;
        if ring.len < capacity {
            ring.len += 1;
        }
    }

    /// Copy of all held items, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let ring = self.inner.read();
        let capacity = ring.slots.len();
        let start = (ring.head + capacity - ring.len) % capacity;
        (0..ring.len).filter_map(|i| ring.slots[(start + i) % capacity].clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// Drop every held item.
    pub fn clear(&self) {
        let mut ring = self.inner.write();
        ring.slots.iter_mut().for_each(|slot| *slot = None);
        ring.head = 0;
        ring.len = 0;
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;

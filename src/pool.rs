// SPDX-License-Identifier: MIT OR Apache-2.0
//! A small free-list pool with generation counters.
//!
//! Pass and encoder objects are transient but allocation-heavy, so the
//! device recycles them across frames. Each checkout carries a generation;
//! releasing retires that generation, and debug builds can assert a
//! generation is still live before use, turning silent stale-reuse bugs
//! into panics.

use std::cell::{Cell, RefCell};

#[cfg(debug_assertions)]
use std::collections::HashSet;

pub(crate) struct Pool<T> {
    free: RefCell<Vec<T>>,
    next_generation: Cell<u64>,
    outstanding: Cell<usize>,
    #[cfg(debug_assertions)]
    retired: RefCell<HashSet<u64>>,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Pool {
            free: RefCell::new(Vec::new()),
            next_generation: Cell::new(0),
            outstanding: Cell::new(0),
            #[cfg(debug_assertions)]
            retired: RefCell::new(HashSet::new()),
        }
    }

    /// Reuses a pooled object or builds a fresh one. The returned generation
    /// must accompany the value back to [`Pool::release`].
    pub fn acquire(&self, make: impl FnOnce() -> T) -> (T, u64) {
        let value = self.free.borrow_mut().pop().unwrap_or_else(make);
        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);
        self.outstanding.set(self.outstanding.get() + 1);
        (value, generation)
    }

    /// Retires the generation and pools the object for reuse.
    pub fn release(&self, value: T, generation: u64) {
        self.outstanding.set(self.outstanding.get() - 1);
        #[cfg(debug_assertions)]
        self.retired.borrow_mut().insert(generation);
        self.free.borrow_mut().push(value);
    }

    /// Debug-build staleness check for a generation held past release.
    #[allow(dead_code)]
    pub fn assert_live(&self, generation: u64) {
        #[cfg(debug_assertions)]
        assert!(
            !self.retired.borrow().contains(&generation),
            "stale pool lease (generation {generation})"
        );
        #[cfg(not(debug_assertions))]
        let _ = generation;
    }

    /// Number of checkouts not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// Number of pooled (idle) objects.
    pub fn idle(&self) -> usize {
        self.free.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_is_bounded() {
        let pool: Pool<Vec<u8>> = Pool::new();
        // One-at-a-time checkout across many "frames" keeps the pool at one
        // object; no unbounded growth.
        for _ in 0..100 {
            let (value, generation) = pool.acquire(Vec::new);
            pool.release(value, generation);
        }
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn outstanding_counts_track_checkouts() {
        let pool: Pool<u32> = Pool::new();
        let (a, ga) = pool.acquire(|| 1);
        let (b, gb) = pool.acquire(|| 2);
        assert_eq!(pool.outstanding(), 2);
        pool.release(a, ga);
        assert_eq!(pool.outstanding(), 1);
        pool.release(b, gb);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale pool lease")]
    fn stale_generation_detected() {
        let pool: Pool<u32> = Pool::new();
        let (value, generation) = pool.acquire(|| 7);
        pool.release(value, generation);
        pool.assert_live(generation);
    }
}

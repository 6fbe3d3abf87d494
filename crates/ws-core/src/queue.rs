//! Queue Module - bounded MWMR event queue (C7)
//!
//! A bounded ring buffer of `(data, aux)` pairs used to hand records off
//! across a thread boundary. Sized for occasional bursts between
//! operators, not as a durability layer: there is no persistence, no
//! replay, and no unbounded growth.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

/// Point-in-time queue occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub pushed: u64,
    pub popped: u64,
    pub push_failures: u64,
}

struct Inner<D, A> {
    items: VecDeque<(D, A)>,
    pushed: u64,
    popped: u64,
    push_failures: u64,
    closed: bool,
}

/// A bounded, blocking multi-writer multi-reader queue.
pub struct MwmrQueue<D, A> {
    capacity: usize,
    push_attempts: u32,
    state: Mutex<Inner<D, A>>,
    space_available: Condvar,
    has_data: Condvar,
}

impl<D, A> MwmrQueue<D, A> {
    /// Construct a queue with the given slot capacity and the maximum
    /// number of attempts `push_blocking` makes before surfacing
    /// back-pressure to the caller.
    pub fn new(capacity: usize, push_attempts: u32) -> Self {
        Self {
            capacity,
            push_attempts,
            state: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                pushed: 0,
                popped: 0,
                push_failures: 0,
                closed: false,
            }),
            space_available: Condvar::new(),
            has_data: Condvar::new(),
        }
    }

    /// Non-blocking push. Returns `false` if the queue is full or closed.
    pub fn push(&self, data: D, aux: A) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.items.len() >= self.capacity {
            if !state.closed {
                state.push_failures += 1;
            }
            return false;
        }
        state.items.push_back((data, aux));
        state.pushed += 1;
        drop(state);
        self.has_data.notify_one();
        true
    }

    /// Blocking push: waits on a space-available condition, bounded by the
    /// configured attempt limit, after which it gives up so the caller can
    /// apply back-pressure instead of hanging forever.
    pub fn push_blocking(&self, data: D, aux: A) -> bool {
        let mut state = self.state.lock();
        let mut attempts = 0u32;
        while !state.closed && state.items.len() >= self.capacity {
            if attempts >= self.push_attempts {
                state.push_failures += 1;
                log::warn!(
                    "mwmr queue push exhausted after {} attempts (capacity {})",
                    attempts,
                    self.capacity
                );
                return false;
            }
            let result = self
                .space_available
                .wait_for(&mut state, Duration::from_millis(1));
            if result.timed_out() {
                attempts += 1;
            }
        }
        if state.closed {
            return false;
        }
        state.items.push_back((data, aux));
        state.pushed += 1;
        drop(state);
        self.has_data.notify_one();
        true
    }

    /// Non-blocking pop. Returns `None` if the queue is empty.
    pub fn pop(&self) -> Option<(D, A)> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        if item.is_some() {
            state.popped += 1;
            drop(state);
            self.space_available.notify_one();
        }
        item
    }

    /// Blocking pop: waits on a has-data condition until a slot is
    /// available or the queue is closed and drained.
    pub fn pop_blocking(&self) -> Option<(D, A)> {
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.closed {
            self.has_data.wait(&mut state);
        }
        let item = state.items.pop_front();
        if item.is_some() {
            state.popped += 1;
            drop(state);
            self.space_available.notify_one();
        }
        item
    }

    /// Close the queue: subsequent pushes fail, blocking waiters still
    /// drain whatever was already enqueued.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.has_data.notify_all();
        self.space_available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            len: state.items.len(),
            capacity: self.capacity,
            pushed: state.pushed,
            popped: state.popped,
            push_failures: state.push_failures,
        }
    }
}

//! Hashed, single-layer time wheel used for per-key expiration.
//!
//! The wheel has `N` slots and a tick interval `Δ`. Scheduling a job computes
//! how many ticks ahead it should fire and which slot that lands in; jobs
//! that need to wait longer than one full revolution carry a rounds counter
//! that is decremented each time the cursor passes their slot, rather than
//! being placed on a priority queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::ConfigError;
use crate::threadpool::ThreadPool;

/// Number of worker threads dispatching fired callbacks. Callbacks are meant
/// to be short (map removal + policy eviction), so a small fixed pool is
/// enough to keep the ticker from ever blocking on dispatch.
const CALLBACK_WORKERS: usize = 4;

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    rounds: u64,
    callback: Callback,
}

struct WheelState {
    cursor: usize,
    buckets: Vec<HashMap<String, Job>>,
    /// key -> slot index, for O(1) cancellation without scanning buckets.
    index: HashMap<String, usize>,
}

/// A hashed time wheel scheduling per-key expiration callbacks.
pub struct TimeWheel {
    tick: Duration,
    slot_count: usize,
    state: Mutex<WheelState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    dispatch: ThreadPool,
}

impl TimeWheel {
    /// Creates a new wheel with `slot_count` slots, each covering `tick`
    /// duration. Delays are not bounded to `slot_count * tick`: longer delays
    /// are represented with a rounds counter rather than rejected.
    pub fn new(tick: Duration, slot_count: usize) -> Result<Self, ConfigError> {
        if tick.is_zero() {
            return Err(ConfigError::InvalidArgument("tick interval must be positive"));
        }
        if slot_count == 0 {
            return Err(ConfigError::InvalidArgument("slot count must be positive"));
        }

        let mut buckets = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            buckets.push(HashMap::new());
        }

        let dispatch = ThreadPool::new(CALLBACK_WORKERS)
            .expect("failed to create time wheel callback dispatch pool");

        Ok(Self {
            tick,
            slot_count,
            state: Mutex::new(WheelState {
                cursor: 0,
                buckets,
                index: HashMap::new(),
            }),
            ticker: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            dispatch,
        })
    }

    /// Launches the background ticker thread. Calling this more than once is
    /// a no-op; the façade calls it exactly once at construction.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            return;
        }
        let wheel = Arc::clone(self);
        *ticker = Some(
            thread::Builder::new()
                .name("htcache-time-wheel".to_string())
                .spawn(move || wheel.run_ticker())
                .expect("failed to spawn time wheel ticker thread"),
        );
    }

    fn run_ticker(&self) {
        while !self.stop.load(Ordering::SeqCst) {
            thread::sleep(self.tick);
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            self.advance_and_fire();
        }
    }

    fn advance_and_fire(&self) {
        let fired = {
            let mut state = self.state.lock().unwrap();
            state.cursor = (state.cursor + 1) % self.slot_count;
            let cursor = state.cursor;

            let expired_keys: Vec<String> = state.buckets[cursor]
                .iter_mut()
                .filter_map(|(key, job)| {
                    if job.rounds == 0 {
                        Some(key.clone())
                    } else {
                        job.rounds -= 1;
                        None
                    }
                })
                .collect();

            let mut fired = Vec::with_capacity(expired_keys.len());
            for key in expired_keys {
                if let Some(job) = state.buckets[cursor].remove(&key) {
                    state.index.remove(&key);
                    fired.push(job.callback);
                }
            }
            fired
        };

        for callback in fired {
            self.dispatch.execute(callback);
        }
    }

    fn ticks_for(&self, delay: Duration) -> u64 {
        if delay.is_zero() {
            return 1;
        }
        let tick_nanos = self.tick.as_nanos().max(1);
        let delay_nanos = delay.as_nanos();
        ((delay_nanos + tick_nanos - 1) / tick_nanos).max(1) as u64
    }

    /// Schedules `callback` to run after `delay`. Replaces any existing job
    /// for `key`. The callback runs on a dispatch worker, never while any
    /// wheel-internal lock is held.
    pub fn add_job<F>(&self, key: &str, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let ticks = self.ticks_for(delay);
        let rounds = (ticks - 1) / self.slot_count as u64;

        let mut state = self.state.lock().unwrap();
        if let Some(old_slot) = state.index.remove(key) {
            state.buckets[old_slot].remove(key);
        }
        let slot = (state.cursor + ticks as usize) % self.slot_count;
        state.buckets[slot].insert(
            key.to_string(),
            Job {
                rounds,
                callback: Box::new(callback),
            },
        );
        state.index.insert(key.to_string(), slot);
    }

    /// Cancels the job scheduled for `key`, if any. No-op if absent.
    pub fn remove_job(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(slot) = state.index.remove(key) {
            state.buckets[slot].remove(key);
        }
    }

    /// Stops the ticker and drops every pending job without firing it.
    /// Callbacks already dispatched to a worker before `stop` was called may
    /// still run to completion.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            let _ = handle.join();
        }
        let mut state = self.state.lock().unwrap();
        for bucket in &mut state.buckets {
            bucket.clear();
        }
        state.index.clear();
    }
}

impl Drop for TimeWheel {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

//! Clocks that drive periodic subscriptions.
//!
//! A [`Clock`] accepts a period and a callback; the callback is invoked at
//! that period with the elapsed time since its previous invocation. Two
//! implementations are provided: [`ManualClock`] for deterministic simulation
//! and tests, and [`RealTimeClock`] which sleeps on the calling thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use td_core::{Time, s};
use td_signal::Signal;

use crate::sampled::{SampleClock, SampleConfig};

/// Per-tick callback. Receives the elapsed time since the previous call.
pub type TickCallback = Box<dyn FnMut(Time)>;

/// A scheduling primitive that invokes callbacks at a fixed period.
pub trait Clock {
    /// Register `callback` to run every `config.period`.
    ///
    /// The callback runs until the returned [`Subscription`] is dropped or
    /// cancelled.
    fn subscribe(&self, config: SampleConfig, callback: TickCallback) -> Subscription;
}

/// Handle to a clock subscription. Cancels on drop.
#[derive(Debug)]
pub struct Subscription {
    cancelled: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Entry {
    key: u64,
    sample: SampleClock,
    last_fire: Duration,
    callback: Rc<RefCell<TickCallback>>,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Default)]
struct ScheduleState {
    next_key: u64,
    entries: Vec<Entry>,
}

/// Subscription table shared by both clock kinds.
///
/// No borrow is held while a callback runs, so callbacks may subscribe,
/// cancel, or read the clock.
#[derive(Clone, Default)]
struct Schedule {
    state: Rc<RefCell<ScheduleState>>,
}

impl Schedule {
    fn insert(&self, config: SampleConfig, now: Duration, callback: TickCallback) -> Subscription {
        let cancelled = Rc::new(Cell::new(false));
        let mut state = self.state.borrow_mut();
        let key = state.next_key;
        state.next_key += 1;
        state.entries.push(Entry {
            key,
            sample: SampleClock::new(config, now),
            last_fire: now,
            callback: Rc::new(RefCell::new(callback)),
            cancelled: Rc::clone(&cancelled),
        });
        Subscription { cancelled }
    }

    /// Earliest live entry due at or before `limit`. Ties go to the older
    /// subscription.
    fn next_due(&self, limit: Duration) -> Option<(u64, Duration)> {
        let mut state = self.state.borrow_mut();
        state.entries.retain(|e| !e.cancelled.get());
        state
            .entries
            .iter()
            .filter(|e| e.sample.should_sample(limit))
            .map(|e| (e.key, e.sample.next_sample_time))
            .min_by_key(|&(_, at)| at)
    }

    fn earliest(&self) -> Option<Duration> {
        let state = self.state.borrow();
        state
            .entries
            .iter()
            .filter(|e| !e.cancelled.get())
            .map(|e| e.sample.next_sample_time)
            .min()
    }

    fn fire(&self, key: u64, at: Duration) {
        let due = {
            let mut state = self.state.borrow_mut();
            state.entries.iter_mut().find(|e| e.key == key).map(|entry| {
                let dt = at.saturating_sub(entry.last_fire);
                entry.last_fire = at;
                entry.sample.advance();
                (Rc::clone(&entry.callback), Rc::clone(&entry.cancelled), dt)
            })
        };
        let Some((callback, cancelled, dt)) = due else {
            return;
        };
        if cancelled.get() {
            return;
        }
        if let Ok(mut callback) = callback.try_borrow_mut() {
            (callback.as_mut())(s(dt.as_secs_f64()));
        }
    }

    fn len(&self) -> usize {
        self.state
            .borrow()
            .entries
            .iter()
            .filter(|e| !e.cancelled.get())
            .count()
    }
}

/// Deterministic simulated clock.
///
/// Time only moves when [`advance`](Self::advance) is called; every
/// subscription due within the advanced span fires once per elapsed period,
/// in time order.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    schedule: Schedule,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time since the clock was created.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Simulated time as a variable signal.
    pub fn now_signal(&self) -> Signal<Time> {
        let now = Rc::clone(&self.now);
        Signal::variable(move || s(now.get().as_secs_f64()))
    }

    /// Move time forward by `by`, firing every subscription that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        while let Some((key, at)) = self.schedule.next_due(target) {
            self.now.set(at);
            self.schedule.fire(key, at);
        }
        self.now.set(target);
    }

    /// Number of live subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.schedule.len()
    }
}

impl Clock for ManualClock {
    fn subscribe(&self, config: SampleConfig, callback: TickCallback) -> Subscription {
        self.schedule.insert(config, self.now.get(), callback)
    }
}

/// Wall-clock driven scheduler running on the calling thread.
///
/// Late ticks fire back to back; the schedule is never re-phased to absorb drift.
#[derive(Clone)]
pub struct RealTimeClock {
    origin: Instant,
    schedule: Schedule,
}

impl Default for RealTimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealTimeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            schedule: Schedule::default(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Run subscriptions for `duration`, sleeping until each falls due.
    pub fn run_for(&self, duration: Duration) {
        let end = self.elapsed() + duration;
        loop {
            let Some(next) = self.schedule.earliest().filter(|&at| at <= end) else {
                break;
            };
            let now = self.elapsed();
            if next > now {
                thread::sleep(next - now);
            }
            let now = self.elapsed();
            while let Some((key, _)) = self.schedule.next_due(now.min(end)) {
                self.schedule.fire(key, now);
            }
        }
        let now = self.elapsed();
        if end > now {
            thread::sleep(end - now);
        }
    }
}

impl Clock for RealTimeClock {
    fn subscribe(&self, config: SampleConfig, callback: TickCallback) -> Subscription {
        self.schedule.insert(config, self.elapsed(), callback)
    }
}

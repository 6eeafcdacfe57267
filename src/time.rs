//! Logical time shared by windows, tasks and programs.
//!
//! A [`Clock`] is either tuple-driven (it follows the timestamps of arriving
//! elements) or tick-driven (a [`Ticker`] thread moves it forward by a fixed
//! quantum every real-time interval). Listeners are notified after every
//! strict advance, one advance at a time, so every listener observes the same
//! non-decreasing sequence of instants.

use crate::error::{ConfigError, Result, RspError};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A logical timestamp. Milliseconds by convention, but the engine only relies
/// on the ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeInstant(i64);

impl TimeInstant {
    pub const MIN: TimeInstant = TimeInstant(i64::MIN);
    pub const MAX: TimeInstant = TimeInstant(i64::MAX);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn saturating_add(self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    pub fn saturating_sub(self, delta: i64) -> Self {
        Self(self.0.saturating_sub(delta))
    }
}

impl From<i64> for TimeInstant {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<TimeInstant> for i64 {
    fn from(value: TimeInstant) -> Self {
        value.0
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the clock moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// Advances to the timestamp of each arriving element, never backward.
    TupleDriven,
    /// Advances by `quantum` every `interval` of wall-clock time.
    TickDriven { quantum: i64, interval: Duration },
}

/// Handle returned by [`Clock::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(TimeInstant) + Send + Sync>;

struct ClockInner {
    mode: ClockMode,
    now: Mutex<TimeInstant>,
    // Held for the whole advance-and-notify step.
    step: Mutex<()>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

/// Shared logical clock. Cloning yields another handle to the same clock.
#[derive(Clone)]
pub struct Clock {
    inner: Arc<ClockInner>,
}

impl Clock {
    pub fn new(start: impl Into<TimeInstant>, mode: ClockMode) -> Result<Self> {
        if let ClockMode::TickDriven { quantum, interval } = mode {
            if quantum <= 0 || interval.is_zero() {
                return Err(ConfigError::InvalidTickInterval.into());
            }
        }
        Ok(Self {
            inner: Arc::new(ClockInner {
                mode,
                now: Mutex::new(start.into()),
                step: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        })
    }

    pub fn tuple_driven(start: impl Into<TimeInstant>) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                mode: ClockMode::TupleDriven,
                now: Mutex::new(start.into()),
                step: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    pub fn tick_driven(
        start: impl Into<TimeInstant>,
        quantum: i64,
        interval: Duration,
    ) -> Result<Self> {
        Self::new(start, ClockMode::TickDriven { quantum, interval })
    }

    pub fn mode(&self) -> ClockMode {
        self.inner.mode
    }

    pub fn is_tuple_driven(&self) -> bool {
        self.inner.mode == ClockMode::TupleDriven
    }

    pub fn now(&self) -> TimeInstant {
        *self
            .inner
            .now
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the clock to `to`.
    ///
    /// Returns `Ok(true)` when time actually moved (listeners were notified),
    /// `Ok(false)` when `to` equals the current time, and an
    /// [`RspError::OrderingViolation`] when `to` is in the past.
    pub fn advance(&self, to: impl Into<TimeInstant>) -> Result<bool> {
        let to = to.into();
        let _step = self
            .inner
            .step
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.now();
        if to < now {
            return Err(RspError::OrderingViolation { now, requested: to });
        }
        if to == now {
            return Ok(false);
        }
        self.set_and_notify(to);
        Ok(true)
    }

    /// Tuple-driven progress: moves forward to `t` if `t` is ahead of the
    /// clock, otherwise leaves it alone. Never fails.
    ///
    /// A `t` that is not ahead returns before taking the step lock, so a
    /// listener may observe any instant up to the one being notified.
    pub fn observe(&self, t: impl Into<TimeInstant>) -> bool {
        let t = t.into();
        if t <= self.now() {
            return false;
        }
        let _step = self
            .inner
            .step
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if t <= self.now() {
            return false;
        }
        self.set_and_notify(t);
        true
    }

    /// Advances a tick-driven clock by one quantum and returns the new time.
    pub fn tick(&self) -> Result<TimeInstant> {
        let ClockMode::TickDriven { quantum, .. } = self.inner.mode else {
            return Err(ConfigError::NotTickDriven.into());
        };
        let _step = self
            .inner
            .step
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = self.now().saturating_add(quantum);
        self.set_and_notify(next);
        Ok(next)
    }

    fn set_and_notify(&self, to: TimeInstant) {
        *self
            .inner
            .now
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = to;
        // Listeners run without the listener lock so they may subscribe or
        // unsubscribe. They must not move the clock past `to` themselves.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        log::trace!("clock advanced to {} ({} listeners)", to, listeners.len());
        for listener in listeners {
            listener(to);
        }
    }

    /// Registers a callback invoked after every strict advance.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(TimeInstant) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// True when both handles point at the same clock.
    pub fn same_as(&self, other: &Clock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Starts a background thread ticking this clock. Only valid for
    /// tick-driven clocks.
    pub fn start_ticker(&self) -> Result<Ticker> {
        let ClockMode::TickDriven { interval, .. } = self.inner.mode else {
            return Err(ConfigError::NotTickDriven.into());
        };
        Ticker::spawn(self.clone(), interval)
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("mode", &self.inner.mode)
            .field("now", &self.now())
            .finish()
    }
}

/// Background thread advancing a tick-driven clock. Stopped on [`Ticker::stop`]
/// or on drop.
pub struct Ticker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    fn spawn(clock: Clock, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("rsp-ticker".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(err) = clock.tick() {
                                log::error!("ticker stopped: {}", err);
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("ticker thread exiting at {}", clock.now());
            })
            .map_err(|e| RspError::Spawn(e.to_string()))?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the ticker and waits for its thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

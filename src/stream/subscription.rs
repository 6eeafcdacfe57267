use crate::time::TimeInstant;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// What a stream does when a subscription's queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// The producer waits for the subscriber.
    #[default]
    Block,
    /// The oldest queued element is discarded.
    DropOldest,
}

/// The receiving end of [`super::DataStream::subscribe`].
///
/// Dropping it unsubscribes. Once the stream is stopped and the queue is
/// drained, receiving returns `None`.
pub struct Subscription<T> {
    rx: Receiver<(T, TimeInstant)>,
    dropped: Arc<AtomicU64>,
    _alive: Arc<()>,
}

impl<T> Subscription<T> {
    pub(super) fn new(
        rx: Receiver<(T, TimeInstant)>,
        dropped: Arc<AtomicU64>,
        alive: Arc<()>,
    ) -> Self {
        Self {
            rx,
            dropped,
            _alive: alive,
        }
    }

    /// Waits for the next element.
    pub fn recv(&self) -> Option<(T, TimeInstant)> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<(T, TimeInstant)> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<(T, TimeInstant)> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now, without waiting.
    pub fn try_iter(&self) -> impl Iterator<Item = (T, TimeInstant)> + '_ {
        self.rx.try_iter()
    }

    /// Blocks for each element until the stream stops.
    pub fn iter(&self) -> impl Iterator<Item = (T, TimeInstant)> + '_ {
        self.rx.iter()
    }

    /// Elements discarded by [`OverflowPolicy::DropOldest`].
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

//! Named, timestamped streams and the sources feeding them.

mod registry;
mod source;
mod subscription;

pub use registry::StreamRegistry;
pub use source::{GeneratorSource, StreamSource};
pub use subscription::{OverflowPolicy, Subscription};

use crate::error::{Result, RspError};
use crate::naming::validate_name;
use crate::time::TimeInstant;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Consumer<T> = Arc<dyn Fn(&str, &T, TimeInstant) + Send + Sync>;

#[derive(Clone)]
struct Subscriber<T> {
    id: u64,
    tx: Sender<(T, TimeInstant)>,
    /// Receiving end kept by the stream to evict the oldest item under
    /// [`OverflowPolicy::DropOldest`].
    evict: Option<Receiver<(T, TimeInstant)>>,
    dropped: Arc<AtomicU64>,
    alive: Weak<()>,
}

struct Inner<T> {
    name: String,
    consumers: Mutex<Vec<Consumer<T>>>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
    next_subscriber: AtomicU64,
    stopped: AtomicBool,
}

/// A named, append-only stream of `(element, timestamp)` pairs.
///
/// Handles are cheap to clone and all clones share the same consumers and
/// subscriptions. Elements reach consumers in the order they were put.
pub struct DataStream<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DataStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> DataStream<T> {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            inner: Arc::new(Inner {
                name,
                consumers: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn same_as(&self, other: &DataStream<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers a callback run synchronously on the putting thread for every
    /// element.
    pub fn add_consumer<F>(&self, consumer: F)
    where
        F: Fn(&str, &T, TimeInstant) + Send + Sync + 'static,
    {
        self.inner
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(consumer));
    }

    /// Opens a bounded queue receiving every element put from now on.
    ///
    /// With [`OverflowPolicy::Block`] a full queue blocks `put` until the
    /// subscriber catches up. With [`OverflowPolicy::DropOldest`] the oldest
    /// queued element is discarded and counted instead.
    pub fn subscribe(&self, capacity: usize, policy: OverflowPolicy) -> Subscription<T> {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let alive = Arc::new(());
        let subscriber = Subscriber {
            id: self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed),
            tx,
            evict: (policy == OverflowPolicy::DropOldest).then(|| rx.clone()),
            dropped: Arc::clone(&dropped),
            alive: Arc::downgrade(&alive),
        };
        if !self.is_stopped() {
            self.inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(subscriber);
        }
        Subscription::new(rx, dropped, alive)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Stops the stream: later `put`s fail and subscriptions disconnect once
    /// drained. Safe to call repeatedly.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("Stream {} stopped", self.inner.name);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T: Clone> DataStream<T> {
    /// Appends an element: consumers run first, then every subscription gets
    /// a copy according to its overflow policy.
    pub fn put(&self, element: T, timestamp: impl Into<TimeInstant>) -> Result<()> {
        let timestamp = timestamp.into();
        if self.is_stopped() {
            return Err(RspError::StreamStopped {
                stream: self.inner.name.clone(),
            });
        }

        let consumers: Vec<Consumer<T>> = self
            .inner
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for consumer in &consumers {
            consumer(&self.inner.name, &element, timestamp);
        }

        let subscribers: Vec<Subscriber<T>> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut gone = Vec::new();
        for subscriber in &subscribers {
            if subscriber.alive.strong_count() == 0 || !deliver(subscriber, &element, timestamp) {
                gone.push(subscriber.id);
            }
        }
        if !gone.is_empty() {
            self.inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|s| !gone.contains(&s.id));
        }
        Ok(())
    }
}

/// False when the subscription has gone away.
fn deliver<T: Clone>(subscriber: &Subscriber<T>, element: &T, timestamp: TimeInstant) -> bool {
    let Some(evict) = &subscriber.evict else {
        return subscriber.tx.send((element.clone(), timestamp)).is_ok();
    };
    let mut item = (element.clone(), timestamp);
    loop {
        match subscriber.tx.try_send(item) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(back)) => {
                item = back;
                if evict.try_recv().is_ok() {
                    subscriber.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

impl<T> fmt::Debug for DataStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStream")
            .field("name", &self.inner.name)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

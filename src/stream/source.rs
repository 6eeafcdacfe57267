use super::DataStream;
use crate::error::{Result, RspError};
use crate::time::TimeInstant;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A producer feeding one stream from its own thread.
pub trait StreamSource: Send {
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<()>;

    /// Stops producing. Once this returns nothing more is put. Safe to call
    /// repeatedly.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

type Generator<T> = Box<dyn FnMut(TimeInstant) -> Vec<T> + Send>;

/// Emits whatever `generator` returns for the current logical time, then moves
/// that time forward by `step` and sleeps for `interval`.
pub struct GeneratorSource<T> {
    stream: DataStream<T>,
    start_at: TimeInstant,
    step: i64,
    interval: Duration,
    generator: Option<Generator<T>>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + 'static> GeneratorSource<T> {
    pub fn new<F>(stream: DataStream<T>, step: i64, interval: Duration, generator: F) -> Self
    where
        F: FnMut(TimeInstant) -> Vec<T> + Send + 'static,
    {
        Self {
            stream,
            start_at: TimeInstant::new(0),
            step,
            interval,
            generator: Some(Box::new(generator)),
            stop_tx: None,
            handle: None,
        }
    }

    pub fn starting_at(mut self, t: impl Into<TimeInstant>) -> Self {
        self.start_at = t.into();
        self
    }

    pub fn stream(&self) -> &DataStream<T> {
        &self.stream
    }
}

impl<T: Clone + Send + 'static> StreamSource for GeneratorSource<T> {
    fn name(&self) -> &str {
        self.stream.name()
    }

    fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let Some(mut generator) = self.generator.take() else {
            log::warn!("Source {} cannot be restarted", self.stream.name());
            return Ok(());
        };

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let stream = self.stream.clone();
        let (step, interval) = (self.step, self.interval);
        let mut now = self.start_at;
        let handle = thread::Builder::new()
            .name(format!("rsp-source-{}", self.stream.name()))
            .spawn(move || {
                'produce: loop {
                    for element in generator(now) {
                        if let Err(err) = stream.put(element, now) {
                            log::debug!("Source for {} ending: {}", stream.name(), err);
                            break 'produce;
                        }
                    }
                    now = now.saturating_add(step);
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("Source for {} exiting at {}", stream.name(), now);
            })
            .map_err(|e| RspError::Spawn(e.to_string()))?;

        log::debug!("Source {} started", self.stream.name());
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Source thread for {} panicked", self.stream.name());
            }
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for GeneratorSource<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

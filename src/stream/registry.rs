use super::DataStream;
use crate::error::{ConfigError, Result, RspError};
use std::collections::HashMap;

/// Streams known to a program, by name.
pub struct StreamRegistry<T> {
    streams: HashMap<String, DataStream<T>>,
}

impl<T> Default for StreamRegistry<T> {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
        }
    }
}

impl<T> StreamRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `stream`. Returns `Ok(false)` when this very stream is already
    /// registered, and an error when another stream owns the name.
    pub fn register(&mut self, stream: &DataStream<T>) -> Result<bool> {
        match self.streams.get(stream.name()) {
            Some(existing) if existing.same_as(stream) => Ok(false),
            Some(_) => Err(ConfigError::DuplicateName(stream.name().to_string()).into()),
            None => {
                self.streams
                    .insert(stream.name().to_string(), stream.clone());
                Ok(true)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataStream<T>> {
        self.streams.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&DataStream<T>> {
        self.streams.get(name).ok_or_else(|| RspError::UnknownStream {
            stream: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.streams.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn stop_all(&self) {
        for stream in self.streams.values() {
            stream.stop();
        }
    }
}

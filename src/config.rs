//! Declarative configuration for windows and programs, loaded from JSON.
//!
//! Everything built here goes through the same constructors as the builder
//! API, so a configuration is validated exactly like hand-written code.

use crate::content::ContentFactory;
use crate::error::Result;
use crate::report::{Report, ReportGrain};
use crate::stream::OverflowPolicy;
use crate::time::{Clock, ClockMode, TimeInstant};
use crate::windowing::{CSPARQLWindow, Tick};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

fn default_report() -> Report {
    Report::on_window_close()
}

/// One window definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub name: String,
    pub stream: String,
    pub width: i64,
    /// Defaults to `width` (a tumbling window).
    #[serde(default)]
    pub slide: Option<i64>,
    #[serde(default = "default_report")]
    pub report: Report,
    #[serde(default)]
    pub grain: ReportGrain,
    #[serde(default)]
    pub tick: Tick,
    #[serde(default)]
    pub origin: i64,
}

impl WindowConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn slide(&self) -> i64 {
        self.slide.unwrap_or(self.width)
    }

    pub fn build<I, W, R>(
        &self,
        factory: Arc<dyn ContentFactory<I, W, R>>,
    ) -> Result<CSPARQLWindow<I, W, R>>
    where
        I: Clone + 'static,
        W: 'static,
        R: Clone + Send + 'static,
    {
        Ok(CSPARQLWindow::new(
            self.name.clone(),
            self.width,
            self.slide(),
            factory,
            self.report.clone(),
        )?
        .with_grain(self.grain)
        .with_tick(self.tick)
        .with_origin(self.origin))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClockConfig {
    TupleDriven {
        #[serde(default)]
        start: i64,
    },
    TickDriven {
        #[serde(default)]
        start: i64,
        quantum: i64,
        interval_ms: u64,
    },
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig::TupleDriven { start: 0 }
    }
}

impl ClockConfig {
    pub fn build(&self) -> Result<Clock> {
        match *self {
            ClockConfig::TupleDriven { start } => Ok(Clock::tuple_driven(start)),
            ClockConfig::TickDriven {
                start,
                quantum,
                interval_ms,
            } => Clock::new(
                TimeInstant::new(start),
                ClockMode::TickDriven {
                    quantum,
                    interval: Duration::from_millis(interval_ms),
                },
            ),
        }
    }
}

fn default_capacity() -> usize {
    1024
}

/// Bounded output queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub policy: OverflowPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            policy: OverflowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub windows: Vec<WindowConfig>,
}

impl ProgramConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn window(&self, name: &str) -> Option<&WindowConfig> {
        self.windows.iter().find(|w| w.name == name)
    }
}

//! Stream-to-relation operators.

mod csparql_window;

pub use csparql_window::CSPARQLWindow;

use crate::report::ReportStrategy;
use crate::time::TimeInstant;
use crate::window_instance::WindowInstance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tick mechanism for window progression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tick {
    /// Mid-lifetime triggers are evaluated at most once per timestamp.
    #[default]
    TimeDriven,
    /// Mid-lifetime triggers are evaluated for every element.
    TupleDriven,
}

/// A relation published by a window, tagged with the window's name.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport<R> {
    pub window: Arc<str>,
    pub instance: WindowInstance,
    pub relation: R,
    /// The instance's close time for close reports, the current time otherwise.
    pub timestamp: TimeInstant,
    pub trigger: ReportStrategy,
}

/// Counters for window inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub active_instances: usize,
    pub elements_routed: u64,
    /// Elements that arrived after every instance they belonged to was evicted.
    pub late_drops: u64,
    /// Every report the window produced, one per reporting instance. A task
    /// feeds the operator graph one relation per window and timestamp, so
    /// when several instances report at the same timestamp only the
    /// latest-closing one is evaluated.
    pub reports_emitted: u64,
    pub instances_evicted: u64,
}

/// The windowing operator: assigns stream elements to window instances and
/// publishes their relations when the report policy says so.
pub trait StreamToRelationOperator<I, R>: Send {
    fn name(&self) -> &str;

    /// Routes one element and returns the reports it caused, in timestamp
    /// order. The element's timestamp moves the window's time forward.
    fn compute(&mut self, element: &I, timestamp: TimeInstant) -> Vec<WindowReport<R>>;

    /// Routes one element under a clock that does not follow element
    /// timestamps: the window first catches up with the clock's `now`, and
    /// only the clock closes instances.
    fn insert(&mut self, element: &I, timestamp: TimeInstant, now: TimeInstant) -> Vec<WindowReport<R>>;

    /// Reacts to the clock moving to `now` without a new element.
    fn advance(&mut self, now: TimeInstant) -> Vec<WindowReport<R>>;

    /// The current relation of the live instance containing `t` (the one
    /// closing first), or the empty relation.
    fn materialize(&self, t: TimeInstant) -> R;

    fn active_window_ranges(&self) -> Vec<(TimeInstant, TimeInstant)>;

    fn stats(&self) -> WindowStats;
}

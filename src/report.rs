use crate::error::{ConfigError, Result};
use crate::time::TimeInstant;
use crate::window_instance::WindowInstance;
use serde::{Deserialize, Serialize};

/// Report strategy for window content emission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportStrategy {
    /// Report once, when time passes the instance's close boundary.
    OnWindowClose,
    /// Report after every element while the instance holds something.
    NonEmptyContent,
    /// Report after every element that changed the instance's content.
    OnContentChange,
    /// Report whenever `period` has elapsed since the instance opened or last
    /// reported.
    Periodic { period: i64 },
}

/// How many of the instances firing in one step get reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportGrain {
    /// Only the firing instance with the latest close time.
    Single,
    /// Every firing instance, in close-time order.
    #[default]
    Multiple,
}

/// What a mid-lifetime trigger gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub instance: &'a WindowInstance,
    pub size: usize,
    /// The current step added to this instance's content.
    pub changed: bool,
    /// The step was caused by an element rather than by the clock.
    pub element_arrived: bool,
    pub now: TimeInstant,
    pub last_report: Option<TimeInstant>,
}

impl ReportStrategy {
    fn fires_mid_lifetime(&self, ctx: &ReportContext<'_>) -> bool {
        match *self {
            ReportStrategy::OnWindowClose => false,
            ReportStrategy::NonEmptyContent => ctx.element_arrived && ctx.size > 0,
            ReportStrategy::OnContentChange => ctx.changed,
            ReportStrategy::Periodic { period } => {
                let since = ctx.last_report.unwrap_or(ctx.instance.open);
                ctx.now.value().saturating_sub(since.value()) >= period
            }
        }
    }
}

/// The set of triggers attached to one window definition. Triggers fire
/// independently; the report fires when any of them does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    strategies: Vec<ReportStrategy>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_window_close() -> Self {
        Self::new().with(ReportStrategy::OnWindowClose)
    }

    pub fn with(mut self, strategy: ReportStrategy) -> Self {
        self.add(strategy);
        self
    }

    pub fn add(&mut self, strategy: ReportStrategy) {
        if !self.strategies.contains(&strategy) {
            self.strategies.push(strategy);
        }
    }

    pub fn strategies(&self) -> &[ReportStrategy] {
        &self.strategies
    }

    pub fn validate(&self) -> Result<()> {
        for strategy in &self.strategies {
            if let ReportStrategy::Periodic { period } = *strategy {
                if period <= 0 {
                    return Err(ConfigError::InvalidPeriod(period).into());
                }
            }
        }
        Ok(())
    }

    pub fn reports_on_close(&self) -> bool {
        self.strategies.contains(&ReportStrategy::OnWindowClose)
    }

    /// The first trigger firing for a live instance, if any.
    pub fn fire_mid_lifetime(&self, ctx: &ReportContext<'_>) -> Option<ReportStrategy> {
        self.strategies
            .iter()
            .copied()
            .find(|strategy| strategy.fires_mid_lifetime(ctx))
    }
}

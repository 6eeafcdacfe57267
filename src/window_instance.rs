use crate::time::TimeInstant;
use std::fmt;

// Representing the instance of a Window: the half-open interval [open, close).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowInstance {
    pub open: TimeInstant,
    pub close: TimeInstant,
}

impl WindowInstance {
    pub fn new(open: impl Into<TimeInstant>, close: impl Into<TimeInstant>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn contains(&self, t: TimeInstant) -> bool {
        self.open <= t && t < self.close
    }

    /// True once time has reached the close boundary.
    pub fn is_closed_at(&self, now: TimeInstant) -> bool {
        self.close <= now
    }

    pub fn width(&self) -> i64 {
        self.close.value().saturating_sub(self.open.value())
    }
}

impl fmt::Display for WindowInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.open, self.close)
    }
}

/// Lifecycle of a window instance.
///
/// `Opening` until it receives its first element, `Active` while it accepts
/// elements, `Closed` once time passes `close` (it may still report), then
/// `Evicted` when its content is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    Opening,
    Active,
    Closed,
    Evicted,
}

impl WindowState {
    pub fn accepts_elements(self) -> bool {
        matches!(self, WindowState::Opening | WindowState::Active)
    }
}

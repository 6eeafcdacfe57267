use crate::time::TimeInstant;
use thiserror::Error;

/// Problems detected while building windows, DAGs, tasks or programs.
///
/// These are fatal: they are raised at construction or initialization time and
/// never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window '{window}' has non-positive width {width}")]
    InvalidWidth { window: String, width: i64 },

    #[error("window '{window}' has non-positive slide {slide}")]
    InvalidSlide { window: String, slide: i64 },

    #[error("periodic report period must be positive, got {0}")]
    InvalidPeriod(i64),

    #[error("name '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("invalid name '{0}': names must be non-empty and contain no whitespace")]
    InvalidName(String),

    #[error("operator '{operator}' consumes unknown result '{operand}'")]
    UnresolvedOperand { operator: String, operand: String },

    #[error("operator '{operator}' declares {count} operands, expected 1 or 2")]
    InvalidArity { operator: String, count: usize },

    #[error("cycle detected among operators: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("task '{0}' has no relation-to-stream operator")]
    MissingSink(String),

    #[error("cannot pick the relation for the output operator, candidates: {}", .0.join(", "))]
    AmbiguousSink(Vec<String>),

    #[error("window '{window}' reads stream '{stream}' which was not passed to the program")]
    UnboundStream { window: String, stream: String },

    #[error("task '{0}' uses a different clock than the program")]
    ClockMismatch(String),

    #[error("tick-driven clocks need a positive quantum and a non-zero interval")]
    InvalidTickInterval,

    #[error("clock is tuple-driven and cannot be ticked")]
    NotTickDriven,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration document: {0}")]
    Json(String),
}

/// An R2R operator (or the evaluator behind it) failed for one report cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operator '{operator}' failed: {message}")]
pub struct EvaluationError {
    pub operator: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(operator: impl Into<String>, message: impl ToString) -> Self {
        Self {
            operator: operator.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RspError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("clock cannot move backward from {now} to {requested}")]
    OrderingViolation {
        now: TimeInstant,
        requested: TimeInstant,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("task '{task}' must be initialized first")]
    NotInitialized { task: String },

    #[error("task '{task}' is already initialized")]
    AlreadyInitialized { task: String },

    #[error("task '{task}' is stopped")]
    TaskStopped { task: String },

    #[error("stream '{stream}' is stopped")]
    StreamStopped { stream: String },

    #[error("stream '{stream}' not found")]
    UnknownStream { stream: String },

    #[error("lock poisoned: {0}")]
    Poisoned(String),

    #[error("failed to spawn thread: {0}")]
    Spawn(String),
}

impl From<serde_json::Error> for RspError {
    fn from(err: serde_json::Error) -> Self {
        RspError::Configuration(ConfigError::Json(err.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, RspError>;

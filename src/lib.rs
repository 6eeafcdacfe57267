//! Continuous queries over timestamped streams.
//!
//! Elements enter through [`DataStream`]s, are collected by windows
//! ([`CSPARQLWindow`]) into relations, combined by an operator DAG inside a
//! [`Task`], and turned back into streams by an R2S operator. A
//! [`ContinuousProgram`] owns the clock and wires tasks to their streams.
//! The [`rdf`] module builds the same pipeline from an RSP-QL query.

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod naming;
pub mod rdf;
pub mod report;
pub mod stream;
pub mod time;
pub mod window_instance;
pub mod windowing;

pub use config::{ClockConfig, OutputConfig, ProgramConfig, WindowConfig};
pub use engine::{
    BinaryOperator, ContinuousProgram, DStream, Emitted, IStream, QueryOperator, RStream,
    RelationToRelationOperator, RelationToStreamOperator, Task, TaskState, UnaryOperator,
};
pub use error::{ConfigError, EvaluationError, Result, RspError};
pub use rdf::{BindingWithTimestamp, QuadContainer, RDFStream, RSPEngine, RSPQLParser};
pub use report::{Report, ReportGrain, ReportStrategy};
pub use stream::{DataStream, GeneratorSource, OverflowPolicy, StreamSource, Subscription};
pub use time::{Clock, ClockMode, TimeInstant};
pub use window_instance::{WindowInstance, WindowState};
pub use windowing::{CSPARQLWindow, StreamToRelationOperator, Tick, WindowReport, WindowStats};

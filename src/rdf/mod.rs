//! RDF stream processing on top of the generic engine: quad containers as
//! window content, SPARQL evaluation through oxigraph, and an RSP-QL front
//! end.

mod engine;
mod quad_container;
mod rspql;
mod sparql;

pub use engine::{BindingWithTimestamp, RDFStream, RSPEngine, ResultReceiver};
pub use quad_container::{Binding, QuadContainer, union_algebra, window_content_factory};
pub use rspql::{ParsedQuery, RSPQLParser, StreamOperator, WindowDefinition};
pub use sparql::{OxigraphEvaluator, UnionOperator, format_binding};

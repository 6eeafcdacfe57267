//! Operator graphs and their execution: relation-to-relation operators
//! arranged in a DAG, relation-to-stream operators, tasks that drive them
//! from window reports, and programs that wire tasks to streams.

mod dag;
mod program;
mod r2r;
mod r2s;
mod task;

pub use dag::Dag;
pub use program::ContinuousProgram;
pub use r2r::{BinaryOperator, QueryEvaluator, QueryOperator, RelationToRelationOperator, UnaryOperator};
pub use r2s::{DStream, IStream, RStream, RelationToStreamOperator};
pub use task::{Emitted, Task, TaskState};

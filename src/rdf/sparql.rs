use super::quad_container::{Binding, QuadContainer};
use crate::engine::{QueryEvaluator, RelationToRelationOperator};
use crate::error::EvaluationError;
use oxigraph::model::{GraphName, Literal, Quad, Term};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use std::collections::HashSet;
use std::error::Error;
use std::sync::{Arc, PoisonError, RwLock};

type BoxError = Box<dyn Error + Send + Sync>;

/// Evaluates SPARQL over the quads of its operands combined with static
/// data, using an in-memory oxigraph store per evaluation.
///
/// Clones share the same static data.
#[derive(Clone, Default)]
pub struct OxigraphEvaluator {
    static_data: Arc<RwLock<HashSet<Quad>>>,
}

impl OxigraphEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static quad to the evaluator's static data store
    pub fn add_static_data(&self, quad: Quad) {
        self.static_data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(quad);
    }

    /// Get the number of static quads
    pub fn static_data_size(&self) -> usize {
        self.static_data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs `query` over the operands' quads plus the static data and returns
    /// oxigraph's raw results.
    pub fn execute(&self, query: &str, operands: &[&QuadContainer]) -> Result<QueryResults, BoxError> {
        let store = Store::new()?;
        for container in operands {
            for quad in &container.elements {
                store.insert(quad)?;
            }
        }
        for quad in self
            .static_data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            store.insert(quad)?;
        }
        log::trace!(
            "Executing query over {} quads",
            operands.iter().map(|c| c.len()).sum::<usize>()
        );
        Ok(SparqlEvaluator::new()
            .parse_query(query)?
            .on_store(&store)
            .execute()?)
    }
}

impl QueryEvaluator<QuadContainer> for OxigraphEvaluator {
    fn evaluate(&self, query: &str, operands: &[&QuadContainer]) -> Result<QuadContainer, BoxError> {
        let ts = operands
            .iter()
            .map(|c| c.last_timestamp_changed)
            .max()
            .unwrap_or_default();
        match self.execute(query, operands)? {
            QueryResults::Solutions(solutions) => {
                let mut bindings = Vec::new();
                for solution in solutions {
                    let solution = solution?;
                    let binding: Binding = solution
                        .iter()
                        .map(|(variable, term)| (variable.as_str().to_string(), term.clone()))
                        .collect();
                    bindings.push(binding);
                }
                Ok(QuadContainer::with_bindings(bindings, ts))
            }
            QueryResults::Graph(triples) => {
                let mut elements = HashSet::new();
                for triple in triples {
                    elements.insert(triple?.in_graph(GraphName::DefaultGraph));
                }
                Ok(QuadContainer::new(elements, ts))
            }
            QueryResults::Boolean(answer) => {
                let binding = Binding::from([("result".to_string(), Term::from(Literal::from(answer)))]);
                Ok(QuadContainer::with_bindings(vec![binding], ts))
            }
        }
    }
}

/// Binary union of two quad relations.
pub struct UnionOperator {
    result: String,
    operands: Vec<String>,
}

impl UnionOperator {
    pub fn new(result: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            operands: vec![left.into(), right.into()],
        }
    }
}

impl RelationToRelationOperator<QuadContainer> for UnionOperator {
    fn result_name(&self) -> &str {
        &self.result
    }

    fn operand_names(&self) -> &[String] {
        &self.operands
    }

    fn eval(&self, operands: &[&QuadContainer]) -> Result<QuadContainer, EvaluationError> {
        match operands {
            [left, right] => Ok((*left).clone().union((*right).clone())),
            _ => Err(EvaluationError::new(&self.result, "union needs two operands")),
        }
    }
}

/// Formats a binding as `?var = term` pairs, sorted by variable.
pub fn format_binding(binding: &Binding) -> String {
    binding
        .iter()
        .map(|(variable, term)| format!("?{} = {}", variable, term))
        .collect::<Vec<_>>()
        .join(", ")
}

use crate::error::EvaluationError;
use std::sync::Arc;

/// R2R (Relation-to-Relation) Operator
///
/// Consumes one or two named relations, in the order given by
/// [`operand_names`](Self::operand_names), and publishes a new relation under
/// [`result_name`](Self::result_name).
pub trait RelationToRelationOperator<R>: Send + Sync {
    fn result_name(&self) -> &str;

    fn operand_names(&self) -> &[String];

    fn eval(&self, operands: &[&R]) -> Result<R, EvaluationError>;
}

type UnaryFn<R> = dyn Fn(&R) -> Result<R, String> + Send + Sync;
type BinaryFn<R> = dyn Fn(&R, &R) -> Result<R, String> + Send + Sync;

/// An operator over a single relation, backed by a closure.
pub struct UnaryOperator<R> {
    result: String,
    operands: Vec<String>,
    f: Arc<UnaryFn<R>>,
}

impl<R: 'static> UnaryOperator<R> {
    pub fn new<F>(result: impl Into<String>, operand: impl Into<String>, f: F) -> Self
    where
        F: Fn(&R) -> R + Send + Sync + 'static,
    {
        Self::fallible(result, operand, move |r: &R| Ok(f(r)))
    }

    /// Like [`UnaryOperator::new`] for closures that can fail.
    pub fn fallible<F>(result: impl Into<String>, operand: impl Into<String>, f: F) -> Self
    where
        F: Fn(&R) -> Result<R, String> + Send + Sync + 'static,
    {
        Self {
            result: result.into(),
            operands: vec![operand.into()],
            f: Arc::new(f),
        }
    }
}

impl<R> RelationToRelationOperator<R> for UnaryOperator<R> {
    fn result_name(&self) -> &str {
        &self.result
    }

    fn operand_names(&self) -> &[String] {
        &self.operands
    }

    fn eval(&self, operands: &[&R]) -> Result<R, EvaluationError> {
        match operands {
            [input] => (self.f)(*input).map_err(|e| EvaluationError::new(&self.result, e)),
            _ => Err(EvaluationError::new(
                &self.result,
                format!("expected 1 operand, got {}", operands.len()),
            )),
        }
    }
}

/// An operator combining two relations, backed by a closure. The closure
/// receives the operands in declared order.
pub struct BinaryOperator<R> {
    result: String,
    operands: Vec<String>,
    f: Arc<BinaryFn<R>>,
}

impl<R: 'static> BinaryOperator<R> {
    pub fn new<F>(
        result: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&R, &R) -> R + Send + Sync + 'static,
    {
        Self::fallible(result, left, right, move |l: &R, r: &R| Ok(f(l, r)))
    }

    pub fn fallible<F>(
        result: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&R, &R) -> Result<R, String> + Send + Sync + 'static,
    {
        Self {
            result: result.into(),
            operands: vec![left.into(), right.into()],
            f: Arc::new(f),
        }
    }
}

impl<R> RelationToRelationOperator<R> for BinaryOperator<R> {
    fn result_name(&self) -> &str {
        &self.result
    }

    fn operand_names(&self) -> &[String] {
        &self.operands
    }

    fn eval(&self, operands: &[&R]) -> Result<R, EvaluationError> {
        match operands {
            [left, right] => {
                (self.f)(*left, *right).map_err(|e| EvaluationError::new(&self.result, e))
            }
            _ => Err(EvaluationError::new(
                &self.result,
                format!("expected 2 operands, got {}", operands.len()),
            )),
        }
    }
}

/// A declarative query engine: evaluates a query expression over the given
/// relations. Must be deterministic.
pub trait QueryEvaluator<R>: Send + Sync {
    fn evaluate(
        &self,
        query: &str,
        operands: &[&R],
    ) -> Result<R, Box<dyn std::error::Error + Send + Sync>>;
}

/// Runs a fixed query through a [`QueryEvaluator`].
pub struct QueryOperator<R, E> {
    result: String,
    operands: Vec<String>,
    query: String,
    evaluator: E,
    _marker: std::marker::PhantomData<fn(&R) -> R>,
}

impl<R, E: QueryEvaluator<R>> QueryOperator<R, E> {
    pub fn new(
        result: impl Into<String>,
        operands: Vec<String>,
        query: impl Into<String>,
        evaluator: E,
    ) -> Self {
        Self {
            result: result.into(),
            operands,
            query: query.into(),
            evaluator,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get a reference to the query string
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }
}

impl<R, E: QueryEvaluator<R>> RelationToRelationOperator<R> for QueryOperator<R, E> {
    fn result_name(&self) -> &str {
        &self.result
    }

    fn operand_names(&self) -> &[String] {
        &self.operands
    }

    fn eval(&self, operands: &[&R]) -> Result<R, EvaluationError> {
        log::debug!(
            "Operator {} evaluating query over {} operands",
            self.result,
            operands.len()
        );
        self.evaluator
            .evaluate(&self.query, operands)
            .map_err(|e| EvaluationError::new(&self.result, e))
    }
}

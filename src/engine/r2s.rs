use crate::time::TimeInstant;
use std::collections::HashSet;
use std::hash::Hash;

/// R2S (Relation-to-Stream) operator: the sink of a task's DAG.
pub trait RelationToStreamOperator<R, O>: Send {
    /// Turns the relation published at `timestamp` into output elements.
    fn eval(&mut self, relation: &R, timestamp: TimeInstant) -> Vec<O>;

    /// The DAG node this operator consumes. `None` lets the task pick the only
    /// node nobody else consumes.
    fn operand(&self) -> Option<&str> {
        None
    }
}

type Extractor<R, O> = Box<dyn Fn(&R) -> Vec<O> + Send>;

/// Emits every element of every relation it receives.
pub struct RStream<R, O> {
    extract: Extractor<R, O>,
    operand: Option<String>,
}

impl<R, O> RStream<R, O> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Vec<O> + Send + 'static,
    {
        Self {
            extract: Box::new(extract),
            operand: None,
        }
    }

    pub fn consuming(mut self, operand: impl Into<String>) -> Self {
        self.operand = Some(operand.into());
        self
    }
}

impl<R, O> RelationToStreamOperator<R, O> for RStream<R, O> {
    fn eval(&mut self, relation: &R, _timestamp: TimeInstant) -> Vec<O> {
        (self.extract)(relation)
    }

    fn operand(&self) -> Option<&str> {
        self.operand.as_deref()
    }
}

/// Emits the elements that were not in the previous relation.
pub struct IStream<R, O> {
    extract: Extractor<R, O>,
    operand: Option<String>,
    previous: HashSet<O>,
}

impl<R, O: Eq + Hash> IStream<R, O> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Vec<O> + Send + 'static,
    {
        Self {
            extract: Box::new(extract),
            operand: None,
            previous: HashSet::new(),
        }
    }

    pub fn consuming(mut self, operand: impl Into<String>) -> Self {
        self.operand = Some(operand.into());
        self
    }
}

impl<R, O> RelationToStreamOperator<R, O> for IStream<R, O>
where
    O: Clone + Eq + Hash + Send,
{
    fn eval(&mut self, relation: &R, _timestamp: TimeInstant) -> Vec<O> {
        let current: Vec<O> = (self.extract)(relation);
        let inserted: Vec<O> = {
            let mut seen = HashSet::with_capacity(current.len());
            current
                .iter()
                .filter(|element| !self.previous.contains(*element) && seen.insert(*element))
                .cloned()
                .collect()
        };
        self.previous = current.into_iter().collect();
        inserted
    }

    fn operand(&self) -> Option<&str> {
        self.operand.as_deref()
    }
}

/// Emits the elements of the previous relation that are gone from the
/// current one.
pub struct DStream<R, O> {
    extract: Extractor<R, O>,
    operand: Option<String>,
    previous: Vec<O>,
}

impl<R, O> DStream<R, O> {
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&R) -> Vec<O> + Send + 'static,
    {
        Self {
            extract: Box::new(extract),
            operand: None,
            previous: Vec::new(),
        }
    }

    pub fn consuming(mut self, operand: impl Into<String>) -> Self {
        self.operand = Some(operand.into());
        self
    }
}

impl<R, O> RelationToStreamOperator<R, O> for DStream<R, O>
where
    O: Clone + Eq + Hash + Send,
{
    fn eval(&mut self, relation: &R, _timestamp: TimeInstant) -> Vec<O> {
        let current: Vec<O> = (self.extract)(relation);
        let deleted: Vec<O> = {
            let present: HashSet<&O> = current.iter().collect();
            let mut seen = HashSet::new();
            self.previous
                .iter()
                .filter(|element| !present.contains(*element) && seen.insert(*element))
                .cloned()
                .collect()
        };
        self.previous = current;
        deleted
    }

    fn operand(&self) -> Option<&str> {
        self.operand.as_deref()
    }
}

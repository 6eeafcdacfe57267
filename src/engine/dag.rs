//! Operator graph of one task.
//!
//! Nodes live in an index-addressed arena: window outputs first, in the order
//! the task declared its windows, then the R2R operators. Edges are derived
//! from operand names and checked once, in [`Dag::build`].

use super::r2r::RelationToRelationOperator;
use crate::error::{ConfigError, EvaluationError, Result};
use crate::naming::validate_name;
use std::collections::{HashMap, VecDeque};

enum NodeKind<R> {
    /// Output of the task's window at this position.
    Window(usize),
    Operator(Box<dyn RelationToRelationOperator<R>>),
}

struct DagNode<R> {
    name: String,
    kind: NodeKind<R>,
    operands: Vec<usize>,
}

pub struct Dag<R> {
    nodes: Vec<DagNode<R>>,
    index: HashMap<String, usize>,
    /// Topological order restricted to the ancestors of the sink.
    plan: Vec<usize>,
    sink: usize,
}

impl<R> Dag<R> {
    /// Validates names, arities and operand references, rejects cycles, and
    /// picks the node feeding the R2S operator: `sink` when given, otherwise
    /// the only node nobody consumes.
    pub fn build(
        window_names: &[String],
        operators: Vec<Box<dyn RelationToRelationOperator<R>>>,
        sink: Option<&str>,
    ) -> Result<Self> {
        let mut nodes = Vec::with_capacity(window_names.len() + operators.len());
        let mut index = HashMap::new();

        for (slot, name) in window_names.iter().enumerate() {
            Self::declare(&mut index, name, nodes.len())?;
            nodes.push(DagNode {
                name: name.clone(),
                kind: NodeKind::Window(slot),
                operands: Vec::new(),
            });
        }

        for operator in operators {
            let name = operator.result_name().to_string();
            let count = operator.operand_names().len();
            if !(1..=2).contains(&count) {
                return Err(ConfigError::InvalidArity {
                    operator: name,
                    count,
                }
                .into());
            }
            Self::declare(&mut index, &name, nodes.len())?;
            nodes.push(DagNode {
                name,
                kind: NodeKind::Operator(operator),
                operands: Vec::new(),
            });
        }

        for i in 0..nodes.len() {
            let NodeKind::Operator(operator) = &nodes[i].kind else {
                continue;
            };
            let mut operands = Vec::with_capacity(2);
            for operand in operator.operand_names() {
                let Some(&target) = index.get(operand.as_str()) else {
                    return Err(ConfigError::UnresolvedOperand {
                        operator: nodes[i].name.clone(),
                        operand: operand.clone(),
                    }
                    .into());
                };
                operands.push(target);
            }
            nodes[i].operands = operands;
        }

        let order = Self::topological_order(&nodes)?;
        let sink = Self::resolve_sink(&nodes, &index, sink)?;
        let plan = Self::plan_for(&nodes, &order, sink);

        log::debug!(
            "DAG built with {} nodes, sink '{}', plan of {} steps",
            nodes.len(),
            nodes[sink].name,
            plan.len()
        );

        Ok(Self {
            nodes,
            index,
            plan,
            sink,
        })
    }

    fn declare(index: &mut HashMap<String, usize>, name: &str, at: usize) -> Result<()> {
        validate_name(name)?;
        if index.insert(name.to_string(), at).is_some() {
            return Err(ConfigError::DuplicateName(name.to_string()).into());
        }
        Ok(())
    }

    // Kahn's algorithm; whatever is left with a positive in-degree sits on a
    // cycle or behind one.
    fn topological_order(nodes: &[DagNode<R>]) -> Result<Vec<usize>> {
        let mut in_degree = vec![0usize; nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for &operand in &node.operands {
                in_degree[i] += 1;
                dependents[operand].push(i);
            }
        }

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, deg)| **deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < nodes.len() {
            let mut stuck: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, deg)| **deg > 0)
                .map(|(i, _)| nodes[i].name.clone())
                .collect();
            stuck.sort();
            return Err(ConfigError::Cycle(stuck).into());
        }
        Ok(order)
    }

    fn resolve_sink(
        nodes: &[DagNode<R>],
        index: &HashMap<String, usize>,
        declared: Option<&str>,
    ) -> Result<usize> {
        if let Some(name) = declared {
            return index.get(name).copied().ok_or_else(|| {
                ConfigError::UnresolvedOperand {
                    operator: "r2s".to_string(),
                    operand: name.to_string(),
                }
                .into()
            });
        }

        let mut consumed = vec![false; nodes.len()];
        for node in nodes {
            for &operand in &node.operands {
                consumed[operand] = true;
            }
        }
        let candidates: Vec<usize> = (0..nodes.len()).filter(|&i| !consumed[i]).collect();
        match candidates.as_slice() {
            [only] => Ok(*only),
            _ => Err(ConfigError::AmbiguousSink(
                candidates.iter().map(|&i| nodes[i].name.clone()).collect(),
            )
            .into()),
        }
    }

    fn plan_for(nodes: &[DagNode<R>], order: &[usize], sink: usize) -> Vec<usize> {
        let mut needed = vec![false; nodes.len()];
        let mut stack = vec![sink];
        while let Some(i) = stack.pop() {
            if !needed[i] {
                needed[i] = true;
                stack.extend(nodes[i].operands.iter().copied());
            }
        }
        order.iter().copied().filter(|&i| needed[i]).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn sink_name(&self) -> &str {
        &self.nodes[self.sink].name
    }

    /// Names in evaluation order.
    pub fn evaluation_order(&self) -> Vec<&str> {
        self.plan
            .iter()
            .map(|&i| self.nodes[i].name.as_str())
            .collect()
    }

    /// Runs one report cycle and returns the sink's relation.
    ///
    /// `window_relation(slot)` supplies the relation of the task's window at
    /// `slot`. Every planned operator is evaluated once, after its operands.
    /// A failing operator is passed to `on_error`; it and everything
    /// downstream of it publish nothing this cycle. Intermediate results are
    /// dropped when the cycle ends.
    pub fn evaluate<F, E>(&self, mut window_relation: F, mut on_error: E) -> Option<R>
    where
        F: FnMut(usize) -> R,
        E: FnMut(EvaluationError),
    {
        let mut results: Vec<Option<R>> = Vec::with_capacity(self.nodes.len());
        results.resize_with(self.nodes.len(), || None);

        for &i in &self.plan {
            let node = &self.nodes[i];
            let value = match &node.kind {
                NodeKind::Window(slot) => Some(window_relation(*slot)),
                NodeKind::Operator(operator) => {
                    let operands: Option<Vec<&R>> = node
                        .operands
                        .iter()
                        .map(|&operand| results[operand].as_ref())
                        .collect();
                    match operands {
                        None => {
                            log::debug!("Skipping '{}': an upstream operator failed", node.name);
                            None
                        }
                        Some(operands) => match operator.eval(&operands) {
                            Ok(relation) => Some(relation),
                            Err(err) => {
                                log::warn!("{}", err);
                                on_error(err);
                                None
                            }
                        },
                    }
                }
            };
            results[i] = value;
        }

        results[self.sink].take()
    }
}

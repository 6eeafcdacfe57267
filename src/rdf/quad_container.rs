use crate::content::{ContentAlgebra, ContentFactory, IncrementalContentFactory};
use oxigraph::model::{GraphName, NamedNode, Quad, Term};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// One solution mapping: variable name to bound term.
pub type Binding = BTreeMap<String, Term>;

// Representing a container for RDF Quads in the Window, and the relation
// flowing between RDF operators: quads plus the solutions of the last query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadContainer {
    pub elements: HashSet<Quad>,
    pub bindings: Vec<Binding>,
    pub last_timestamp_changed: i64,
}

impl QuadContainer {
    pub fn new(elements: HashSet<Quad>, ts: i64) -> Self {
        Self {
            elements,
            bindings: Vec::new(),
            last_timestamp_changed: ts,
        }
    }

    pub fn from_quads(quads: impl IntoIterator<Item = Quad>, ts: i64) -> Self {
        Self::new(quads.into_iter().collect(), ts)
    }

    pub fn with_bindings(bindings: Vec<Binding>, ts: i64) -> Self {
        Self {
            elements: HashSet::new(),
            bindings,
            last_timestamp_changed: ts,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.bindings.is_empty()
    }

    pub fn add(&mut self, quad: Quad, ts: i64) {
        self.elements.insert(quad);
        self.last_timestamp_changed = ts;
    }

    pub fn remove(&mut self, quad: &Quad, ts: i64) {
        self.elements.remove(quad);
        self.last_timestamp_changed = ts;
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.elements.contains(quad)
    }

    pub fn clear(&mut self, ts: i64) {
        self.elements.clear();
        self.bindings.clear();
        self.last_timestamp_changed = ts;
    }

    /// Set union of the quads, concatenation of the bindings.
    pub fn union(mut self, other: QuadContainer) -> QuadContainer {
        if self.elements.len() < other.elements.len() && self.bindings.is_empty() {
            let ts = self.last_timestamp_changed;
            let mut merged = other;
            merged.elements.extend(self.elements);
            merged.last_timestamp_changed = merged.last_timestamp_changed.max(ts);
            return merged;
        }
        self.elements.extend(other.elements);
        self.bindings.extend(other.bindings);
        self.last_timestamp_changed = self.last_timestamp_changed.max(other.last_timestamp_changed);
        self
    }

    /// The same quads moved into `graph`.
    pub fn in_graph(self, graph: &GraphName) -> QuadContainer {
        let elements = self
            .elements
            .into_iter()
            .map(|quad| Quad::new(quad.subject, quad.predicate, quad.object, graph.clone()))
            .collect();
        QuadContainer {
            elements,
            bindings: self.bindings,
            last_timestamp_changed: self.last_timestamp_changed,
        }
    }
}

/// Union algebra over containers. With `graph` set, stored quads are moved
/// into that named graph so queries can address the window with
/// `GRAPH <window> { ... }`.
pub fn union_algebra(
    graph: Option<GraphName>,
) -> ContentAlgebra<QuadContainer, QuadContainer, QuadContainer> {
    ContentAlgebra::new(
        move |container: QuadContainer| match &graph {
            Some(graph) => container.in_graph(graph),
            None => container,
        },
        |stored: &QuadContainer| stored.clone(),
        QuadContainer::union,
        QuadContainer::default(),
    )
}

/// Content factory for a window named by the IRI `window`. Names that are
/// not IRIs keep quads in their original graph.
pub fn window_content_factory(
    window: &str,
) -> Arc<dyn ContentFactory<QuadContainer, QuadContainer, QuadContainer>> {
    let graph = NamedNode::new(window).ok().map(GraphName::NamedNode);
    Arc::new(IncrementalContentFactory::new(union_algebra(graph)))
}

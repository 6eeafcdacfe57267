//! Window content: the accumulator that backs one window instance.
//!
//! A content receives input elements of type `I`, stores them as `W`, and
//! coalesces its state into a relation `R`. The conversions and the merge are
//! supplied by the caller through a [`ContentAlgebra`]; the engine only relies
//! on the algebraic contract: `sum` is associative and `empty` is its identity.

mod accumulator;
mod empty;
mod filter;
mod incremental;

pub use accumulator::{AccumulatorContent, AccumulatorContentFactory};
pub use empty::EmptyContent;
pub use filter::{FilterContent, FilterContentFactory};
pub use incremental::{IncrementalContent, IncrementalContentFactory};

use std::fmt;
use std::sync::Arc;

/// Mutable accumulator owned by exactly one window instance.
///
/// `add` is the only mutator. `coalesce` must be a pure function of what was
/// added, so repeated calls without an intervening `add` return equal values.
/// Exclusive access for `add` is enforced by `&mut self`; the window operator
/// owning the content is itself behind its task's lock, which serializes
/// `add` with `coalesce` calls made from timer threads.
pub trait Content<I, W, R>: Send {
    fn add(&mut self, element: I);

    fn size(&self) -> usize;

    fn coalesce(&self) -> R;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Creates contents for the instances of one window definition.
pub trait ContentFactory<I, W, R>: Send + Sync {
    /// A fresh, empty, mutable content.
    fn create(&self) -> Box<dyn Content<I, W, R>>;

    /// A read-only content whose `coalesce` is the empty relation.
    fn create_empty(&self) -> Box<dyn Content<I, W, R>>;
}

/// The caller-supplied conversions and merge used by the stock contents.
pub struct ContentAlgebra<I, W, R> {
    into_stored: Arc<dyn Fn(I) -> W + Send + Sync>,
    into_relation: Arc<dyn Fn(&W) -> R + Send + Sync>,
    sum: Arc<dyn Fn(R, R) -> R + Send + Sync>,
    empty: R,
}

impl<I, W, R: Clone> ContentAlgebra<I, W, R> {
    /// `into_stored` maps `I -> W`, `into_relation` maps `W -> R`, `sum` merges
    /// two relations and `empty` is the identity of `sum`.
    pub fn new<F1, F2, S>(into_stored: F1, into_relation: F2, sum: S, empty: R) -> Self
    where
        F1: Fn(I) -> W + Send + Sync + 'static,
        F2: Fn(&W) -> R + Send + Sync + 'static,
        S: Fn(R, R) -> R + Send + Sync + 'static,
    {
        Self {
            into_stored: Arc::new(into_stored),
            into_relation: Arc::new(into_relation),
            sum: Arc::new(sum),
            empty,
        }
    }

    pub fn store(&self, element: I) -> W {
        (self.into_stored)(element)
    }

    pub fn relation(&self, stored: &W) -> R {
        (self.into_relation)(stored)
    }

    pub fn sum(&self, left: R, right: R) -> R {
        (self.sum)(left, right)
    }

    pub fn empty(&self) -> R {
        self.empty.clone()
    }

    /// Folds stored items into one relation, starting from `empty`.
    pub fn fold<'a>(&self, items: impl IntoIterator<Item = &'a W>) -> R
    where
        W: 'a,
    {
        items
            .into_iter()
            .fold(self.empty(), |acc, item| self.sum(acc, self.relation(item)))
    }
}

impl<I, R> ContentAlgebra<I, I, R>
where
    I: 'static,
    R: Clone,
{
    /// An algebra that stores input elements unchanged.
    pub fn identity_storage<F2, S>(into_relation: F2, sum: S, empty: R) -> Self
    where
        F2: Fn(&I) -> R + Send + Sync + 'static,
        S: Fn(R, R) -> R + Send + Sync + 'static,
    {
        Self::new(|element| element, into_relation, sum, empty)
    }
}

impl<I, W, R: Clone> Clone for ContentAlgebra<I, W, R> {
    fn clone(&self) -> Self {
        Self {
            into_stored: Arc::clone(&self.into_stored),
            into_relation: Arc::clone(&self.into_relation),
            sum: Arc::clone(&self.sum),
            empty: self.empty.clone(),
        }
    }
}

impl<I, W, R: fmt::Debug> fmt::Debug for ContentAlgebra<I, W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentAlgebra")
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}

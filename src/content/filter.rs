use super::{Content, ContentAlgebra, ContentFactory, EmptyContent};
use std::sync::Arc;

type Predicate<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// Accumulates only the elements accepted by a predicate.
///
/// The predicate runs once per element, inside `add`, before the element is
/// converted and stored. Rejected elements are only counted.
pub struct FilterContent<I, W, R> {
    items: Vec<W>,
    rejected: usize,
    algebra: ContentAlgebra<I, W, R>,
    predicate: Predicate<I>,
}

impl<I, W, R: Clone> FilterContent<I, W, R> {
    pub fn new<P>(algebra: ContentAlgebra<I, W, R>, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Self::with_predicate(algebra, Arc::new(predicate))
    }

    fn with_predicate(algebra: ContentAlgebra<I, W, R>, predicate: Predicate<I>) -> Self {
        Self {
            items: Vec::new(),
            rejected: 0,
            algebra,
            predicate,
        }
    }

    /// Number of elements the predicate turned away.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl<I, W, R> Content<I, W, R> for FilterContent<I, W, R>
where
    W: Send,
    R: Clone + Send,
{
    fn add(&mut self, element: I) {
        if (self.predicate)(&element) {
            self.items.push(self.algebra.store(element));
        } else {
            self.rejected += 1;
            log::trace!("element rejected by content filter");
        }
    }

    fn size(&self) -> usize {
        self.items.len()
    }

    fn coalesce(&self) -> R {
        self.algebra.fold(&self.items)
    }
}

/// Factory for [`FilterContent`]; every created content shares the predicate.
pub struct FilterContentFactory<I, W, R> {
    algebra: ContentAlgebra<I, W, R>,
    predicate: Predicate<I>,
}

impl<I, W, R: Clone> FilterContentFactory<I, W, R> {
    pub fn new<P>(algebra: ContentAlgebra<I, W, R>, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        Self {
            algebra,
            predicate: Arc::new(predicate),
        }
    }
}

impl<I, W, R> ContentFactory<I, W, R> for FilterContentFactory<I, W, R>
where
    I: 'static,
    W: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(FilterContent::with_predicate(
            self.algebra.clone(),
            Arc::clone(&self.predicate),
        ))
    }

    fn create_empty(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(EmptyContent::new(self.algebra.empty()))
    }
}

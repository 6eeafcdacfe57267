use super::{Content, ContentAlgebra, ContentFactory, EmptyContent};

/// Keeps only the running sum of the window instead of the stored elements.
///
/// Relies on `sum` being associative with `empty` as identity, so the running
/// value always equals the fold an [`super::AccumulatorContent`] would compute
/// over the same elements.
pub struct IncrementalContent<I, W, R> {
    acc: R,
    size: usize,
    algebra: ContentAlgebra<I, W, R>,
}

impl<I, W, R: Clone> IncrementalContent<I, W, R> {
    pub fn new(algebra: ContentAlgebra<I, W, R>) -> Self {
        Self {
            acc: algebra.empty(),
            size: 0,
            algebra,
        }
    }
}

impl<I, W, R> Content<I, W, R> for IncrementalContent<I, W, R>
where
    R: Clone + Send,
{
    fn add(&mut self, element: I) {
        let stored = self.algebra.store(element);
        let acc = std::mem::replace(&mut self.acc, self.algebra.empty());
        self.acc = self.algebra.sum(acc, self.algebra.relation(&stored));
        self.size += 1;
    }

    fn size(&self) -> usize {
        self.size
    }

    fn coalesce(&self) -> R {
        self.acc.clone()
    }
}

pub struct IncrementalContentFactory<I, W, R> {
    algebra: ContentAlgebra<I, W, R>,
}

impl<I, W, R: Clone> IncrementalContentFactory<I, W, R> {
    pub fn new(algebra: ContentAlgebra<I, W, R>) -> Self {
        Self { algebra }
    }
}

impl<I, W, R> ContentFactory<I, W, R> for IncrementalContentFactory<I, W, R>
where
    I: 'static,
    W: 'static,
    R: Clone + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(IncrementalContent::new(self.algebra.clone()))
    }

    fn create_empty(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(EmptyContent::new(self.algebra.empty()))
    }
}

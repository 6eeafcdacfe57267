use super::{Content, ContentAlgebra, ContentFactory, EmptyContent};

/// Keeps every element that entered the window and folds them on `coalesce`.
pub struct AccumulatorContent<I, W, R> {
    items: Vec<W>,
    algebra: ContentAlgebra<I, W, R>,
}

impl<I, W, R: Clone> AccumulatorContent<I, W, R> {
    pub fn new(algebra: ContentAlgebra<I, W, R>) -> Self {
        Self {
            items: Vec::new(),
            algebra,
        }
    }

    pub fn items(&self) -> &[W] {
        &self.items
    }
}

impl<I, W, R> Content<I, W, R> for AccumulatorContent<I, W, R>
where
    W: Send,
    R: Clone + Send + Sync,
{
    fn add(&mut self, element: I) {
        self.items.push(self.algebra.store(element));
    }

    fn size(&self) -> usize {
        self.items.len()
    }

    fn coalesce(&self) -> R {
        self.algebra.fold(&self.items)
    }
}

/// Factory for [`AccumulatorContent`].
pub struct AccumulatorContentFactory<I, W, R> {
    algebra: ContentAlgebra<I, W, R>,
}

impl<I, W, R: Clone> AccumulatorContentFactory<I, W, R> {
    pub fn new(algebra: ContentAlgebra<I, W, R>) -> Self {
        Self { algebra }
    }
}

impl<I, W, R> ContentFactory<I, W, R> for AccumulatorContentFactory<I, W, R>
where
    I: 'static,
    W: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(AccumulatorContent::new(self.algebra.clone()))
    }

    fn create_empty(&self) -> Box<dyn Content<I, W, R>> {
        Box::new(EmptyContent::new(self.algebra.empty()))
    }
}

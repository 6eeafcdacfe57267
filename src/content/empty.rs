use super::Content;
use std::marker::PhantomData;

/// Read-only content standing in for a window that never received elements.
pub struct EmptyContent<I, W, R> {
    empty: R,
    _marker: PhantomData<fn(I) -> W>,
}

impl<I, W, R> EmptyContent<I, W, R> {
    pub fn new(empty: R) -> Self {
        Self {
            empty,
            _marker: PhantomData,
        }
    }
}

impl<I, W, R> Content<I, W, R> for EmptyContent<I, W, R>
where
    R: Clone + Send,
{
    fn add(&mut self, _element: I) {
        log::warn!("ignoring element added to a read-only empty content");
    }

    fn size(&self) -> usize {
        0
    }

    fn coalesce(&self) -> R {
        self.empty.clone()
    }
}

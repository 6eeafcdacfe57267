mod aggregation_test;
mod content_laws_test;
mod dag_test;
mod oxigraph_test;
mod program_test;
mod r2r_test;

use rsp_core::content::{AccumulatorContentFactory, ContentAlgebra, ContentFactory};
use std::sync::Arc;

/// Multiset of integers: a window's relation is the sorted list of what it
/// holds.
pub fn sorted_vec_algebra() -> ContentAlgebra<u32, u32, Vec<u32>> {
    ContentAlgebra::identity_storage(
        |x: &u32| vec![*x],
        |mut a: Vec<u32>, b: Vec<u32>| {
            a.extend(b);
            a.sort_unstable();
            a
        },
        Vec::new(),
    )
}

pub fn vec_factory() -> Arc<dyn ContentFactory<u32, u32, Vec<u32>>> {
    Arc::new(AccumulatorContentFactory::new(sorted_vec_algebra()))
}

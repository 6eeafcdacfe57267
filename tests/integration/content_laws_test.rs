use crate::sorted_vec_algebra;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsp_core::content::{
    AccumulatorContent, Content, ContentAlgebra, ContentFactory, FilterContentFactory,
    IncrementalContent,
};

fn random_relation(rng: &mut StdRng) -> Vec<u32> {
    let len = rng.gen_range(0..6);
    let mut values: Vec<u32> = (0..len).map(|_| rng.gen_range(0..50)).collect();
    values.sort_unstable();
    values
}

#[test]
fn test_sum_is_associative_with_empty_identity() {
    let algebra = sorted_vec_algebra();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let (a, b, c) = (
            random_relation(&mut rng),
            random_relation(&mut rng),
            random_relation(&mut rng),
        );
        let left = algebra.sum(algebra.sum(a.clone(), b.clone()), c.clone());
        let right = algebra.sum(a.clone(), algebra.sum(b, c));
        assert_eq!(left, right);
        assert_eq!(algebra.sum(algebra.empty(), a.clone()), a);
        assert_eq!(algebra.sum(a.clone(), algebra.empty()), a);
    }
}

#[test]
fn test_incremental_matches_batch_fold() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let mut batch = AccumulatorContent::new(sorted_vec_algebra());
        let mut running = IncrementalContent::new(sorted_vec_algebra());
        let count = rng.gen_range(0..30);
        for _ in 0..count {
            let x = rng.gen_range(0..1000);
            batch.add(x);
            running.add(x);
            assert_eq!(batch.coalesce(), running.coalesce());
        }
        assert_eq!(batch.size(), running.size());
        // Coalescing twice without an add gives the same relation.
        assert_eq!(running.coalesce(), running.coalesce());
    }
}

#[test]
fn test_running_max_needs_no_storage() {
    let algebra: ContentAlgebra<u32, u32, Option<u32>> =
        ContentAlgebra::identity_storage(|x: &u32| Some(*x), |a: Option<u32>, b| a.max(b), None);
    let mut rng = StdRng::seed_from_u64(3);
    let values: Vec<u32> = (0..100).map(|_| rng.gen_range(0..10_000)).collect();

    let mut content = IncrementalContent::new(algebra);
    assert_eq!(content.coalesce(), None);
    for x in &values {
        content.add(*x);
    }
    assert_eq!(content.coalesce(), values.iter().copied().max());
}

#[test]
fn test_filter_content_only_stores_accepted_elements() {
    let factory = FilterContentFactory::new(sorted_vec_algebra(), |x: &u32| x % 2 == 0);
    let mut content = factory.create();
    let mut rng = StdRng::seed_from_u64(11);
    let values: Vec<u32> = (0..40).map(|_| rng.gen_range(0..100)).collect();
    for x in &values {
        content.add(*x);
    }
    let mut evens: Vec<u32> = values.iter().copied().filter(|x| x % 2 == 0).collect();
    evens.sort_unstable();
    assert_eq!(content.size(), evens.len());
    assert_eq!(content.coalesce(), evens);
    assert!(factory.create_empty().coalesce().is_empty());
}

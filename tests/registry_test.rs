mod common;

use approx::assert_relative_eq;
use fell_ngin::{
    Point3,
    data_structures::registry::{Capacity, DEFAULT_CAPACITY, RegistryError, TreeRegistry},
};
use futures::executor::block_on;

use crate::common::test_utils::{
    FakeLoader, TREE, assert_indices_match_offsets, plant, xs,
};

const FIVE_TREES: [([f32; 3], f32); 5] = [
    ([0.0, 0.0, 0.0], 1.0),
    ([1.0, 0.0, 0.0], 1.0),
    ([2.0, 0.0, 0.0], 1.0),
    ([3.0, 0.0, 0.0], 1.0),
    ([4.0, 0.0, 0.0], 1.0),
];

#[test]
fn created_trees_are_indexed_by_their_offset() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    for (n, (position, scale)) in FIVE_TREES.iter().enumerate() {
        let tree = block_on(registry.create(&loader, TREE, Point3::from(*position), *scale))
            .expect("capacity left");
        assert_eq!(tree.index(), n);
        assert_indices_match_offsets(&registry);
    }
    assert_eq!(registry.len(), 5);
    assert_eq!(loader.loads(), 5);
}

#[test]
fn removing_compacts_and_reindexes() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(&mut registry, &loader, &FIVE_TREES);

    registry.remove(1).expect("index in range");

    assert_eq!(registry.len(), 4);
    assert_eq!(xs(&registry), vec![0.0, 2.0, 3.0, 4.0]);
    assert_indices_match_offsets(&registry);
}

#[test]
fn removing_the_first_and_the_last() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(&mut registry, &loader, &FIVE_TREES);

    registry.remove(0).expect("first");
    registry.remove(3).expect("last");

    assert_eq!(xs(&registry), vec![1.0, 2.0, 3.0]);
    assert_indices_match_offsets(&registry);
}

#[test]
fn out_of_range_removal_changes_nothing() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(&mut registry, &loader, &FIVE_TREES[..3]);

    let err = registry.remove(3).expect_err("only three trees");

    assert!(matches!(err, RegistryError::InvalidIndex { index: 3, len: 3 }));
    assert_eq!(xs(&registry), vec![0.0, 1.0, 2.0]);
    assert_indices_match_offsets(&registry);
    assert!(loader.log.released().is_empty());
}

#[test]
fn removing_from_an_empty_registry_is_an_invalid_index() {
    let mut registry: TreeRegistry<()> = TreeRegistry::default();
    assert!(matches!(
        registry.remove(0),
        Err(RegistryError::InvalidIndex { index: 0, len: 0 })
    ));
}

#[test]
fn full_registry_rejects_without_loading() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::new(Capacity::Fixed(2));
    plant(&mut registry, &loader, &FIVE_TREES[..2]);

    let result = block_on(registry.create(&loader, TREE, Point3::new(9.0, 0.0, 9.0), 1.0));

    assert!(matches!(
        result,
        Err(RegistryError::CapacityExceeded { capacity: 2 })
    ));
    assert_eq!(registry.len(), 2);
    assert_eq!(loader.loads(), 2);
}

#[test]
fn default_capacity_is_one_hundred() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    assert_eq!(registry.capacity(), Capacity::Fixed(DEFAULT_CAPACITY));

    for i in 0..DEFAULT_CAPACITY {
        block_on(registry.create(&loader, TREE, Point3::new(i as f32, 0.0, 0.0), 1.0))
            .expect("below capacity");
    }
    let overflow = block_on(registry.create(&loader, TREE, Point3::new(0.0, 0.0, 5.0), 1.0));

    assert!(matches!(
        overflow,
        Err(RegistryError::CapacityExceeded { capacity: 100 })
    ));
    assert_eq!(registry.len(), 100);
}

#[test]
fn unbounded_registry_keeps_growing() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::new(Capacity::Unbounded);
    for i in 0..150 {
        block_on(registry.create(&loader, TREE, Point3::new(i as f32, 0.0, 0.0), 1.0))
            .expect("no limit");
    }
    assert_eq!(registry.len(), 150);
    assert_indices_match_offsets(&registry);
}

#[test]
fn unit_tree_at_origin_has_the_canopy_box() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    let tree = block_on(registry.create(&loader, "path", Point3::new(0.0, 0.0, 0.0), 1.0))
        .expect("empty registry");
    let bb = tree.bounding_box();

    assert_relative_eq!(bb.min.x, -0.7);
    assert_relative_eq!(bb.min.y, -0.7);
    assert_relative_eq!(bb.min.z, -0.7);
    assert_relative_eq!(bb.max.x, 0.7);
    assert_relative_eq!(bb.max.y, 5.7);
    assert_relative_eq!(bb.max.z, 0.7);
    assert_eq!(tree.model().path, "path");
    assert_eq!(loader.placements()[0].bounding_box, *bb);
}

#[test]
fn invalid_scales_are_rejected() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let result = block_on(registry.create(&loader, TREE, Point3::new(0.0, 0.0, 0.0), scale));
        assert!(matches!(result, Err(RegistryError::InvalidScale { .. })));
    }
    assert!(registry.is_empty());
    assert_eq!(loader.loads(), 0);
}

#[test]
fn failed_load_leaves_nothing_behind() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(&mut registry, &loader, &FIVE_TREES[..1]);

    let result = block_on(registry.create(
        &loader,
        "models/missing.obj",
        Point3::new(1.0, 0.0, 0.0),
        1.0,
    ));

    match result {
        Err(RegistryError::ResourceLoad { path, .. }) => assert_eq!(path, "models/missing.obj"),
        other => panic!("expected a load error, got {:?}", other.map(|t| t.index())),
    }
    assert_eq!(registry.len(), 1);
    assert!(loader.log.released().is_empty());
}

#[test]
fn every_model_is_released_exactly_once() {
    let loader = FakeLoader::default();
    let log = loader.log.clone();
    {
        let mut registry = TreeRegistry::default();
        plant(&mut registry, &loader, &FIVE_TREES);

        registry.remove(2).expect("in range");
        assert_eq!(log.released(), vec![2]);

        // a rejected removal must not release anything
        let _ = registry.remove(10);
        assert_eq!(log.released(), vec![2]);

        registry.remove(0).expect("in range");
        assert_eq!(log.released(), vec![2, 0]);

        registry.remove_all();
        assert!(registry.is_empty());
        assert_eq!(log.released().len(), 5);

        // trees planted after teardown go with the registry itself
        plant(&mut registry, &loader, &FIVE_TREES[..2]);
    }
    let released = log.released();
    assert_eq!(released.len(), 7);
    for id in 0..7 {
        assert_eq!(log.times_released(id), 1, "model {id}");
    }
}

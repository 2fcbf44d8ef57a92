mod common;

use fell_ngin::{
    Deg, PhysicalPosition, Point3, Vector3,
    camera::{Camera, Projection, Ray},
    data_structures::registry::TreeRegistry,
    pick::{PickStrategy, find_hit, pick_and_remove},
};

use crate::common::test_utils::{
    FakeLoader, assert_indices_match_offsets, plant, ray_ahead_from_spawn, xs,
};

#[test]
fn clicking_the_middle_tree_fells_only_it() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(
        &mut registry,
        &loader,
        &[
            ([-10.0, 0.0, -2.0], 1.2),
            ([0.0, 0.0, 0.0], 1.0),
            ([10.0, 0.0, 2.0], 1.5),
        ],
    );

    let felled = pick_and_remove(&mut registry, &ray_ahead_from_spawn(), PickStrategy::FirstHit);

    assert_eq!(felled, Some(1));
    assert_eq!(xs(&registry), vec![-10.0, 10.0]);
    assert_indices_match_offsets(&registry);
    assert_eq!(loader.log.released(), vec![1]);
}

#[test]
fn a_miss_changes_nothing() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(&mut registry, &loader, &[([0.0, 0.0, 0.0], 1.0)]);

    let skyward = Ray::new(Point3::new(0.0, 2.0, 4.0), Vector3::new(0.0, 1.0, 0.0));

    assert_eq!(pick_and_remove(&mut registry, &skyward, PickStrategy::Nearest), None);
    assert_eq!(registry.len(), 1);
    assert!(loader.log.released().is_empty());
}

#[test]
fn first_hit_takes_registry_order_and_nearest_takes_distance() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    // both on the line of sight; the far one was planted first
    plant(
        &mut registry,
        &loader,
        &[([0.0, 0.0, -10.0], 1.0), ([0.0, 0.0, -3.0], 1.0)],
    );
    let ray = ray_ahead_from_spawn();

    assert_eq!(find_hit(&registry, &ray, PickStrategy::FirstHit), Some(0));
    assert_eq!(find_hit(&registry, &ray, PickStrategy::Nearest), Some(1));
}

#[test]
fn only_one_tree_falls_per_click() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(
        &mut registry,
        &loader,
        &[([0.0, 0.0, -10.0], 1.0), ([0.0, 0.0, -3.0], 1.0)],
    );
    let ray = ray_ahead_from_spawn();

    assert_eq!(pick_and_remove(&mut registry, &ray, PickStrategy::FirstHit), Some(0));
    assert_eq!(registry.len(), 1);
    assert_eq!(pick_and_remove(&mut registry, &ray, PickStrategy::FirstHit), Some(0));
    assert!(registry.is_empty());
}

#[test]
fn default_strategy_is_first_hit() {
    assert_eq!(PickStrategy::default(), PickStrategy::FirstHit);
}

#[test]
fn aiming_with_the_crosshair_hits_the_tree_in_front() {
    let loader = FakeLoader::default();
    let mut registry = TreeRegistry::default();
    plant(
        &mut registry,
        &loader,
        &[([10.0, 0.0, 2.0], 1.5), ([0.0, 0.0, 0.0], 1.0)],
    );

    let camera = Camera::looking_at((0.0, 2.0, 4.0), (0.0, 2.0, 0.0));
    let projection = Projection::new(800, 450, Deg(60.0), 0.1, 500.0);
    let centre =
        camera.cast_ray_from_mouse(PhysicalPosition::new(400.0, 225.0), 800.0, 450.0, &projection);
    let far_left =
        camera.cast_ray_from_mouse(PhysicalPosition::new(0.0, 225.0), 800.0, 450.0, &projection);

    assert_eq!(find_hit(&registry, &centre, PickStrategy::FirstHit), Some(1));
    assert_eq!(find_hit(&registry, &far_left, PickStrategy::FirstHit), None);
}

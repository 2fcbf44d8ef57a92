//! Ray picking against the tree registry.
//!
//! Picking works on the CPU: the picking ray from
//! [`Context::mouse_ray`](crate::context::Context::mouse_ray) is tested
//! against every tree's bounding box, and the selected tree is removed.

use serde::Deserialize;

use crate::{
    camera::Ray,
    data_structures::registry::{RegistryError, TreeRegistry},
};

/// Which tree a click selects when the ray passes through several boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStrategy {
    /// The first hit in registry order, whatever its distance.
    #[default]
    FirstHit,
    /// The hit closest to the ray origin. Ties go to the earlier tree.
    Nearest,
}

/// Index of the tree `ray` selects, if any.
pub fn find_hit<M>(registry: &TreeRegistry<M>, ray: &Ray, strategy: PickStrategy) -> Option<usize> {
    let mut hits = registry
        .iter()
        .enumerate()
        .filter_map(|(offset, tree)| tree.bounding_box().intersect_ray(ray).map(|t| (offset, t)));

    match strategy {
        PickStrategy::FirstHit => hits.next().map(|(offset, _)| offset),
        PickStrategy::Nearest => hits
            .fold(None, |best: Option<(usize, f32)>, (offset, t)| match best {
                Some((_, best_t)) if best_t <= t => best,
                _ => Some((offset, t)),
            })
            .map(|(offset, _)| offset),
    }
}

/// Remove the tree `ray` selects. Returns the index it had.
pub fn pick_and_remove<M>(
    registry: &mut TreeRegistry<M>,
    ray: &Ray,
    strategy: PickStrategy,
) -> Option<usize> {
    let index = find_hit(registry, ray, strategy)?;
    match registry.remove(index) {
        Ok(()) => {
            log::info!("Felled tree {} ({} left)", index, registry.len());
            Some(index)
        }
        Err(e @ RegistryError::InvalidIndex { .. }) => {
            log::warn!("{}", e);
            None
        }
        Err(e) => {
            log::error!("Removing tree {} failed: {}", index, e);
            None
        }
    }
}

//! Axis-aligned bounding boxes and the ray/box test used for picking.

use cgmath::{Point3, Vector3};

use crate::camera::Ray;

/// Half of a tree's footprint per unit of scale.
pub const TREE_HALF_EXTENT: f32 = 0.7;
/// How far the canopy reaches above the footprint per unit of scale.
pub const TREE_CANOPY_HEIGHT: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// The collision box of a tree standing at `position`.
    ///
    /// The box is `TREE_HALF_EXTENT * scale` wide around the position on every
    /// axis and additionally `TREE_CANOPY_HEIGHT * scale` taller upwards, so it
    /// covers a trunk footprint and the canopy above it.
    pub fn for_tree(position: Point3<f32>, scale: f32) -> Self {
        let half = Vector3::new(1.0, 1.0, 1.0) * (TREE_HALF_EXTENT * scale);
        Self {
            min: position - half,
            max: position + half + Vector3::unit_y() * (TREE_CANOPY_HEIGHT * scale),
        }
    }

    pub fn contains(&self, point: Point3<f32>) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// The eight corners, bottom face first (counter-clockwise seen from above), then the top face.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ]
    }

    /// Slab test. Returns the distance along the ray to the entry point, or
    /// `0.0` when the ray starts inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if direction.abs() < f32::EPSILON {
                // Parallel to this slab: either always inside it or never.
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }

    pub fn is_hit_by(&self, ray: &Ray) -> bool {
        self.intersect_ray(ray).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_tree() -> BoundingBox {
        BoundingBox::for_tree(Point3::new(0.0, 0.0, 0.0), 1.0)
    }

    #[test]
    fn tree_box_is_taller_than_wide() {
        let bb = unit_tree();
        assert_relative_eq!(bb.min.x, -0.7);
        assert_relative_eq!(bb.min.y, -0.7);
        assert_relative_eq!(bb.min.z, -0.7);
        assert_relative_eq!(bb.max.x, 0.7);
        assert_relative_eq!(bb.max.y, 5.7);
        assert_relative_eq!(bb.max.z, 0.7);
    }

    #[test]
    fn tree_box_scales_with_the_tree() {
        let bb = BoundingBox::for_tree(Point3::new(10.0, 0.0, 2.0), 1.5);
        assert_relative_eq!(bb.min.x, 8.95, epsilon = 1e-5);
        assert_relative_eq!(bb.max.y, 1.05 + 7.5, epsilon = 1e-5);
        assert_relative_eq!(bb.max.z, 3.05, epsilon = 1e-5);
    }

    #[test]
    fn ray_towards_the_box_hits_at_the_near_face() {
        let ray = Ray::new(Point3::new(0.0, 2.0, 4.0), Vector3::new(0.0, 0.0, -1.0));
        let t = unit_tree().intersect_ray(&ray).expect("ray should hit");
        assert_relative_eq!(t, 3.3, epsilon = 1e-5);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = Ray::new(Point3::new(0.0, 2.0, 4.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(unit_tree().intersect_ray(&ray).is_none());
    }

    #[test]
    fn axis_parallel_ray_outside_a_slab_misses() {
        let ray = Ray::new(Point3::new(2.0, 2.0, 4.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(!unit_tree().is_hit_by(&ray));
    }

    #[test]
    fn ray_starting_inside_hits_at_zero() {
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 0.3, 0.2));
        assert_eq!(unit_tree().intersect_ray(&ray), Some(0.0));
    }

    #[test]
    fn ray_over_the_canopy_misses() {
        let ray = Ray::new(Point3::new(0.0, 6.0, 4.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(!unit_tree().is_hit_by(&ray));
    }

    #[test]
    fn corners_span_the_box() {
        let bb = unit_tree();
        let corners = bb.corners();
        assert!(corners.iter().all(|c| bb.contains(*c)));
        assert_eq!(corners[0], bb.min);
        assert_eq!(corners[6], bb.max);
    }
}

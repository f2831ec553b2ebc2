//! Primitive trait and HitRecord for ray-object intersection.

use std::sync::Arc;

use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::Material;

/// Record of a ray-object intersection.
///
/// `t` starts at infinity, meaning "no hit"; it is only overwritten
/// when a strictly closer intersection is found. The record is scoped
/// to a single query.
#[derive(Clone)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Parameter t where the intersection occurs; infinity = no hit
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Material at the intersection point
    pub material: Option<Arc<Material>>,
    /// The primitive that was hit, for index re-derivation by the caller
    pub primitive: Option<Arc<dyn Primitive>>,
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            t: f32::INFINITY,
            front_face: false,
            material: None,
            primitive: None,
        }
    }
}

impl HitRecord {
    /// True if this record still carries the no-hit sentinel.
    pub fn is_miss(&self) -> bool {
        self.t.is_infinite()
    }

    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // If the ray and normal point in the same direction, we're inside
        self.front_face = ray.direction.dot(outward_normal) < 0.0;

        // Normal always points against the ray
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for geometry that can be intersected by rays.
///
/// Every primitive answers three things: its bounding box, whether a
/// ray hits it at all, and where the nearest hit within an interval is.
pub trait Primitive: Send + Sync {
    /// Nearest-hit test within the given interval.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Any-hit test within the given interval.
    ///
    /// Primitives with a cheaper boolean test override this.
    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        let mut rec = HitRecord::default();
        self.hit(ray, ray_t, &mut rec)
    }

    /// Get the axis-aligned bounding box of this primitive.
    fn bounding_box(&self) -> Aabb;
}

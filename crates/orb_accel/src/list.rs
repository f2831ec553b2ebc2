//! Brute-force list accelerator.
//!
//! No partitioning at all: every query scans every primitive. O(n) per
//! ray, but trivially correct, which makes it the ground-truth oracle
//! the tree and grid structures are validated against.

use std::sync::Arc;

use log::debug;
use orb_math::{Aabb, Interval, Ray};

use crate::{HitRecord, Primitive, RayAccelerator};

/// Linear-scan accelerator over an unordered primitive list.
pub struct ListAccelerator {
    objects: Vec<Arc<dyn Primitive>>,
    bounds: Aabb,
}

impl ListAccelerator {
    /// Build from a primitive list. An empty list yields an empty
    /// structure that reports no hits.
    pub fn new(objects: Vec<Arc<dyn Primitive>>) -> Self {
        let bounds = objects.iter().fold(Aabb::EMPTY, |mut acc, obj| {
            acc.include(&obj.bounding_box());
            acc
        });

        debug!("built list accelerator: {} primitives", objects.len());

        Self { objects, bounds }
    }
}

impl RayAccelerator for ListAccelerator {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let mut hit_anything = false;
        let mut closest_so_far = ray_t.max;

        for object in &self.objects {
            let interval = Interval::new(ray_t.min, closest_so_far);
            if object.hit(ray, interval, rec) {
                hit_anything = true;
                closest_so_far = rec.t;
                rec.primitive = Some(Arc::clone(object));
            }
        }

        hit_anything
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.objects.iter().any(|object| object.hit_any(ray, ray_t))
    }

    fn objects(&self) -> &[Arc<dyn Primitive>] {
        &self.objects
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

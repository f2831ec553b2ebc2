//! Scene boundary: owns exactly one active accelerator.
//!
//! The surrounding application builds a scene once from its primitive
//! list and forwards every ray query here. Switching strategies drops
//! the current structure and rebuilds from the same primitives; there
//! is no incremental update.

use std::sync::Arc;

use log::info;
use orb_math::{Aabb, Interval, Ray};

use crate::{
    AcceleratorKind, BvhAccelerator, HitRecord, ListAccelerator, OctreeAccelerator, Primitive,
    RayAccelerator, UniformAccelerator,
};

fn build_accelerator(
    kind: AcceleratorKind,
    objects: Vec<Arc<dyn Primitive>>,
) -> Box<dyn RayAccelerator> {
    match kind {
        AcceleratorKind::List => Box::new(ListAccelerator::new(objects)),
        AcceleratorKind::Bvh => Box::new(BvhAccelerator::new(objects)),
        AcceleratorKind::Octree => Box::new(OctreeAccelerator::new(objects)),
        AcceleratorKind::Uniform => Box::new(UniformAccelerator::new(objects)),
    }
}

/// A queryable scene with one active acceleration structure.
pub struct Scene {
    kind: AcceleratorKind,
    accel: Box<dyn RayAccelerator>,
}

impl Scene {
    /// Build a scene over a primitive list with the given strategy.
    pub fn new(objects: Vec<Arc<dyn Primitive>>, kind: AcceleratorKind) -> Self {
        info!("building scene: {} primitives, {kind}", objects.len());
        Self {
            kind,
            accel: build_accelerator(kind, objects),
        }
    }

    /// The active strategy.
    pub fn kind(&self) -> AcceleratorKind {
        self.kind
    }

    /// Switch strategies by rebuilding from the current primitive list.
    pub fn switch_to(&mut self, kind: AcceleratorKind) {
        if kind == self.kind {
            return;
        }
        info!("switching accelerator: {} -> {kind}", self.kind);
        let objects = self.accel.objects().to_vec();
        self.accel = build_accelerator(kind, objects);
        self.kind = kind;
    }

    /// Nearest-hit query.
    pub fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        self.accel.hit(ray, ray_t, rec)
    }

    /// Any-hit query (shadow/occlusion test).
    pub fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.accel.hit_any(ray, ray_t)
    }

    /// The primitive list in the active structure's storage order.
    pub fn objects(&self) -> &[Arc<dyn Primitive>] {
        self.accel.objects()
    }

    /// Bounding box of the whole scene.
    pub fn bounds(&self) -> Aabb {
        self.accel.bounds()
    }
}

//! Orb spatial acceleration structures.
//!
//! Answers one question under tight latency budgets: does this ray hit
//! anything in the scene, and if so, where and on what surface? Four
//! interchangeable strategies partition a static primitive set once and
//! then answer any-hit and nearest-hit queries: a brute-force list (the
//! correctness oracle), a BVH, a parametric octree, and a uniform grid.

mod accelerator;
mod bvh;
mod list;
mod mailbox;
mod material;
mod octree;
mod primitive;
mod scene;
mod sphere;
mod triangle;
mod uniform;

pub use accelerator::{AcceleratorKind, ParseAcceleratorKindError, RayAccelerator};
pub use bvh::BvhAccelerator;
pub use list::ListAccelerator;
pub use mailbox::Mailbox;
pub use material::Material;
pub use octree::OctreeAccelerator;
pub use primitive::{HitRecord, Primitive};
pub use scene::Scene;
pub use sphere::Sphere;
pub use triangle::Triangle;
pub use uniform::UniformAccelerator;

/// Re-export common math types from orb_math
pub use orb_math::{Aabb, Interval, Ray, Vec3};

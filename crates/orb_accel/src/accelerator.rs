//! The uniform accelerator interface every strategy implements.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use orb_math::{Aabb, Interval, Ray};
use thiserror::Error;

use crate::{HitRecord, Primitive};

/// A built acceleration structure answering ray queries.
///
/// Structures are built once, in their constructor, from an immutable
/// primitive list; a query can therefore never observe an unbuilt
/// structure. Rebuilding means dropping the value and constructing a
/// new one. Built structures are read-only and safe to query from
/// multiple threads concurrently.
pub trait RayAccelerator: Send + Sync {
    /// Nearest-hit query: finds the closest intersection along the ray
    /// inside `ray_t` and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Any-hit query: returns as soon as some intersection inside
    /// `ray_t` is found. Used for shadow/occlusion tests.
    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool;

    /// The primitive list, in this structure's (possibly reordered)
    /// storage order, so the caller can re-derive per-primitive indices.
    fn objects(&self) -> &[Arc<dyn Primitive>];

    /// Bounding box of the whole primitive set.
    fn bounds(&self) -> Aabb;
}

/// Which acceleration strategy a scene uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorKind {
    /// Brute-force linear scan; the correctness baseline.
    List,
    /// Bounding-volume hierarchy with median splits.
    Bvh,
    /// Parametric octree.
    Octree,
    /// Uniform grid walked with 3D-DDA.
    Uniform,
}

/// Error returned when an accelerator name from configuration is not
/// recognized.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown accelerator kind: {0:?} (expected list, bvh, octree, or uniform)")]
pub struct ParseAcceleratorKindError(String);

impl FromStr for AcceleratorKind {
    type Err = ParseAcceleratorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "bvh" => Ok(Self::Bvh),
            "octree" => Ok(Self::Octree),
            "uniform" | "grid" => Ok(Self::Uniform),
            other => Err(ParseAcceleratorKindError(other.to_string())),
        }
    }
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Bvh => "bvh",
            Self::Octree => "octree",
            Self::Uniform => "uniform",
        };
        f.write_str(name)
    }
}

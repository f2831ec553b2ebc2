use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box for the spatial acceleration structures.
///
/// Stored as min/max corner points. The invariant `min[i] <= max[i]`
/// holds for every axis after any union operation; the `EMPTY` constant
/// deliberately inverts it so that unioning anything into an empty box
/// yields that thing's box.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Minimum thickness of a box along any axis; planar geometry
    /// (axis-aligned triangles) gets padded so the slab test never sees
    /// a zero-width slab.
    const MIN_THICKNESS: f32 = 1e-4;

    /// An empty box (contains nothing, absorbs nothing under union).
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from two opposite corners, padded to minimum thickness.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            min: a.min(b),
            max: a.max(b),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create a box that surrounds two other boxes.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow this box to also cover `other`.
    pub fn include(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Grow this box to also cover a single point.
    pub fn include_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// True if the box covers no volume at all.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the extent of the box along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        }
    }

    /// True if the point lies inside the box (boundary inclusive).
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// True if `other` is fully inside this box (boundary inclusive).
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && other.max.cmple(self.max).all()
    }

    /// True if the two boxes share any volume (boundary touching counts,
    /// so a primitive sitting exactly on a cell boundary lands in both
    /// adjoining cells).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Test if a ray intersects this box within the given interval.
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        self.hit_range(r, ray_t).is_some()
    }

    /// Slab test returning the parametric entry/exit distances of the
    /// ray through the box, clipped to `ray_t`, or `None` on a miss.
    ///
    /// A zero direction component produces an infinite slab interval
    /// rather than a division fault; the 0 * inf = NaN case (origin
    /// exactly on a slab plane) is absorbed because `f32::max`/`min`
    /// ignore a NaN operand.
    pub fn hit_range(&self, r: &Ray, ray_t: Interval) -> Option<(f32, f32)> {
        let mut t_min = ray_t.min;
        let mut t_max = ray_t.max;

        for axis in 0..3 {
            let inv = 1.0 / r.direction[axis];
            let mut t0 = (self.min[axis] - r.origin[axis]) * inv;
            let mut t1 = (self.max[axis] - r.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_max < t_min {
                return None;
            }
        }

        Some((t_min, t_max))
    }

    /// Pad axes thinner than `MIN_THICKNESS` to avoid degenerate slabs.
    fn pad_to_minimums(&mut self) {
        for axis in 0..3 {
            if self.max[axis] - self.min[axis] < Self::MIN_THICKNESS {
                let pad = Self::MIN_THICKNESS * 0.5;
                self.min[axis] -= pad;
                self.max[axis] += pad;
            }
        }
    }
}

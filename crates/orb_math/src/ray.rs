use crate::Vec3;

/// A ray in 3D space with an origin and a direction.
///
/// Rays represent a half-line starting at `origin` and traveling in
/// `direction`. The direction is not required to be normalized; the
/// parametric hit distances reported by intersection tests are in units
/// of the direction's length. The valid parametric range of a query is
/// passed separately as an [`Interval`](crate::Interval) so the ray
/// itself stays immutable while traversal narrows the range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

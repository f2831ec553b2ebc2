//! Triangle primitive for ray queries.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use std::sync::Arc;

use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::{HitRecord, Material, Primitive};

/// A triangle primitive.
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Pre-computed face normal (unit length)
    normal: Vec3,
    /// Material
    material: Arc<Material>,
    /// Bounding box
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Arc<Material>) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let normal = edge1.cross(edge2).normalize();

        // from_points pads thin dimensions, so axis-aligned triangles
        // still get a box with volume
        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        Self {
            v0,
            v1,
            v2,
            normal,
            material,
            bbox,
        }
    }
}

impl Primitive for Triangle {
    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);

        // Check if intersection is outside triangle (u parameter)
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);

        // Check if intersection is outside triangle (v parameter)
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        // Calculate t parameter
        let t = f * edge2.dot(q);

        if !ray_t.contains(t) {
            return false;
        }

        // Valid intersection found
        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, self.normal);
        rec.material = Some(Arc::clone(&self.material));

        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_hit() {
        // Triangle in XY plane at z=-1
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
            Arc::new(Material::default()),
        );

        // Ray pointing at triangle center
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(tri.hit(&ray, interval, &mut rec));
        assert!((rec.t - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
            Arc::new(Material::default()),
        );

        // Ray pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(!tri.hit(&ray, interval, &mut rec));
    }

    #[test]
    fn test_triangle_edge_parallel_ray() {
        let tri = Triangle::new(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Arc::new(Material::default()),
        );

        // Ray lying in the triangle's plane: rejected as parallel
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let mut rec = HitRecord::default();
        assert!(!tri.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
    }

    #[test]
    fn test_triangle_bounding_box_padded() {
        // Axis-aligned triangle still yields a box with thickness
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Arc::new(Material::default()),
        );

        let bbox = tri.bounding_box();
        assert!(bbox.max.z > bbox.min.z);
    }
}

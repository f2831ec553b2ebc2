//! Sphere primitive for ray queries.

use std::sync::Arc;

use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::{HitRecord, Material, Primitive};

/// A sphere primitive.
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Arc<Material>,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32, material: Arc<Material>) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Primitive for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return false;
            }
        }

        rec.t = root;
        rec.p = ray.at(rec.t);
        let outward_normal = (rec.p - self.center) / self.radius;
        rec.set_face_normal(ray, outward_normal);
        rec.material = Some(Arc::clone(&self.material));

        true
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return false;
        }

        // Either root inside the interval counts
        let sqrtd = discriminant.sqrt();
        ray_t.surrounds((h - sqrtd) / a) || ray_t.surrounds((h + sqrtd) / a)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::default()),
        );

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, interval, &mut rec));
        assert!((rec.t - 0.5).abs() < 0.001); // Should hit at t=0.5
        assert!(rec.front_face);
        assert!(sphere.hit_any(&ray, interval));
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::default()),
        );

        // Ray pointing away from sphere
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(!sphere.hit(&ray, interval, &mut rec));
        assert!(rec.is_miss());
        assert!(!sphere.hit_any(&ray, interval));
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Material::default()));

        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, interval, &mut rec));
        assert!((rec.t - 1.0).abs() < 0.001);
        // Back face: normal flipped to point against the ray
        assert!(!rec.front_face);
        assert!((rec.normal - Vec3::new(-1.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_sphere_bounding_box() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5, Arc::new(Material::default()));
        let bbox = sphere.bounding_box();

        assert!(bbox.contains_point(Vec3::new(1.0, 2.0, 3.5)));
        assert!(!bbox.contains_point(Vec3::new(2.0, 2.0, 3.0)));
    }
}

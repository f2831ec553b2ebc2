//! Builds a small scene with every acceleration strategy and compares
//! query timings. Run with `RUST_LOG=debug` to see build statistics.

use std::sync::Arc;
use std::time::Instant;

use orb_accel::{
    AcceleratorKind, HitRecord, Interval, Material, Primitive, Ray, Scene, Sphere, Triangle, Vec3,
};

fn build_objects() -> Vec<Arc<dyn Primitive>> {
    let grey = Arc::new(Material::default());
    let mut objects: Vec<Arc<dyn Primitive>> = Vec::new();

    // A slab of spheres
    for x in 0..10 {
        for z in 0..10 {
            objects.push(Arc::new(Sphere::new(
                Vec3::new(x as f32 * 2.0, 1.0, z as f32 * 2.0),
                0.6,
                Arc::clone(&grey),
            )));
        }
    }

    // A floor quad underneath
    let floor = Arc::new(Material::new("floor", Vec3::new(0.7, 0.7, 0.7)));
    objects.push(Arc::new(Triangle::new(
        Vec3::new(-2.0, 0.0, -2.0),
        Vec3::new(20.0, 0.0, -2.0),
        Vec3::new(20.0, 0.0, 20.0),
        Arc::clone(&floor),
    )));
    objects.push(Arc::new(Triangle::new(
        Vec3::new(-2.0, 0.0, -2.0),
        Vec3::new(20.0, 0.0, 20.0),
        Vec3::new(-2.0, 0.0, 20.0),
        floor,
    )));

    objects
}

fn main() {
    env_logger::init();

    let objects = build_objects();
    let interval = Interval::new(0.001, f32::INFINITY);

    for kind in [
        AcceleratorKind::List,
        AcceleratorKind::Bvh,
        AcceleratorKind::Octree,
        AcceleratorKind::Uniform,
    ] {
        let build_start = Instant::now();
        let scene = Scene::new(objects.clone(), kind);
        let build_time = build_start.elapsed();

        // Shoot a grid of downward rays across the slab
        let query_start = Instant::now();
        let mut hits = 0u32;
        for i in 0..200 {
            for j in 0..200 {
                let origin = Vec3::new(i as f32 * 0.1, 10.0, j as f32 * 0.1);
                let ray = Ray::new(origin, Vec3::new(0.0, -1.0, 0.0));
                let mut rec = HitRecord::default();
                if scene.hit(&ray, interval, &mut rec) {
                    hits += 1;
                }
            }
        }
        let query_time = query_start.elapsed();

        println!(
            "{kind:>8}: build {build_time:>10.2?}, 40k rays {query_time:>10.2?}, {hits} hits"
        );
    }
}

//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Median-split binary tree over primitive bounding boxes, stored as a
//! flat node arena. An interior node records the index of its first
//! child; the second child always sits in the adjacent slot. Traversal
//! keeps an explicit stack of pending nodes tagged with their box entry
//! distance so far subtrees can be discarded once a closer hit exists.

use std::sync::Arc;

use log::debug;
use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::{HitRecord, Primitive, RayAccelerator};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Maximum tree depth; ranges at this depth become leaves regardless
/// of size.
const MAX_DEPTH: usize = 20;

enum BvhNodeKind {
    /// Range into the reordered primitive array.
    Leaf { start: u32, count: u32 },
    /// Index of the left child; the right child is at `first_child + 1`.
    Interior { first_child: u32 },
}

struct BvhNode {
    bounds: Aabb,
    kind: BvhNodeKind,
}

struct PrimInfo {
    object: Arc<dyn Primitive>,
    bounds: Aabb,
    centroid: Vec3,
}

/// BVH accelerator; primitives are reordered during the build so leaf
/// ranges are contiguous.
pub struct BvhAccelerator {
    objects: Vec<Arc<dyn Primitive>>,
    nodes: Vec<BvhNode>,
    bounds: Aabb,
}

impl BvhAccelerator {
    /// Build from a primitive list. An empty list yields an empty
    /// structure that reports no hits.
    pub fn new(objects: Vec<Arc<dyn Primitive>>) -> Self {
        let mut prims: Vec<PrimInfo> = objects
            .into_iter()
            .map(|object| {
                let bounds = object.bounding_box();
                let centroid = bounds.centroid();
                PrimInfo {
                    object,
                    bounds,
                    centroid,
                }
            })
            .collect();

        let mut nodes = Vec::new();
        if !prims.is_empty() {
            let n = prims.len();
            nodes.push(BvhNode {
                bounds: Aabb::EMPTY,
                kind: BvhNodeKind::Leaf { start: 0, count: 0 },
            });
            Self::build_into(&mut nodes, &mut prims, 0, 0, n, 0);
        }

        let bounds = nodes.first().map_or(Aabb::EMPTY, |root| root.bounds);
        let objects: Vec<_> = prims.into_iter().map(|p| p.object).collect();

        debug!(
            "built bvh: {} primitives, {} nodes",
            objects.len(),
            nodes.len()
        );

        Self {
            objects,
            nodes,
            bounds,
        }
    }

    /// Fill the node at `slot` from the primitive range `[start, end)`,
    /// appending any descendants to the arena.
    fn build_into(
        nodes: &mut Vec<BvhNode>,
        prims: &mut [PrimInfo],
        slot: usize,
        start: usize,
        end: usize,
        depth: usize,
    ) {
        let count = end - start;
        debug_assert!(count > 0, "bvh node built over an empty range");

        let bounds = prims[start..end]
            .iter()
            .fold(Aabb::EMPTY, |mut acc, prim| {
                acc.include(&prim.bounds);
                acc
            });

        if count <= LEAF_MAX_SIZE || depth >= MAX_DEPTH {
            nodes[slot] = BvhNode {
                bounds,
                kind: BvhNodeKind::Leaf {
                    start: start as u32,
                    count: count as u32,
                },
            };
            return;
        }

        // Median split: sort the range by bbox center along the node
        // box's largest axis and cut at the first center past the axis
        // midpoint.
        let axis = bounds.longest_axis();
        let midpoint = bounds.centroid()[axis];

        prims[start..end].sort_unstable_by(|a, b| {
            a.centroid[axis]
                .partial_cmp(&b.centroid[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut split = prims[start..end].partition_point(|p| p.centroid[axis] <= midpoint);
        if split == 0 || split == count {
            // All centers on one side of the midpoint (clustered
            // input); fall back to the index midpoint so both children
            // are non-empty.
            split = count / 2;
        }
        let mid = start + split;

        let first_child = nodes.len();
        for _ in 0..2 {
            nodes.push(BvhNode {
                bounds: Aabb::EMPTY,
                kind: BvhNodeKind::Leaf { start: 0, count: 0 },
            });
        }
        nodes[slot] = BvhNode {
            bounds,
            kind: BvhNodeKind::Interior {
                first_child: first_child as u32,
            },
        };

        Self::build_into(nodes, prims, first_child, start, mid, depth + 1);
        Self::build_into(nodes, prims, first_child + 1, mid, end, depth + 1);
    }

    /// Check that every node box contains its children's boxes and
    /// every leaf box contains its primitives' boxes.
    #[cfg(test)]
    fn validate_containment(&self) {
        for node in &self.nodes {
            match node.kind {
                BvhNodeKind::Leaf { start, count } => {
                    for obj in &self.objects[start as usize..(start + count) as usize] {
                        assert!(node.bounds.contains_box(&obj.bounding_box()));
                    }
                }
                BvhNodeKind::Interior { first_child } => {
                    let left = &self.nodes[first_child as usize];
                    let right = &self.nodes[first_child as usize + 1];
                    assert!(node.bounds.contains_box(&left.bounds));
                    assert!(node.bounds.contains_box(&right.bounds));
                }
            }
        }
    }
}

impl RayAccelerator for BvhAccelerator {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let root_entry = match self.bounds.hit_range(ray, ray_t) {
            Some((t0, _)) => t0,
            None => return false,
        };

        let mut hit_anything = false;
        let mut closest = ray_t.max;

        // Pending sibling nodes, tagged with their box entry distance.
        let mut stack: Vec<(u32, f32)> = Vec::with_capacity(64);
        stack.push((0, root_entry));

        while let Some((index, t_entry)) = stack.pop() {
            // A closer hit landed since this entry was pushed.
            if t_entry > closest {
                continue;
            }

            match self.nodes[index as usize].kind {
                BvhNodeKind::Leaf { start, count } => {
                    for object in &self.objects[start as usize..(start + count) as usize] {
                        let interval = Interval::new(ray_t.min, closest);
                        if object.hit(ray, interval, rec) {
                            hit_anything = true;
                            closest = rec.t;
                            rec.primitive = Some(Arc::clone(object));
                        }
                    }
                }
                BvhNodeKind::Interior { first_child } => {
                    let interval = Interval::new(ray_t.min, closest);
                    let left = first_child;
                    let right = first_child + 1;

                    let t_left = self.nodes[left as usize]
                        .bounds
                        .hit_range(ray, interval)
                        .map(|(t0, _)| t0);
                    let t_right = self.nodes[right as usize]
                        .bounds
                        .hit_range(ray, interval)
                        .map(|(t0, _)| t0);

                    // Descend the closer child first; push the farther
                    // one with its entry distance for later pruning.
                    match (t_left, t_right) {
                        (Some(a), Some(b)) => {
                            if a <= b {
                                stack.push((right, b));
                                stack.push((left, a));
                            } else {
                                stack.push((left, a));
                                stack.push((right, b));
                            }
                        }
                        (Some(a), None) => stack.push((left, a)),
                        (None, Some(b)) => stack.push((right, b)),
                        (None, None) => {}
                    }
                }
            }
        }

        hit_anything
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        if self.nodes.is_empty() || !self.bounds.hit(ray, ray_t) {
            return false;
        }

        let mut stack: Vec<u32> = Vec::with_capacity(64);
        stack.push(0);

        while let Some(index) = stack.pop() {
            match self.nodes[index as usize].kind {
                BvhNodeKind::Leaf { start, count } => {
                    for object in &self.objects[start as usize..(start + count) as usize] {
                        if object.hit_any(ray, ray_t) {
                            return true;
                        }
                    }
                }
                BvhNodeKind::Interior { first_child } => {
                    for child in [first_child, first_child + 1] {
                        if self.nodes[child as usize].bounds.hit(ray, ray_t) {
                            stack.push(child);
                        }
                    }
                }
            }
        }

        false
    }

    fn objects(&self) -> &[Arc<dyn Primitive>] {
        &self.objects
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ListAccelerator, Material, Sphere};

    fn spheres_along_x(n: usize) -> Vec<Arc<dyn Primitive>> {
        (0..n)
            .map(|i| {
                Arc::new(Sphere::new(
                    Vec3::new(i as f32 * 2.0, 0.0, -5.0),
                    0.5,
                    Arc::new(Material::default()),
                )) as Arc<dyn Primitive>
            })
            .collect()
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = BvhAccelerator::new(vec![]);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let mut rec = HitRecord::default();
        assert!(!bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!(rec.is_miss());
        assert!(!bvh.hit_any(&ray, Interval::new(0.001, f32::INFINITY)));
    }

    #[test]
    fn test_bvh_single_sphere() {
        let bvh = BvhAccelerator::new(spheres_along_x(1));
        assert_eq!(bvh.nodes.len(), 1);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 4.5).abs() < 0.001);
    }

    #[test]
    fn test_bvh_multiple_spheres() {
        let bvh = BvhAccelerator::new(spheres_along_x(10));
        bvh.validate_containment();

        // Ray that hits the sphere at x=10
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.p.z - (-4.5)).abs() < 0.01);

        // Ray between the spheres misses
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(!bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!(rec.is_miss());
    }

    #[test]
    fn test_bvh_nearest_along_ray() {
        // Spheres stacked along the ray; nearest must win regardless of
        // traversal order
        let objects: Vec<Arc<dyn Primitive>> = (1..=8)
            .map(|i| {
                Arc::new(Sphere::new(
                    Vec3::new(0.0, 0.0, -(i as f32) * 3.0),
                    0.5,
                    Arc::new(Material::default()),
                )) as Arc<dyn Primitive>
            })
            .collect();
        let bvh = BvhAccelerator::new(objects);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_bvh_clustered_input_still_splits() {
        // All centroids identical: midpoint split degenerates and the
        // index-midpoint fallback must keep the build terminating
        let objects: Vec<Arc<dyn Primitive>> = (0..32)
            .map(|_| {
                Arc::new(Sphere::new(
                    Vec3::new(0.0, 0.0, -5.0),
                    0.5,
                    Arc::new(Material::default()),
                )) as Arc<dyn Primitive>
            })
            .collect();
        let bvh = BvhAccelerator::new(objects);
        bvh.validate_containment();

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 4.5).abs() < 0.001);
    }

    #[test]
    fn test_bvh_agrees_with_list() {
        let objects = spheres_along_x(10);
        let list = ListAccelerator::new(objects.clone());
        let bvh = BvhAccelerator::new(objects);

        for i in 0..40 {
            let origin = Vec3::new(i as f32 * 0.5 - 2.0, 0.3, 0.0);
            let ray = Ray::new(origin, Vec3::new(0.1, -0.05, -1.0));
            let interval = Interval::new(0.001, f32::INFINITY);

            let mut rec_list = HitRecord::default();
            let mut rec_bvh = HitRecord::default();
            let hit_list = list.hit(&ray, interval, &mut rec_list);
            let hit_bvh = bvh.hit(&ray, interval, &mut rec_bvh);

            assert_eq!(hit_list, hit_bvh);
            assert_eq!(list.hit_any(&ray, interval), bvh.hit_any(&ray, interval));
            if hit_list {
                assert!((rec_list.t - rec_bvh.t).abs() < 1e-4);
            }
        }
    }
}

//! Octree acceleration structure with parametric traversal.
//!
//! Build recursively splits a node's box into eight octants at its
//! center; a primitive lands in every octant one of its box corners
//! selects. Nodes live in a flat arena with children stored as indices.
//!
//! Traversal is the published parametric-octree walk (Revelles et al.):
//! the ray is mirrored into the all-positive-direction case, entry and
//! exit parameters are maintained per axis, and children are visited in
//! strict ray order driven by an explicit per-octant transition table.
//! Octant codes use x -> bit 2, y -> bit 1, z -> bit 0, a bit being set
//! when the coordinate is at or above the node center.

use std::sync::Arc;

use log::debug;
use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::{HitRecord, Mailbox, Primitive, RayAccelerator};

/// Subdivide a node only while it holds more than this many primitives.
const LEAF_MAX_SIZE: usize = 3;

/// Maximum subdivision depth; nodes at this depth stay leaves.
const MAX_DEPTH: usize = 7;

/// Transition-table sentinel: the ray leaves the current node.
const EXIT: u8 = 8;

/// Substitute for zero direction components after mirroring, so the
/// per-axis parameters stay computable without dividing by zero.
const TINY_DIR: f32 = 1e-30;

enum OctreeNodeKind {
    /// Primitive indices overlapping this cell (deduplicated).
    Leaf(Vec<u32>),
    /// Arena indices of the eight children, indexed by octant code.
    Interior([u32; 8]),
}

struct OctreeNode {
    bounds: Aabb,
    center: Vec3,
    kind: OctreeNodeKind,
}

/// Octree accelerator over an immutable primitive list.
pub struct OctreeAccelerator {
    objects: Vec<Arc<dyn Primitive>>,
    nodes: Vec<OctreeNode>,
    /// Arena index of the root (children precede parents).
    root: u32,
    bounds: Aabb,
}

/// Octant code of a point relative to a node center.
#[inline]
fn octant_index(p: Vec3, center: Vec3) -> u8 {
    let mut oct = 0u8;
    if p.x >= center.x {
        oct |= 4;
    }
    if p.y >= center.y {
        oct |= 2;
    }
    if p.z >= center.z {
        oct |= 1;
    }
    oct
}

/// Box of one octant of a parent box split at `center`.
fn octant_bounds(bounds: &Aabb, center: Vec3, oct: u8) -> Aabb {
    let mut min = bounds.min;
    let mut max = center;
    if oct & 4 != 0 {
        min.x = center.x;
        max.x = bounds.max.x;
    }
    if oct & 2 != 0 {
        min.y = center.y;
        max.y = bounds.max.y;
    }
    if oct & 1 != 0 {
        min.z = center.z;
        max.z = bounds.max.z;
    }
    Aabb { min, max }
}

/// Midpoint-crossing parameter for one axis, with the degenerate
/// infinite-slab case resolved by comparing the (mirrored) origin
/// against the node center.
#[inline]
fn mid_param(t0: f32, t1: f32, origin: f32, center: f32) -> f32 {
    let tm = 0.5 * (t0 + t1);
    if tm.is_nan() {
        if origin < center {
            f32::INFINITY
        } else {
            f32::NEG_INFINITY
        }
    } else {
        tm
    }
}

/// First octant the ray enters, from the entry plane and the midpoint
/// crossings.
fn first_node(tx0: f32, ty0: f32, tz0: f32, txm: f32, tym: f32, tzm: f32) -> u8 {
    let mut oct = 0u8;
    if tx0 > ty0 && tx0 > tz0 {
        // Enters through the YZ plane
        if tym < tx0 {
            oct |= 2;
        }
        if tzm < tx0 {
            oct |= 1;
        }
    } else if ty0 > tz0 {
        // Enters through the XZ plane
        if txm < ty0 {
            oct |= 4;
        }
        if tzm < ty0 {
            oct |= 1;
        }
    } else {
        // Enters through the XY plane
        if txm < tz0 {
            oct |= 4;
        }
        if tym < tz0 {
            oct |= 2;
        }
    }
    oct
}

/// Successor octant given the current octant's exit parameters and the
/// neighbor reached across each exit plane.
#[inline]
fn next_node(tx1: f32, ty1: f32, tz1: f32, on_x: u8, on_y: u8, on_z: u8) -> u8 {
    if tx1 < ty1 {
        if tx1 < tz1 {
            on_x
        } else {
            on_z
        }
    } else if ty1 < tz1 {
        on_y
    } else {
        on_z
    }
}

/// Parametric state of one node visit: per-axis entry and exit.
#[derive(Clone, Copy)]
struct Span {
    tx0: f32,
    ty0: f32,
    tz0: f32,
    tx1: f32,
    ty1: f32,
    tz1: f32,
}

impl Span {
    #[inline]
    fn entry(&self) -> f32 {
        self.tx0.max(self.ty0).max(self.tz0)
    }

    #[inline]
    fn exit(&self) -> f32 {
        self.tx1.min(self.ty1).min(self.tz1)
    }

    /// Sub-span of one octant, plus the successor octant for each exit
    /// plane. This is the 8-entry next-octant table of the published
    /// algorithm written out as explicit transitions.
    fn octant(&self, oct: u8, txm: f32, tym: f32, tzm: f32) -> (Span, u8, u8, u8) {
        let Span {
            tx0,
            ty0,
            tz0,
            tx1,
            ty1,
            tz1,
        } = *self;
        match oct {
            0 => (span(tx0, ty0, tz0, txm, tym, tzm), 4, 2, 1),
            1 => (span(tx0, ty0, tzm, txm, tym, tz1), 5, 3, EXIT),
            2 => (span(tx0, tym, tz0, txm, ty1, tzm), 6, EXIT, 3),
            3 => (span(tx0, tym, tzm, txm, ty1, tz1), 7, EXIT, EXIT),
            4 => (span(txm, ty0, tz0, tx1, tym, tzm), EXIT, 6, 5),
            5 => (span(txm, ty0, tzm, tx1, tym, tz1), EXIT, 7, EXIT),
            6 => (span(txm, tym, tz0, tx1, ty1, tzm), EXIT, EXIT, 7),
            7 => (span(txm, tym, tzm, tx1, ty1, tz1), EXIT, EXIT, EXIT),
            _ => unreachable!("octant code out of range"),
        }
    }
}

#[inline]
fn span(tx0: f32, ty0: f32, tz0: f32, tx1: f32, ty1: f32, tz1: f32) -> Span {
    Span {
        tx0,
        ty0,
        tz0,
        tx1,
        ty1,
        tz1,
    }
}

impl OctreeAccelerator {
    /// Build from a primitive list. An empty list yields an empty
    /// structure that reports no hits.
    pub fn new(objects: Vec<Arc<dyn Primitive>>) -> Self {
        let boxes: Vec<Aabb> = objects.iter().map(|obj| obj.bounding_box()).collect();
        let bounds = boxes.iter().fold(Aabb::EMPTY, |mut acc, b| {
            acc.include(b);
            acc
        });

        let mut nodes = Vec::new();
        let root = if objects.is_empty() {
            0
        } else {
            let all: Vec<u32> = (0..objects.len() as u32).collect();
            Self::build_node(&mut nodes, &boxes, bounds, all, 0)
        };

        debug!(
            "built octree: {} primitives, {} nodes",
            objects.len(),
            nodes.len()
        );

        Self {
            objects,
            nodes,
            root,
            bounds,
        }
    }

    /// Build the node covering `bounds` over `prims`; children are
    /// appended before their parent, so the returned index is the
    /// node's own arena slot.
    fn build_node(
        nodes: &mut Vec<OctreeNode>,
        boxes: &[Aabb],
        bounds: Aabb,
        prims: Vec<u32>,
        depth: usize,
    ) -> u32 {
        let center = bounds.centroid();

        if prims.len() <= LEAF_MAX_SIZE || depth >= MAX_DEPTH {
            nodes.push(OctreeNode {
                bounds,
                center,
                kind: OctreeNodeKind::Leaf(prims),
            });
            return (nodes.len() - 1) as u32;
        }

        // Distribute each primitive into every octant one of its box
        // corners selects; the mask deduplicates per child.
        let mut sets: [Vec<u32>; 8] = Default::default();
        for &index in &prims {
            let b = &boxes[index as usize];
            let mut mask = 0u8;
            for corner in 0..8u8 {
                let p = Vec3::new(
                    if corner & 4 != 0 { b.max.x } else { b.min.x },
                    if corner & 2 != 0 { b.max.y } else { b.min.y },
                    if corner & 1 != 0 { b.max.z } else { b.min.z },
                );
                mask |= 1 << octant_index(p, center);
            }
            for oct in 0..8 {
                if mask & (1 << oct) != 0 {
                    sets[oct as usize].push(index);
                }
            }
        }

        let mut children = [0u32; 8];
        for (oct, set) in sets.into_iter().enumerate() {
            let child_bounds = octant_bounds(&bounds, center, oct as u8);
            children[oct] = Self::build_node(nodes, boxes, child_bounds, set, depth + 1);
        }

        nodes.push(OctreeNode {
            bounds,
            center,
            kind: OctreeNodeKind::Interior(children),
        });
        (nodes.len() - 1) as u32
    }

    /// Mirror the ray into the all-positive-direction octant, returning
    /// the mirrored origin, the flip mask, and the root span.
    fn root_span(&self, ray: &Ray) -> (Vec3, u8, Span) {
        let b = &self.bounds;
        let mut o = ray.origin;
        let mut d = ray.direction;
        let mut flip = 0u8;

        if d.x < 0.0 {
            o.x = b.min.x + b.max.x - o.x;
            d.x = -d.x;
            flip |= 4;
        }
        if d.y < 0.0 {
            o.y = b.min.y + b.max.y - o.y;
            d.y = -d.y;
            flip |= 2;
        }
        if d.z < 0.0 {
            o.z = b.min.z + b.max.z - o.z;
            d.z = -d.z;
            flip |= 1;
        }

        let inv = Vec3::new(
            1.0 / d.x.max(TINY_DIR),
            1.0 / d.y.max(TINY_DIR),
            1.0 / d.z.max(TINY_DIR),
        );

        let root = span(
            (b.min.x - o.x) * inv.x,
            (b.min.y - o.y) * inv.y,
            (b.min.z - o.z) * inv.z,
            (b.max.x - o.x) * inv.x,
            (b.max.y - o.y) * inv.y,
            (b.max.z - o.z) * inv.z,
        );

        (o, flip, root)
    }

    #[allow(clippy::too_many_arguments)]
    fn nearest_subtree(
        &self,
        index: u32,
        sp: Span,
        flip: u8,
        mirrored_origin: Vec3,
        ray: &Ray,
        ray_t: Interval,
        mailbox: &mut Mailbox,
        rec: &mut HitRecord,
        closest: &mut f32,
        hit_anything: &mut bool,
    ) {
        // Node behind the origin, past the interval, or already beaten
        // by a closer hit.
        if sp.tx1 < 0.0 || sp.ty1 < 0.0 || sp.tz1 < 0.0 {
            return;
        }
        if sp.exit() < ray_t.min || sp.entry() > *closest {
            return;
        }

        let node = &self.nodes[index as usize];
        match &node.kind {
            OctreeNodeKind::Leaf(prims) => {
                for &prim in prims {
                    if !mailbox.visit(prim as usize) {
                        continue;
                    }
                    let object = &self.objects[prim as usize];
                    let interval = Interval::new(ray_t.min, *closest);
                    if object.hit(ray, interval, rec) {
                        *hit_anything = true;
                        *closest = rec.t;
                        rec.primitive = Some(Arc::clone(object));
                    }
                }
            }
            OctreeNodeKind::Interior(children) => {
                let txm = mid_param(sp.tx0, sp.tx1, mirrored_origin.x, node.center.x);
                let tym = mid_param(sp.ty0, sp.ty1, mirrored_origin.y, node.center.y);
                let tzm = mid_param(sp.tz0, sp.tz1, mirrored_origin.z, node.center.z);

                let mut curr = first_node(sp.tx0, sp.ty0, sp.tz0, txm, tym, tzm);
                while curr < EXIT {
                    let (sub, on_x, on_y, on_z) = sp.octant(curr, txm, tym, tzm);
                    // Mirrored octant code -> actual child slot
                    let child = children[(curr ^ flip) as usize];
                    self.nearest_subtree(
                        child,
                        sub,
                        flip,
                        mirrored_origin,
                        ray,
                        ray_t,
                        mailbox,
                        rec,
                        closest,
                        hit_anything,
                    );
                    curr = next_node(sub.tx1, sub.ty1, sub.tz1, on_x, on_y, on_z);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn any_subtree(
        &self,
        index: u32,
        sp: Span,
        flip: u8,
        mirrored_origin: Vec3,
        ray: &Ray,
        ray_t: Interval,
        mailbox: &mut Mailbox,
    ) -> bool {
        if sp.tx1 < 0.0 || sp.ty1 < 0.0 || sp.tz1 < 0.0 {
            return false;
        }
        if sp.exit() < ray_t.min || sp.entry() > ray_t.max {
            return false;
        }

        let node = &self.nodes[index as usize];
        match &node.kind {
            OctreeNodeKind::Leaf(prims) => {
                for &prim in prims {
                    if mailbox.visit(prim as usize)
                        && self.objects[prim as usize].hit_any(ray, ray_t)
                    {
                        return true;
                    }
                }
                false
            }
            OctreeNodeKind::Interior(children) => {
                let txm = mid_param(sp.tx0, sp.tx1, mirrored_origin.x, node.center.x);
                let tym = mid_param(sp.ty0, sp.ty1, mirrored_origin.y, node.center.y);
                let tzm = mid_param(sp.tz0, sp.tz1, mirrored_origin.z, node.center.z);

                let mut curr = first_node(sp.tx0, sp.ty0, sp.tz0, txm, tym, tzm);
                while curr < EXIT {
                    let (sub, on_x, on_y, on_z) = sp.octant(curr, txm, tym, tzm);
                    let child = children[(curr ^ flip) as usize];
                    if self.any_subtree(child, sub, flip, mirrored_origin, ray, ray_t, mailbox) {
                        return true;
                    }
                    curr = next_node(sub.tx1, sub.ty1, sub.tz1, on_x, on_y, on_z);
                }
                false
            }
        }
    }

    /// Check the spatial invariants of the built tree: children tile
    /// their parent, and every registered primitive overlaps its cell
    /// and is reachable through at least one leaf.
    #[cfg(test)]
    fn validate_structure(&self) {
        let mut reachable = vec![false; self.objects.len()];
        for node in &self.nodes {
            match &node.kind {
                OctreeNodeKind::Leaf(prims) => {
                    for &prim in prims {
                        assert!(node
                            .bounds
                            .overlaps(&self.objects[prim as usize].bounding_box()));
                        reachable[prim as usize] = true;
                    }
                }
                OctreeNodeKind::Interior(children) => {
                    for &child in children {
                        assert!(node.bounds.contains_box(&self.nodes[child as usize].bounds));
                    }
                }
            }
        }
        assert!(reachable.iter().all(|&r| r), "unreachable primitive");
    }
}

impl RayAccelerator for OctreeAccelerator {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let (mirrored_origin, flip, root) = self.root_span(ray);
        if root.entry() >= root.exit() {
            return false;
        }

        let mut mailbox = Mailbox::new(self.objects.len());
        let mut closest = ray_t.max;
        let mut hit_anything = false;
        self.nearest_subtree(
            self.root,
            root,
            flip,
            mirrored_origin,
            ray,
            ray_t,
            &mut mailbox,
            rec,
            &mut closest,
            &mut hit_anything,
        );

        hit_anything
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let (mirrored_origin, flip, root) = self.root_span(ray);
        if root.entry() >= root.exit() {
            return false;
        }

        let mut mailbox = Mailbox::new(self.objects.len());
        self.any_subtree(
            self.root,
            root,
            flip,
            mirrored_origin,
            ray,
            ray_t,
            &mut mailbox,
        )
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

    fn sphere(center: Vec3, radius: f32) -> Arc<dyn Primitive> {
        Arc::new(Sphere::new(center, radius, Arc::new(Material::default())))
    }

    fn sphere_cloud() -> Vec<Arc<dyn Primitive>> {
        let mut objects = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    objects.push(sphere(
                        Vec3::new(x as f32 * 3.0, y as f32 * 3.0, z as f32 * 3.0),
                        0.6,
                    ));
                }
            }
        }
        objects
    }

    #[test]
    fn test_octree_empty() {
        let octree = OctreeAccelerator::new(vec![]);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let mut rec = HitRecord::default();
        assert!(!octree.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!(rec.is_miss());
        assert!(!octree.hit_any(&ray, Interval::new(0.001, f32::INFINITY)));
    }

    #[test]
    fn test_octree_structure_invariants() {
        let octree = OctreeAccelerator::new(sphere_cloud());
        octree.validate_structure();
        assert!(matches!(
            octree.nodes[octree.root as usize].kind,
            OctreeNodeKind::Interior(_)
        ));
    }

    #[test]
    fn test_octree_single_sphere_all_directions() {
        let octree = OctreeAccelerator::new(vec![sphere(Vec3::ZERO, 1.0)]);
        let interval = Interval::new(0.001, f32::INFINITY);

        // Axis-aligned rays from all six sides, exercising every flip mask
        let probes = [
            (Vec3::new(-5.0, 0.0, 0.0), Vec3::X),
            (Vec3::new(5.0, 0.0, 0.0), -Vec3::X),
            (Vec3::new(0.0, -5.0, 0.0), Vec3::Y),
            (Vec3::new(0.0, 5.0, 0.0), -Vec3::Y),
            (Vec3::new(0.0, 0.0, -5.0), Vec3::Z),
            (Vec3::new(0.0, 0.0, 5.0), -Vec3::Z),
        ];
        for (origin, direction) in probes {
            let ray = Ray::new(origin, direction);
            let mut rec = HitRecord::default();
            assert!(octree.hit(&ray, interval, &mut rec), "miss from {origin}");
            assert!((rec.t - 4.0).abs() < 0.001);
            assert!(octree.hit_any(&ray, interval));
        }
    }

    #[test]
    fn test_octree_nearest_with_negative_direction() {
        let near = sphere(Vec3::new(0.0, 0.0, 2.0), 0.5);
        let far = sphere(Vec3::new(0.0, 0.0, -6.0), 0.5);
        let octree = OctreeAccelerator::new(vec![Arc::clone(&far), Arc::clone(&near)]);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 8.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(octree.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 5.5).abs() < 0.001);
        assert!(Arc::ptr_eq(rec.primitive.as_ref().unwrap(), &near));
    }

    #[test]
    fn test_octree_zero_direction_component() {
        let octree = OctreeAccelerator::new(sphere_cloud());

        // Purely axis-aligned ray through the middle of the cloud
        let ray = Ray::new(Vec3::new(-5.0, 3.0, 3.0), Vec3::new(1.0, 0.0, 0.0));
        let mut rec = HitRecord::default();
        assert!(octree.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));

        // First sphere along that row sits at x=0, radius 0.6
        assert!((rec.t - 4.4).abs() < 0.001);
    }

    #[test]
    fn test_octree_agrees_with_list() {
        let objects = sphere_cloud();
        let list = ListAccelerator::new(objects.clone());
        let octree = OctreeAccelerator::new(objects);
        let interval = Interval::new(0.001, f32::INFINITY);

        for i in 0..60 {
            let s = i as f32 * 0.37;
            let origin = Vec3::new(-4.0 + s.sin() * 2.0, 12.0, -3.0 + s.cos() * 2.0);
            let target = Vec3::new(s.cos() * 5.0 + 4.0, 4.0, s.sin() * 5.0 + 4.0);
            let ray = Ray::new(origin, target - origin);

            let mut rec_list = HitRecord::default();
            let mut rec_oct = HitRecord::default();
            let hit_list = list.hit(&ray, interval, &mut rec_list);
            let hit_oct = octree.hit(&ray, interval, &mut rec_oct);

            assert_eq!(hit_list, hit_oct, "ray {i} disagreed");
            assert_eq!(list.hit_any(&ray, interval), octree.hit_any(&ray, interval));
            if hit_list {
                assert!((rec_list.t - rec_oct.t).abs() < 1e-3);
                assert!(Arc::ptr_eq(
                    rec_list.primitive.as_ref().unwrap(),
                    rec_oct.primitive.as_ref().unwrap()
                ));
            }
        }
    }

    #[test]
    fn test_octree_boundary_primitive_found_from_both_sides() {
        // Sphere centered exactly on the midplane of a populated domain
        let mut objects = sphere_cloud();
        let boundary = sphere(Vec3::new(4.5, 4.5, 4.5), 1.0);
        objects.push(Arc::clone(&boundary));
        let octree = OctreeAccelerator::new(objects);
        let interval = Interval::new(0.001, f32::INFINITY);

        for direction in [Vec3::X, -Vec3::X] {
            let origin = Vec3::new(4.5, 4.5, 4.5) - direction * 2.0;
            let ray = Ray::new(origin, direction);
            let mut rec = HitRecord::default();
            assert!(octree.hit(&ray, interval, &mut rec));
            assert!((rec.t - 1.0).abs() < 0.001);
            assert!(Arc::ptr_eq(rec.primitive.as_ref().unwrap(), &boundary));
        }
    }
}

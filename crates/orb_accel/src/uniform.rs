//! Uniform grid acceleration structure.
//!
//! The primitive set's bounding box is divided into a fixed
//! `GRID_SIZE`^3 lattice of cells, each holding the indices of every
//! primitive whose box overlaps it. Queries walk the cells the ray
//! pierces with a 3D-DDA: step along whichever axis has the nearest
//! upcoming cell boundary, testing each cell's primitives through the
//! query mailbox.

use std::sync::Arc;

use log::debug;
use orb_math::{Aabb, Interval, Ray, Vec3};

use crate::{HitRecord, Mailbox, Primitive, RayAccelerator};

/// Cells per axis.
const GRID_SIZE: usize = 16;

/// Uniform grid accelerator over an immutable primitive list.
pub struct UniformAccelerator {
    objects: Vec<Arc<dyn Primitive>>,
    bounds: Aabb,
    cell_size: Vec3,
    /// `GRID_SIZE`^3 cells of primitive indices, deduplicated per cell.
    cells: Vec<Vec<u32>>,
}

#[inline]
fn cell_slot(ix: i32, iy: i32, iz: i32) -> usize {
    debug_assert!(
        (0..GRID_SIZE as i32).contains(&ix)
            && (0..GRID_SIZE as i32).contains(&iy)
            && (0..GRID_SIZE as i32).contains(&iz),
        "cell index out of range"
    );
    ((iz as usize * GRID_SIZE) + iy as usize) * GRID_SIZE + ix as usize
}

impl UniformAccelerator {
    /// Build from a primitive list. An empty list yields an empty
    /// structure that reports no hits.
    pub fn new(objects: Vec<Arc<dyn Primitive>>) -> Self {
        let bounds = objects.iter().fold(Aabb::EMPTY, |mut acc, obj| {
            acc.include(&obj.bounding_box());
            acc
        });

        let cell_size = if bounds.is_empty() {
            Vec3::ONE
        } else {
            bounds.size() / GRID_SIZE as f32
        };

        let mut cells = vec![Vec::new(); GRID_SIZE * GRID_SIZE * GRID_SIZE];
        if !bounds.is_empty() {
            for (index, object) in objects.iter().enumerate() {
                let b = object.bounding_box();
                // Covered cell range per axis; a box on a cell boundary
                // lands in both adjoining cells, and range insertion
                // cannot register a primitive twice in one cell.
                let lo = Self::cell_coords(&bounds, cell_size, b.min);
                let hi = Self::cell_coords(&bounds, cell_size, b.max);
                for iz in lo[2]..=hi[2] {
                    for iy in lo[1]..=hi[1] {
                        for ix in lo[0]..=hi[0] {
                            cells[cell_slot(ix, iy, iz)].push(index as u32);
                        }
                    }
                }
            }
        }

        debug!(
            "built uniform grid: {} primitives, {}^3 cells, {} references",
            objects.len(),
            GRID_SIZE,
            cells.iter().map(|c| c.len()).sum::<usize>()
        );

        Self {
            objects,
            bounds,
            cell_size,
            cells,
        }
    }

    /// Cell coordinates of a point, clamped into the grid.
    fn cell_coords(bounds: &Aabb, cell_size: Vec3, p: Vec3) -> [i32; 3] {
        let rel = (p - bounds.min) / cell_size;
        let max_index = GRID_SIZE as i32 - 1;
        [
            (rel.x.floor() as i32).clamp(0, max_index),
            (rel.y.floor() as i32).clamp(0, max_index),
            (rel.z.floor() as i32).clamp(0, max_index),
        ]
    }

    /// Set up the DDA walk state: starting cell, per-axis step
    /// direction, parametric distance to the next cell boundary, and
    /// parametric cell width. Returns `None` if the ray misses the
    /// domain box entirely.
    fn walk_state(&self, ray: &Ray, ray_t: Interval) -> Option<([i32; 3], [i32; 3], Vec3, Vec3)> {
        let (t_enter, _) = self.bounds.hit_range(ray, ray_t)?;
        let cell = Self::cell_coords(&self.bounds, self.cell_size, ray.at(t_enter));

        let mut step = [0i32; 3];
        let mut t_max = Vec3::splat(f32::INFINITY);
        let mut t_delta = Vec3::splat(f32::INFINITY);

        for axis in 0..3 {
            let d = ray.direction[axis];
            if d > 0.0 {
                step[axis] = 1;
                let boundary = self.bounds.min[axis] + (cell[axis] + 1) as f32 * self.cell_size[axis];
                t_max[axis] = (boundary - ray.origin[axis]) / d;
                t_delta[axis] = self.cell_size[axis] / d;
            } else if d < 0.0 {
                step[axis] = -1;
                let boundary = self.bounds.min[axis] + cell[axis] as f32 * self.cell_size[axis];
                t_max[axis] = (boundary - ray.origin[axis]) / d;
                t_delta[axis] = self.cell_size[axis] / -d;
            }
            // d == 0: the walk never advances along this axis
        }

        Some((cell, step, t_max, t_delta))
    }
}

impl RayAccelerator for UniformAccelerator {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        if self.objects.is_empty() {
            return false;
        }
        let Some((mut cell, step, mut t_max, t_delta)) = self.walk_state(ray, ray_t) else {
            return false;
        };

        let mut mailbox = Mailbox::new(self.objects.len());
        let mut hit_anything = false;
        let mut closest = ray_t.max;

        loop {
            for &prim in &self.cells[cell_slot(cell[0], cell[1], cell[2])] {
                if !mailbox.visit(prim as usize) {
                    continue;
                }
                let object = &self.objects[prim as usize];
                let interval = Interval::new(ray_t.min, closest);
                if object.hit(ray, interval, rec) {
                    hit_anything = true;
                    closest = rec.t;
                    rec.primitive = Some(Arc::clone(object));
                }
            }

            // A hit at or before the current cell's exit cannot be
            // beaten by anything in a farther cell.
            let cell_exit = t_max.min_element();
            if hit_anything && closest <= cell_exit {
                break;
            }
            if !cell_exit.is_finite() || cell_exit > closest {
                break;
            }

            // Advance along the axis with the nearest boundary
            let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
                0
            } else if t_max.y <= t_max.z {
                1
            } else {
                2
            };
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= GRID_SIZE as i32 {
                break;
            }
            t_max[axis] += t_delta[axis];
        }

        hit_anything
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        if self.objects.is_empty() {
            return false;
        }
        let Some((mut cell, step, mut t_max, t_delta)) = self.walk_state(ray, ray_t) else {
            return false;
        };

        let mut mailbox = Mailbox::new(self.objects.len());
        loop {
            for &prim in &self.cells[cell_slot(cell[0], cell[1], cell[2])] {
                if mailbox.visit(prim as usize) && self.objects[prim as usize].hit_any(ray, ray_t) {
                    return true;
                }
            }

            let cell_exit = t_max.min_element();
            if !cell_exit.is_finite() || cell_exit > ray_t.max {
                return false;
            }

            let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
                0
            } else if t_max.y <= t_max.z {
                1
            } else {
                2
            };
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= GRID_SIZE as i32 {
                return false;
            }
            t_max[axis] += t_delta[axis];
        }
    }

    fn objects(&self) -> &[Arc<dyn Primitive>] {
        &self.objects
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

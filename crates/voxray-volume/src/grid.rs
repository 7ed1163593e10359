//! Analytic field sampled on a uniform block grid.
//!
//! The grid is split into cubic blocks of `block_voxels^3` voxels. A block is
//! allocated when any of its corner or centre samples has been observed, and
//! the traversal oracle only reports allocated blocks, in ray order.

use std::marker::PhantomData;

use voxray_math::{floorf, Vec3};

use crate::ray::{Aabb3, Ray, RayInterval};
use crate::volume::{DataOf, RayTraversal, Sample, Volume};
use crate::voxel::VoxelTrait;
use crate::{Result, VolumeError};

/// A voxel lattice whose payloads come from a closure.
pub struct BlockGridVolume<V: VoxelTrait, F> {
    field: F,
    origin: Vec3,
    dims: [usize; 3],
    block_voxels: usize,
    voxel_size: f32,
    allocated: Vec<bool>,
    _voxel: PhantomData<V>,
}

impl<V, F> BlockGridVolume<V, F>
where
    V: VoxelTrait,
    F: Fn(&Vec3) -> V::Data + Sync,
{
    /// Build a grid of `dims` blocks with its minimum corner at `origin`.
    ///
    /// # Arguments
    ///
    /// * `field` - payload at a world point, evaluated at voxel centres
    /// * `block_voxels` - block edge length in voxels
    /// * `voxel_size` - voxel edge length in metres
    pub fn new(
        field: F,
        origin: Vec3,
        dims: [usize; 3],
        block_voxels: usize,
        voxel_size: f32,
    ) -> Result<Self> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(VolumeError::InvalidVoxelSize(voxel_size));
        }
        if block_voxels == 0 {
            return Err(VolumeError::EmptyBlock);
        }
        if dims.contains(&0) {
            return Err(VolumeError::EmptyGrid(dims));
        }

        let mut volume = Self {
            field,
            origin,
            dims,
            block_voxels,
            voxel_size,
            allocated: Vec::new(),
            _voxel: PhantomData,
        };

        let count = dims[0] * dims[1] * dims[2];
        let allocated = (0..count)
            .map(|i| {
                let b = [
                    i % dims[0],
                    (i / dims[0]) % dims[1],
                    i / (dims[0] * dims[1]),
                ];
                volume.block_observed(b)
            })
            .collect();
        volume.allocated = allocated;

        Ok(volume)
    }

    /// World-space bounds of the grid.
    pub fn bounds(&self) -> Aabb3 {
        let extent = Vec3::new(
            self.dims[0] as f32,
            self.dims[1] as f32,
            self.dims[2] as f32,
        ) * self.block_size();
        Aabb3::new(self.origin, self.origin + extent)
    }

    /// Voxel edge length.
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Block edge length in metres.
    pub fn block_size(&self) -> f32 {
        self.voxel_size * self.block_voxels as f32
    }

    /// Number of allocated blocks.
    pub fn allocated_blocks(&self) -> usize {
        self.allocated.iter().filter(|&&a| a).count()
    }

    fn block_observed(&self, b: [usize; 3]) -> bool {
        let size = self.block_size();
        let min = self.origin + Vec3::new(b[0] as f32, b[1] as f32, b[2] as f32) * size;
        let centre = min + Vec3::repeat(0.5 * size);
        (0..8)
            .map(|n| {
                min + Vec3::new(
                    (n & 1) as f32 * size,
                    ((n >> 1) & 1) as f32 * size,
                    ((n >> 2) & 1) as f32 * size,
                )
            })
            .chain(std::iter::once(centre))
            .any(|p| V::weight(&(self.field)(&p)) > 0.0)
    }

    fn is_allocated(&self, cell: [i64; 3]) -> bool {
        let inside = (0..3).all(|a| cell[a] >= 0 && (cell[a] as usize) < self.dims[a]);
        if !inside {
            return false;
        }
        let [x, y, z] = cell.map(|c| c as usize);
        self.allocated[x + self.dims[0] * (y + self.dims[1] * z)]
    }

    /// Payload of the voxel at lattice coordinates `v`, empty outside.
    fn voxel(&self, v: [i64; 3]) -> V::Data {
        let extent = (0..3).all(|a| v[a] >= 0 && (v[a] as usize) < self.dims[a] * self.block_voxels);
        if !extent {
            return V::EMPTY;
        }
        let centre = self.origin
            + Vec3::new(v[0] as f32 + 0.5, v[1] as f32 + 0.5, v[2] as f32 + 0.5) * self.voxel_size;
        (self.field)(&centre)
    }
}

impl<V, F> Volume for BlockGridVolume<V, F>
where
    V: VoxelTrait,
    F: Fn(&Vec3) -> V::Data + Sync,
{
    type Voxel = V;
    type Traversal<'a>
        = BlockTraversal<'a, V, F>
    where
        Self: 'a;

    fn interp<P>(&self, point: &Vec3, project: P) -> Sample
    where
        P: Fn(&DataOf<Self>) -> f32,
    {
        let g = (point - self.origin) / self.voxel_size - Vec3::repeat(0.5);
        let base = floorf(&g);
        let f = g - base;
        let b = [base.x as i64, base.y as i64, base.z as i64];

        let mut valid = true;
        let mut c = [0.0f32; 8];
        for (n, value) in c.iter_mut().enumerate() {
            let data = self.voxel([
                b[0].saturating_add((n & 1) as i64),
                b[1].saturating_add(((n >> 1) & 1) as i64),
                b[2].saturating_add(((n >> 2) & 1) as i64),
            ]);
            valid &= V::weight(&data) > 0.0;
            *value = project(&data);
        }

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let y0 = lerp(lerp(c[0], c[1], f.x), lerp(c[2], c[3], f.x), f.y);
        let y1 = lerp(lerp(c[4], c[5], f.x), lerp(c[6], c[7], f.x), f.y);

        Sample {
            value: lerp(y0, y1, f.z),
            scale: 0,
            valid,
        }
    }

    fn grad<P>(&self, point: &Vec3, scale: u8, project: P) -> Vec3
    where
        P: Fn(&DataOf<Self>) -> f32,
    {
        let h = self.voxel_size * (1u32 << scale.min(16)) as f32;
        let mut gradient = Vec3::zeros();
        for axis in 0..3 {
            let mut offset = Vec3::zeros();
            offset[axis] = h;
            let ahead = self.interp(&(point + offset), &project).value;
            let behind = self.interp(&(point - offset), &project).value;
            gradient[axis] = (ahead - behind) / (2.0 * h);
        }
        gradient
    }

    fn get(&self, point: &Vec3) -> DataOf<Self> {
        let v = floorf(&((point - self.origin) / self.voxel_size));
        self.voxel([v.x as i64, v.y as i64, v.z as i64])
    }

    fn traverse(&self, ray: &Ray, near: f32, far: f32) -> Self::Traversal<'_> {
        BlockTraversal::new(self, ray, near, far)
    }
}

/// 3D-DDA walk over the allocated blocks of a [`BlockGridVolume`].
pub struct BlockTraversal<'a, V: VoxelTrait, F> {
    grid: &'a BlockGridVolume<V, F>,
    cell: [i64; 3],
    step: [i64; 3],
    /// Distance along the ray to the next block boundary per axis
    t_max: [f32; 3],
    /// Distance along the ray to cross exactly one block per axis
    t_delta: [f32; 3],
    t: f32,
    t_end: f32,
    done: bool,
}

impl<'a, V, F> BlockTraversal<'a, V, F>
where
    V: VoxelTrait,
    F: Fn(&Vec3) -> V::Data + Sync,
{
    fn new(grid: &'a BlockGridVolume<V, F>, ray: &Ray, near: f32, far: f32) -> Self {
        let mut traversal = Self {
            grid,
            cell: [0; 3],
            step: [0; 3],
            t_max: [f32::INFINITY; 3],
            t_delta: [f32::INFINITY; 3],
            t: near,
            t_end: far,
            done: true,
        };

        let Some((t0, t1)) = ray.intersect_aabb(&grid.bounds()) else {
            return traversal;
        };
        let t_start = t0.max(near);
        let t_end = t1.min(far);
        if t_start >= t_end {
            return traversal;
        }

        let size = grid.block_size();
        let entry = ray.at(t_start) - grid.origin;
        for axis in 0..3 {
            let last = grid.dims[axis] as i64 - 1;
            let cell = ((entry[axis] / size).floor() as i64).clamp(0, last);
            let d = ray.direction[axis];
            traversal.cell[axis] = cell;
            if d > 0.0 {
                let boundary = grid.origin[axis] + (cell + 1) as f32 * size;
                traversal.step[axis] = 1;
                traversal.t_max[axis] = (boundary - ray.origin[axis]) / d;
                traversal.t_delta[axis] = size / d;
            } else if d < 0.0 {
                let boundary = grid.origin[axis] + cell as f32 * size;
                traversal.step[axis] = -1;
                traversal.t_max[axis] = (boundary - ray.origin[axis]) / d;
                traversal.t_delta[axis] = -size / d;
            }
        }

        traversal.t = t_start;
        traversal.t_end = t_end;
        traversal.done = false;
        traversal
    }
}

impl<V, F> Iterator for BlockTraversal<'_, V, F>
where
    V: VoxelTrait,
    F: Fn(&Vec3) -> V::Data + Sync,
{
    type Item = RayInterval;

    fn next(&mut self) -> Option<RayInterval> {
        while !self.done {
            let cell = self.cell;
            let enter = self.t;
            let axis = (0..3)
                .min_by(|&a, &b| self.t_max[a].total_cmp(&self.t_max[b]))
                .unwrap_or(0);
            let exit = self.t_max[axis].min(self.t_end);

            self.t = exit;
            self.t_max[axis] += self.t_delta[axis];
            self.cell[axis] += self.step[axis];

            let outside =
                self.cell[axis] < 0 || self.cell[axis] as usize >= self.grid.dims[axis];
            if exit >= self.t_end || outside {
                self.done = true;
            }
            if exit > enter && self.grid.is_allocated(cell) {
                return Some(RayInterval { tmin: enter, tmax: exit });
            }
        }
        None
    }
}

impl<V, F> RayTraversal for BlockTraversal<'_, V, F>
where
    V: VoxelTrait,
    F: Fn(&Vec3) -> V::Data + Sync,
{
    fn t_far(&self) -> f32 {
        self.t_end
    }
}

//! The read-only query interface the render kernels consume.

use voxray_math::Vec3;

use crate::ray::{Ray, RayInterval};
use crate::voxel::VoxelTrait;

/// Raw payload type of a volume.
pub type DataOf<V> = <<V as Volume>::Voxel as VoxelTrait>::Data;

/// Interpolated field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Interpolated value of the projected channel.
    pub value: f32,
    /// Resolution level the value was resolved at (0 = finest).
    pub scale: u8,
    /// False when the interpolation support touched unobserved voxels.
    pub valid: bool,
}

/// Ordered walk over the index cells a ray intersects.
///
/// Intervals are yielded by increasing distance.
pub trait RayTraversal: Iterator<Item = RayInterval> {
    /// Far bound of the whole traversal: where the ray leaves the index,
    /// clipped to the far plane.
    fn t_far(&self) -> f32;
}

/// A volumetric map as seen by the renderer.
///
/// Implementations must be safe to query concurrently; kernels share one
/// reference across all worker threads and never mutate it.
pub trait Volume: Sync {
    /// Voxel payload and sign convention.
    type Voxel: VoxelTrait;

    /// Traversal oracle over the map's spatial index.
    type Traversal<'a>: RayTraversal
    where
        Self: 'a;

    /// Interpolate the channel selected by `project` at `point`.
    fn interp<P>(&self, point: &Vec3, project: P) -> Sample
    where
        P: Fn(&DataOf<Self>) -> f32;

    /// Gradient of the channel selected by `project` at `point`, using the
    /// stencil of resolution level `scale`. Not normalised.
    fn grad<P>(&self, point: &Vec3, scale: u8, project: P) -> Vec3
    where
        P: Fn(&DataOf<Self>) -> f32;

    /// Raw payload of the voxel containing `point`.
    fn get(&self, point: &Vec3) -> DataOf<Self>;

    /// Walk the index cells `ray` intersects between `near` and `far`.
    fn traverse(&self, ray: &Ray, near: f32, far: f32) -> Self::Traversal<'_>;
}

#![warn(missing_docs)]

//! Volume capability contract for the voxray renderer.
//!
//! The renderer never owns or mutates a map. It only queries it through the
//! [`Volume`] trait: point interpolation, gradients, raw voxel fetches, and a
//! traversal oracle that yields the index cells a ray passes through.
//!
//! # Architecture
//!
//! - [`VoxelTrait`] / [`VoxelKind`] - payload type and sign convention of a map
//! - [`Volume`] - the read-only query interface consumed by the kernels
//! - [`Ray`] / [`RayInterval`] - rays and the intervals traversal yields
//! - [`BlockGridVolume`] - an analytic field sampled on a uniform block grid
//!
//! # Example
//!
//! ```
//! use voxray_math::Vec3;
//! use voxray_volume::{BlockGridVolume, Ray, Sdf, Volume, VoxelData};
//!
//! let sphere = |p: &Vec3| VoxelData {
//!     x: ((p - Vec3::repeat(0.5)).norm() - 0.25).clamp(-0.1, 0.1) / 0.1,
//!     y: 1.0,
//! };
//! let volume = BlockGridVolume::<Sdf, _>::new(sphere, Vec3::zeros(), [4, 4, 4], 8, 1.0 / 32.0).unwrap();
//!
//! let ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::z());
//! let first = volume.traverse(&ray, 0.1, 4.0).next();
//! assert!(first.is_some());
//! ```

mod grid;
mod ray;
mod volume;
mod voxel;

pub use grid::{BlockGridVolume, BlockTraversal};
pub use ray::{Aabb3, Ray, RayInterval};
pub use volume::{DataOf, RayTraversal, Sample, Volume};
pub use voxel::{MultiresSdf, Occupancy, Sdf, VoxelData, VoxelKind, VoxelTrait};

use thiserror::Error;

/// Errors from constructing a volume.
#[derive(Debug, Clone, Error)]
pub enum VolumeError {
    /// Voxel size is zero, negative or not finite.
    #[error("invalid voxel size: {0}")]
    InvalidVoxelSize(f32),

    /// Block edge length in voxels is zero.
    #[error("block must span at least one voxel")]
    EmptyBlock,

    /// Grid has a zero extent along some axis.
    #[error("grid dimensions must be non-zero: {0:?}")]
    EmptyGrid([usize; 3]),
}

/// Result type for volume operations.
pub type Result<T> = std::result::Result<T, VolumeError>;

#![warn(missing_docs)]

//! Raycasting, shading and visualization kernels for volumetric maps.
//!
//! Every kernel is a synchronous data-parallel loop over image rows. Pixels
//! are written independently, so results do not depend on the number of
//! worker threads. Misses and degenerate geometry are reported through
//! sentinel pixel values rather than errors; the only errors are
//! inconsistent buffer sizes, caught before any pixel is touched.
//!
//! # Example
//!
//! ```
//! use voxray_math::{raycast_view, Mat4, Vec3, Vec4};
//! use voxray_render::{raycast_kernel, render_cached_kernel, Image, RenderSettings};
//! use voxray_volume::{BlockGridVolume, Sdf, VoxelData};
//!
//! let sphere = |p: &Vec3| VoxelData {
//!     x: (((p - Vec3::repeat(0.5)).norm() - 0.25) / 0.1).clamp(-1.0, 1.0),
//!     y: 1.0,
//! };
//! let volume = BlockGridVolume::<Sdf, _>::new(sphere, Vec3::zeros(), [4, 4, 4], 8, 1.0 / 32.0)?;
//!
//! let settings = RenderSettings::default();
//! let mut pose = Mat4::identity();
//! pose[(0, 3)] = 0.5;
//! pose[(1, 3)] = 0.5;
//! pose[(2, 3)] = -0.6;
//! let view = raycast_view(&pose, &Vec4::new(40.0, 40.0, 16.0, 12.0));
//!
//! let mut vertex = Image::new(32, 24);
//! let mut normal = Image::new(32, 24);
//! let mut scales = Image::new(32, 24);
//! raycast_kernel(&volume, &mut vertex, &mut normal, &mut scales, &view, &settings.raycast_params())?;
//!
//! let mut rgba = Image::new(32, 24);
//! render_cached_kernel(&mut rgba, &vertex, &normal, &scales, &settings.lighting())?;
//! assert_eq!(rgba[(16, 12)][3], 255);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color;
pub mod error;
pub mod image;
pub mod raycast;
pub mod settings;
pub mod shade;
pub mod visualize;

pub use color::{gs2rgb, palette_color, Rgba, TrackData, TrackStatus, PALETTE};
pub use error::{RenderError, Result};
pub use image::{Image, RgbaImage};
pub use raycast::{
    cast_pixel, invalid_normal, is_valid_normal, ray_from_pixel, raycast, raycast_full,
    raycast_kernel, surface_normal, Hit, INVALID,
};
pub use settings::{Lighting, RaycastParams, RenderSettings};
pub use shade::{render_cached_kernel, render_volume_kernel, shade};
pub use visualize::{render_depth_kernel, render_normals_kernel, render_track_kernel};

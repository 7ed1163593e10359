//! Per-pixel visualization of depth, tracking and normal maps.

use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use voxray_math::Vec3;

use crate::color::{gs2rgb, TrackData, TrackStatus};
use crate::error::Result;
use crate::image::{Image, RgbaImage};
use crate::raycast::is_valid_normal;

/// Colour a depth map.
///
/// Depths below `near_plane` are transparent white, depths beyond
/// `far_plane` transparent black. Depths in `[near_plane, far_plane]` go
/// through [`gs2rgb`] after mapping linearly onto `[0, 1]`.
pub fn render_depth_kernel(
    out: &mut RgbaImage,
    depth: &Image<f32>,
    near_plane: f32,
    far_plane: f32,
) -> Result<()> {
    out.ensure_same_size(depth, "depth image")?;

    let start = Instant::now();
    let range_scale = 1.0 / (far_plane - near_plane);

    out.par_rows_mut()
        .zip(depth.as_slice().par_chunks(depth.width().max(1)))
        .for_each(|(row, depth_row)| {
            for (px, &d) in row.iter_mut().zip(depth_row) {
                *px = if d < near_plane {
                    [255, 255, 255, 0]
                } else if d > far_plane {
                    [0, 0, 0, 0]
                } else {
                    gs2rgb((d - near_plane) * range_scale)
                };
            }
        });

    debug!("render_depth_kernel: {} pixels in {:?}", out.len(), start.elapsed());
    Ok(())
}

/// Colour a tracking result map, one flat colour per result code.
pub fn render_track_kernel(out: &mut RgbaImage, data: &Image<TrackData>) -> Result<()> {
    out.ensure_same_size(data, "track image")?;

    let start = Instant::now();

    out.par_rows_mut()
        .zip(data.as_slice().par_chunks(data.width().max(1)))
        .for_each(|(row, data_row)| {
            for (px, track) in row.iter_mut().zip(data_row) {
                *px = TrackStatus::from_code(track.result).color();
            }
        });

    debug!("render_track_kernel: {} pixels in {:?}", out.len(), start.elapsed());
    Ok(())
}

/// Colour a normal map as `(n / 2 + 0.5) * 255`, opaque.
///
/// Invalid normals render opaque black.
pub fn render_normals_kernel(out: &mut RgbaImage, normal: &Image<Vec3>) -> Result<()> {
    out.ensure_same_size(normal, "normal image")?;

    let start = Instant::now();

    out.par_rows_mut()
        .zip(normal.as_slice().par_chunks(normal.width().max(1)))
        .for_each(|(row, normal_row)| {
            for (px, n) in row.iter_mut().zip(normal_row) {
                *px = if is_valid_normal(n) {
                    let c = (n / 2.0).add_scalar(0.5) * 255.0;
                    [c.x as u8, c.y as u8, c.z as u8, 255]
                } else {
                    [0, 0, 0, 255]
                };
            }
        });

    debug!("render_normals_kernel: {} pixels in {:?}", out.len(), start.elapsed());
    Ok(())
}

//! Lambertian shading of raycast surfaces.

use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use voxray_math::{clamp_vec3, Mat4, Vec3};
use voxray_volume::Volume;

use crate::color::{palette_color, Rgba};
use crate::error::Result;
use crate::image::{Image, RgbaImage};
use crate::raycast::{cast_pixel, invalid_normal, is_valid_normal, surface_normal};
use crate::settings::{Lighting, RaycastParams};

/// Opaque black, written where there is no surface.
const BACKGROUND: Rgba = [0, 0, 0, 255];

/// Shade one surface point.
///
/// Invalid or zero-length normals give the opaque black background.
/// Otherwise the Lambertian term `max(0, n . normalize(position - light))`
/// plus ambient is clamped to `[0, 1]` and tinted by the palette entry of
/// `scale`.
pub fn shade(position: &Vec3, normal: &Vec3, scale: u8, lighting: &Lighting) -> Rgba {
    if !is_valid_normal(normal) {
        return BACKGROUND;
    }

    let diff = (position - lighting.light).normalize();
    let intensity = normal.normalize().dot(&diff).max(0.0);
    let mut col = Vec3::repeat(intensity) + lighting.ambient;
    clamp_vec3(&mut col, &Vec3::zeros(), &Vec3::repeat(1.0));
    let col = col.component_mul(&palette_color(scale));

    [col.x as u8, col.y as u8, col.z as u8, 255]
}

/// Raycast and shade every pixel in one pass.
pub fn render_volume_kernel<V: Volume>(
    volume: &V,
    out: &mut RgbaImage,
    view: &Mat4,
    params: &RaycastParams,
    lighting: &Lighting,
) -> Result<()> {
    let start = Instant::now();

    out.par_rows_mut().enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            *px = match cast_pixel(volume, view, x, y, params) {
                Some(hit) => {
                    let normal = surface_normal(volume, &hit).unwrap_or_else(invalid_normal);
                    shade(&hit.position, &normal, hit.scale, lighting)
                }
                None => BACKGROUND,
            };
        }
    });

    debug!("render_volume_kernel: {} pixels in {:?}", out.len(), start.elapsed());
    Ok(())
}

/// Shade vertex and normal maps produced earlier by
/// [`crate::raycast_kernel`], without touching the volume.
pub fn render_cached_kernel(
    out: &mut RgbaImage,
    vertex: &Image<Vec3>,
    normal: &Image<Vec3>,
    scales: &Image<u8>,
    lighting: &Lighting,
) -> Result<()> {
    out.ensure_same_size(vertex, "vertex image")?;
    out.ensure_same_size(normal, "normal image")?;
    out.ensure_same_size(scales, "scale image")?;

    let start = Instant::now();
    let width = out.width();

    out.par_rows_mut().enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            let i = x + y * width;
            *px = shade(&vertex[i], &normal[i], scales[i], lighting);
        }
    });

    debug!("render_cached_kernel: {} pixels in {:?}", out.len(), start.elapsed());
    Ok(())
}

//! First-hit and all-hits raycasting through a volume.
//!
//! Both engines march along a ray, bracket a sign change of the field and
//! refine the crossing by linear interpolation between the two bracketing
//! samples. Fields are handled on the sign-normalised value
//! `g = sign * f`, positive in free space, so the same march serves
//! signed-distance and occupancy maps.

use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;
use voxray_math::{to_rotation, to_translation, Mat4, Vec3, Vec4};
use voxray_volume::{Ray, RayTraversal, Volume, VoxelTrait};

use crate::error::Result;
use crate::image::Image;
use crate::settings::RaycastParams;

/// Reserved x-component marking a normal as invalid.
pub const INVALID: f32 = -2.0;

/// Normalised field value below which marching drops to the fine step.
const NEAR_SURFACE: f32 = 0.8;

/// Largest field jump across a bracket still accepted as a surface by
/// [`raycast_full`].
const MAX_BRACKET_JUMP: f32 = 0.5;

/// The invalid-normal sentinel.
#[inline]
pub fn invalid_normal() -> Vec3 {
    Vec3::new(INVALID, 0.0, 0.0)
}

/// True unless `n` is the sentinel or has zero length.
#[inline]
pub fn is_valid_normal(n: &Vec3) -> bool {
    n.x != INVALID && n.norm() > 0.0
}

/// A surface crossing found by the first-hit engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// World-space position.
    pub position: Vec3,
    /// Distance along the ray.
    pub distance: f32,
    /// Resolution level the crossing was resolved at.
    pub scale: u8,
}

/// World-space ray through pixel `(x, y)`.
///
/// The direction is the view's rotation block applied to `(x, y, 1)`; the
/// origin is its translation.
pub fn ray_from_pixel(view: &Mat4, x: usize, y: usize) -> Ray {
    let dir = to_rotation(view) * Vec3::new(x as f32, y as f32, 1.0);
    Ray::new(to_translation(view), dir)
}

type Voxel<V> = <V as Volume>::Voxel;

/// Sign-normalised field sample at `p`.
///
/// Unobserved voxels keep the previous sample; signed-distance voxels
/// outside the truncation band use the raw value without interpolating.
fn sample<V: Volume>(volume: &V, p: &Vec3, previous: (f32, u8)) -> (f32, u8) {
    let kind = <Voxel<V> as VoxelTrait>::KIND;
    let sign = kind.surface_sign();

    let raw = volume.get(p);
    if <Voxel<V> as VoxelTrait>::weight(&raw) <= 0.0 {
        return previous;
    }
    let value = <Voxel<V> as VoxelTrait>::value(&raw);
    if kind.is_signed_distance() && !(value > -1.0 && value < 1.0) {
        return (sign * value, previous.1);
    }

    let s = volume.interp(p, <Voxel<V> as VoxelTrait>::value);
    if s.valid {
        (sign * s.value, s.scale)
    } else {
        (sign * value, previous.1)
    }
}

/// Step to take after observing sign-normalised value `g`.
fn step_size<V: Volume>(g: f32, params: &RaycastParams) -> f32 {
    if !<Voxel<V> as VoxelTrait>::KIND.is_signed_distance() || g < NEAR_SURFACE {
        params.step
    } else {
        (g * params.mu).max(params.large_step).max(params.step)
    }
}

/// March one ray from `t_near` to `t_far` and return the first crossing into
/// occupied space.
///
/// Rays that start inside the surface, degenerate bounds and non-positive
/// steps all yield `None`.
pub fn raycast<V: Volume>(
    volume: &V,
    origin: &Vec3,
    direction: &Vec3,
    t_near: f32,
    t_far: f32,
    params: &RaycastParams,
) -> Option<Hit> {
    if !(t_near < t_far) || !t_far.is_finite() || !(params.step > 0.0) {
        return None;
    }

    let sign = <Voxel<V> as VoxelTrait>::KIND.surface_sign();
    let empty = sign * <Voxel<V> as VoxelTrait>::value(&<Voxel<V> as VoxelTrait>::EMPTY);

    let mut t = t_near;
    let (mut g_t, mut scale) = sample(volume, &(origin + direction * t), (empty, 0));
    if g_t < 0.0 {
        return None;
    }

    loop {
        let stepsize = step_size::<V>(g_t, params);
        t += stepsize;
        if t >= t_far {
            return None;
        }

        let (g_tt, scale_tt) = sample(volume, &(origin + direction * t), (g_t, scale));
        if g_tt < 0.0 {
            let denom = g_t - g_tt;
            if denom > 0.0 {
                let distance = t + stepsize * g_tt / denom;
                return Some(Hit {
                    position: origin + direction * distance,
                    distance,
                    scale: scale_tt,
                });
            }
        }
        g_t = g_tt;
        scale = scale_tt;
    }
}

/// First hit along the ray through pixel `(x, y)`.
///
/// The march starts at the first index cell the traversal oracle reports
/// and ends where the traversal leaves the index.
pub fn cast_pixel<V: Volume>(
    volume: &V,
    view: &Mat4,
    x: usize,
    y: usize,
    params: &RaycastParams,
) -> Option<Hit> {
    let ray = ray_from_pixel(view, x, y);
    let mut traversal = volume.traverse(&ray, params.near_plane, params.far_plane);
    let first = traversal.next()?;
    if !first.is_valid() {
        return None;
    }
    raycast(
        volume,
        &ray.origin,
        &ray.direction,
        first.tmin,
        traversal.t_far(),
        params,
    )
}

/// Unit surface normal at a hit, pointing into occupied space.
///
/// Signed-distance gradients are negated. Returns `None` for a zero
/// gradient.
pub fn surface_normal<V: Volume>(volume: &V, hit: &Hit) -> Option<Vec3> {
    let gradient = volume.grad(&hit.position, hit.scale, <Voxel<V> as VoxelTrait>::value);
    let norm = gradient.norm();
    if !(norm > 0.0) {
        return None;
    }
    let n = gradient / norm;
    if <Voxel<V> as VoxelTrait>::KIND.is_signed_distance() {
        Some(-n)
    } else {
        Some(n)
    }
}

/// Raycast a whole image.
///
/// Every pixel of `vertex`, `normal` and `scales` is rewritten: hits store
/// position, unit normal (or the invalid sentinel for a zero gradient) and
/// resolution level; misses store a zero vertex, the invalid sentinel and
/// level 0. `scales` is consumed by [`crate::render_cached_kernel`].
pub fn raycast_kernel<V: Volume>(
    volume: &V,
    vertex: &mut Image<Vec3>,
    normal: &mut Image<Vec3>,
    scales: &mut Image<u8>,
    view: &Mat4,
    params: &RaycastParams,
) -> Result<()> {
    vertex.ensure_same_size(normal, "normal image")?;
    vertex.ensure_same_size(scales, "scale image")?;

    let start = Instant::now();
    let pixels = vertex.len();

    vertex
        .par_rows_mut()
        .zip(normal.par_rows_mut())
        .zip(scales.par_rows_mut())
        .enumerate()
        .for_each(|(y, ((vertex_row, normal_row), scale_row))| {
            let pixels = vertex_row
                .iter_mut()
                .zip(normal_row.iter_mut())
                .zip(scale_row.iter_mut());
            for (x, ((v, n), s)) in pixels.enumerate() {
                match cast_pixel(volume, view, x, y, params) {
                    Some(hit) => {
                        *v = hit.position;
                        *n = surface_normal(volume, &hit).unwrap_or_else(invalid_normal);
                        *s = hit.scale;
                    }
                    None => {
                        *v = Vec3::zeros();
                        *n = invalid_normal();
                        *s = 0;
                    }
                }
            }
        });

    debug!("raycast_kernel: {pixels} pixels in {:?}", start.elapsed());
    Ok(())
}

/// Append every crossing into occupied space along a ray to `points`.
///
/// Marching starts at the origin. The step starts at `large_step` and drops
/// to `step` for good once any sample falls below the closeness threshold.
/// A bracket is rejected when either sample is fully truncated (exactly
/// 1.0), either voxel has zero weight, or the field jumps by 0.5 or more.
pub fn raycast_full<V: Volume>(
    volume: &V,
    points: &mut Vec<Vec4>,
    origin: &Vec3,
    direction: &Vec3,
    far: f32,
    step: f32,
    large_step: f32,
) {
    if !(step > 0.0) || !(large_step > 0.0) || !far.is_finite() {
        return;
    }

    let sign = <Voxel<V> as VoxelTrait>::KIND.surface_sign();
    let weight = <Voxel<V> as VoxelTrait>::weight;
    let field = |t: f32| {
        volume
            .interp(&(origin + direction * t), <Voxel<V> as VoxelTrait>::value)
            .value
    };

    let mut t_prev = 0.0;
    let mut f_t = field(t_prev);
    let mut t = step;
    let mut stepsize = large_step;

    while t < far {
        let f_tt = field(t);
        let (g_t, g_tt) = (sign * f_t, sign * f_tt);

        if g_t >= 0.0 && g_tt < 0.0 && (f_tt - f_t).abs() < MAX_BRACKET_JUMP {
            let data_t = volume.get(&(origin + direction * t_prev));
            let data_tt = volume.get(&(origin + direction * t));
            if f_t == 1.0 || f_tt == 1.0 || weight(&data_t) == 0.0 || weight(&data_tt) == 0.0 {
                trace!("raycast_full: rejected bracket at t = {t}");
                f_t = f_tt;
                t_prev = t;
                t += stepsize;
                continue;
            }
            let distance = t + (t - t_prev) * g_tt / (g_t - g_tt);
            points.push((origin + direction * distance).push(1.0));
        }

        if f_tt < NEAR_SURFACE {
            stepsize = step;
        }
        f_t = f_tt;
        t_prev = t;
        t += stepsize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use voxray_volume::{BlockGridVolume, Occupancy, Sdf, VoxelData};

    const MU: f32 = 0.1;

    fn params() -> RaycastParams {
        RaycastParams {
            near_plane: 0.1,
            far_plane: 4.0,
            mu: MU,
            step: 0.01,
            large_step: 0.075,
        }
    }

    /// Truncated distance to the plane z = 0.5, positive on the camera side.
    fn sdf_plane(p: &Vec3) -> VoxelData {
        VoxelData {
            x: ((0.5 - p.z) / MU).clamp(-1.0, 1.0),
            y: 1.0,
        }
    }

    /// Log-odds occupancy of the half-space z > 0.5.
    fn occupancy_plane(p: &Vec3) -> VoxelData {
        VoxelData {
            x: 5.0 * ((p.z - 0.5) / MU).clamp(-1.0, 1.0),
            y: 1.0,
        }
    }

    fn unit_grid<V: VoxelTrait<Data = VoxelData>>(
        field: fn(&Vec3) -> VoxelData,
    ) -> BlockGridVolume<V, fn(&Vec3) -> VoxelData> {
        BlockGridVolume::new(field, Vec3::zeros(), [4, 4, 4], 8, 1.0 / 32.0).unwrap()
    }

    #[test]
    fn test_invalid_normal_sentinel() {
        assert!(!is_valid_normal(&invalid_normal()));
        assert!(!is_valid_normal(&Vec3::zeros()));
        assert!(is_valid_normal(&Vec3::z()));
    }

    #[test]
    fn test_ray_from_pixel() {
        let mut view = Mat4::identity();
        view[(0, 3)] = 1.0;
        let ray = ray_from_pixel(&view, 3, 4);
        assert_relative_eq!(ray.origin, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(ray.direction, Vec3::new(3.0, 4.0, 1.0).normalize());
    }

    #[test]
    fn test_sdf_plane_hit() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let origin = Vec3::new(0.5, 0.5, -0.5);
        let hit = raycast(&volume, &origin, &Vec3::z(), 0.5, 1.5, &params()).unwrap();
        assert_relative_eq!(hit.distance, 1.0, epsilon = 5e-3);
        assert_relative_eq!(hit.position.z, 0.5, epsilon = 5e-3);
        assert_eq!(hit.scale, 0);
    }

    #[test]
    fn test_occupancy_plane_hit() {
        let volume = unit_grid::<Occupancy>(occupancy_plane);
        let origin = Vec3::new(0.5, 0.5, -0.5);
        let hit = raycast(&volume, &origin, &Vec3::z(), 0.5, 1.5, &params()).unwrap();
        assert_relative_eq!(hit.position.z, 0.5, epsilon = 5e-3);
    }

    #[test]
    fn test_start_inside_is_miss() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let origin = Vec3::new(0.5, 0.5, 0.0);
        // Marching starts at z = 0.8, behind the surface
        assert!(raycast(&volume, &origin, &Vec3::z(), 0.8, 0.95, &params()).is_none());
    }

    #[test]
    fn test_no_crossing_before_far() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let origin = Vec3::new(0.5, 0.5, -0.5);
        assert!(raycast(&volume, &origin, &Vec3::z(), 0.5, 0.9, &params()).is_none());
    }

    #[test]
    fn test_degenerate_bounds_and_step() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let origin = Vec3::new(0.5, 0.5, -0.5);
        assert!(raycast(&volume, &origin, &Vec3::z(), 1.5, 0.5, &params()).is_none());
        let stalled = RaycastParams {
            step: 0.0,
            ..params()
        };
        assert!(raycast(&volume, &origin, &Vec3::z(), 0.5, 1.5, &stalled).is_none());
    }

    #[test]
    fn test_step_policy() {
        type SdfGrid = BlockGridVolume<Sdf, fn(&Vec3) -> VoxelData>;
        type OccGrid = BlockGridVolume<Occupancy, fn(&Vec3) -> VoxelData>;
        let p = params();
        // Far from the surface: coarse, scaled by the truncation band
        assert_relative_eq!(step_size::<SdfGrid>(1.0, &p), 0.1);
        assert_relative_eq!(step_size::<SdfGrid>(0.85, &p), 0.085, epsilon = 1e-6);
        // Inside the closeness threshold: fine
        assert_relative_eq!(step_size::<SdfGrid>(0.5, &p), 0.01);
        // Occupancy always marches finely
        assert_relative_eq!(step_size::<OccGrid>(5.0, &p), 0.01);
    }

    #[test]
    fn test_surface_normal_sign_convention() {
        let hit = Hit {
            position: Vec3::new(0.5, 0.5, 0.5),
            distance: 1.0,
            scale: 0,
        };

        let sdf = unit_grid::<Sdf>(sdf_plane);
        let raw = sdf.grad(&hit.position, 0, Sdf::value).normalize();
        let n = surface_normal(&sdf, &hit).unwrap();
        assert_relative_eq!(n, -raw, epsilon = 1e-6);
        assert_relative_eq!(n, Vec3::z(), epsilon = 1e-5);

        let occupancy = unit_grid::<Occupancy>(occupancy_plane);
        let raw = occupancy.grad(&hit.position, 0, Occupancy::value).normalize();
        let n = surface_normal(&occupancy, &hit).unwrap();
        assert_relative_eq!(n, raw, epsilon = 1e-6);
        assert_relative_eq!(n, Vec3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_zero_gradient_has_no_normal() {
        let flat = unit_grid::<Sdf>(|_| VoxelData { x: 0.0, y: 1.0 });
        let hit = Hit {
            position: Vec3::repeat(0.5),
            distance: 1.0,
            scale: 0,
        };
        assert!(surface_normal(&flat, &hit).is_none());
    }

    #[test]
    fn test_raycast_full_skips_unobserved() {
        // Surface exists but was never observed
        let unseen = unit_grid::<Sdf>(|p| VoxelData {
            x: ((0.5 - p.z) / MU).clamp(-1.0, 1.0),
            y: 0.0,
        });
        let mut points = Vec::new();
        raycast_full(
            &unseen,
            &mut points,
            &Vec3::new(0.5, 0.5, 0.05),
            &Vec3::z(),
            0.9,
            0.005,
            0.05,
        );
        assert!(points.is_empty());
    }

    #[test]
    fn test_raycast_full_single_plane() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let mut points = Vec::new();
        raycast_full(
            &volume,
            &mut points,
            &Vec3::new(0.5, 0.5, 0.05),
            &Vec3::z(),
            0.9,
            0.005,
            0.05,
        );
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].z, 0.5, epsilon = 5e-3);
        assert_eq!(points[0].w, 1.0);
    }
    /// Field that jumps from `outside` to -0.4 across z = 0.5.
    fn step_field(outside: f32) -> impl Fn(&Vec3) -> VoxelData + Sync {
        move |p: &Vec3| VoxelData {
            x: if p.z < 0.5 { outside } else { -0.4 },
            y: 1.0,
        }
    }

    fn march_z<V: Volume>(volume: &V, origin_z: f32, step: f32) -> Vec<Vec4> {
        let mut points = Vec::new();
        raycast_full(
            volume,
            &mut points,
            &Vec3::new(0.5, 0.5, origin_z),
            &Vec3::z(),
            0.8,
            step,
            step,
        );
        points
    }

    #[test]
    fn test_raycast_full_sample_on_surface() {
        // Steps of 1/32 put a sample exactly on the zero crossing at z = 0.5
        let volume = unit_grid::<Sdf>(sdf_plane);
        assert_eq!(volume.interp(&Vec3::repeat(0.5), Sdf::value).value, 0.0);

        let points = march_z(&volume, 0.0, 1.0 / 32.0);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_raycast_full_rejects_large_jump() {
        let volume = BlockGridVolume::<Sdf, _>::new(
            step_field(0.4),
            Vec3::zeros(),
            [4, 4, 4],
            8,
            1.0 / 32.0,
        )
        .unwrap();

        // Coarse samples at z = 0.47 and 0.52 straddle the step: 0.4 to -0.4
        assert!(march_z(&volume, 0.07, 0.05).is_empty());

        // Fine samples resolve the one-voxel ramp
        let points = march_z(&volume, 0.07, 0.005);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].z, 0.5, epsilon = 5e-3);
    }

    #[test]
    fn test_raycast_full_rejects_truncated_start() {
        let volume = BlockGridVolume::<Sdf, _>::new(
            step_field(1.0),
            Vec3::zeros(),
            [4, 4, 4],
            8,
            1.0 / 32.0,
        )
        .unwrap();
        assert_eq!(volume.interp(&Vec3::new(0.5, 0.5, 0.47), Sdf::value).value, 1.0);
        assert!(march_z(&volume, 0.07, 0.05).is_empty());
    }

    #[test]
    fn test_raycast_start_on_surface() {
        let volume = unit_grid::<Sdf>(sdf_plane);
        let origin = Vec3::new(0.5, 0.5, 0.0);
        let hit = raycast(&volume, &origin, &Vec3::z(), 0.5, 0.9, &params()).unwrap();
        assert_relative_eq!(hit.position.z, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_parallel_rays_miss() {
        let volume = unit_grid::<Sdf>(sdf_plane);

        // Pixel (0, 0) looks along +x from just below the grid's z = 0 face
        let mut view = Mat4::zeros();
        view[(1, 0)] = 1.0;
        view[(2, 1)] = 1.0;
        view[(0, 2)] = 1.0;
        view[(0, 3)] = -1.0;
        view[(1, 3)] = 0.5;
        view[(2, 3)] = -0.1;
        view[(3, 3)] = 1.0;
        assert_relative_eq!(ray_from_pixel(&view, 0, 0).direction, Vec3::x());
        assert!(cast_pixel(&volume, &view, 0, 0, &params()).is_none());

        // Inside the grid but parallel to the surface: never crosses
        let origin = Vec3::new(-1.0, 0.5, 0.3);
        assert!(raycast(&volume, &origin, &Vec3::x(), 1.0, 2.0, &params()).is_none());
    }
}

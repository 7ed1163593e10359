#![warn(missing_docs)]

//! Math types for the voxray renderer.
//!
//! Thin aliases around nalgebra in single precision, plus the handful of
//! rigid-transform, clamping and camera helpers the raycast and shading
//! kernels need.

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// A vector in 2D space.
pub type Vec2 = Vector2<f32>;

/// A point or vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A homogeneous 3D point or 4-component vector.
pub type Vec4 = Vector4<f32>;

/// A 3x3 matrix (rotation blocks).
pub type Mat3 = Matrix3<f32>;

/// A 4x4 matrix (poses and view matrices).
pub type Mat4 = Matrix4<f32>;

/// Square of `a`.
#[inline]
pub fn sq(a: f32) -> f32 {
    a * a
}

/// Cube of `a`.
#[inline]
pub fn cu(a: f32) -> f32 {
    a * a * a
}

/// Whether `v` lies in the closed interval `[a, b]`.
#[inline]
pub fn in_range(v: f32, a: f32, b: f32) -> bool {
    v >= a && v <= b
}

/// `floor(log2(n))` for positive `n`, zero otherwise. Usable in const context.
pub const fn log2_const(n: i32) -> i32 {
    if n < 2 {
        0
    } else {
        1 + log2_const(n / 2)
    }
}

/// Clamp a scalar into `[a, b]`.
#[inline]
pub fn clamp(f: f32, a: f32, b: f32) -> f32 {
    a.max(f.min(b))
}

/// Clamp `res` component-wise into `[a, b]`, lower bound first.
pub fn clamp_vec3(res: &mut Vec3, a: &Vec3, b: &Vec3) {
    *res = res.zip_map(a, f32::max).zip_map(b, f32::min);
}

/// Component-wise fractional part.
pub fn fracf(v: &Vec3) -> Vec3 {
    v - floorf(v)
}

/// Component-wise floor.
pub fn floorf(v: &Vec3) -> Vec3 {
    v.map(f32::floor)
}

/// Translation block of a homogeneous transform.
pub fn to_translation(t: &Mat4) -> Vec3 {
    t.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Rotation (upper-left 3x3) block of a homogeneous transform.
pub fn to_rotation(t: &Mat4) -> Mat3 {
    t.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Pure translation transform.
pub fn to_transformation(t: &Vec3) -> Mat4 {
    let mut m = Mat4::identity();
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    m
}

/// Transform from a rotation block and a translation.
pub fn to_transformation_rt(r: &Mat3, t: &Vec3) -> Mat4 {
    let mut m = to_transformation(t);
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    m
}

/// Inverse of the rotation block.
///
/// A singular block (not a rotation) yields the identity rather than an
/// error; callers are expected to pass rigid transforms.
pub fn to_inverse_rotation(t: &Mat4) -> Mat3 {
    to_rotation(t).try_inverse().unwrap_or_else(Mat3::identity)
}

/// Translation of the inverse transform: `-R^-1 * t`.
///
/// Uses [`to_inverse_rotation`], so a singular block gives `-t`.
pub fn to_inverse_translation(t: &Mat4) -> Vec3 {
    -(to_inverse_rotation(t) * to_translation(t))
}

/// Inverse of a rigid (rotation + translation) transform.
///
/// Only the upper 3x4 block is read; the bottom row of the result is
/// `[0, 0, 0, 1]`. A singular rotation block is treated as the identity,
/// see [`to_inverse_rotation`].
pub fn to_inverse_transformation(t: &Mat4) -> Mat4 {
    to_transformation_rt(&to_inverse_rotation(t), &to_inverse_translation(t))
}

/// Unit normal of the plane through three homogeneous points.
///
/// The orientation follows the point order. The result has `w = 1`.
pub fn plane_normal(p1: &Vec4, p2: &Vec4, p3: &Vec4) -> Vec4 {
    let t1 = p2.xyz() - p1.xyz();
    let t2 = p3.xyz() - p2.xyz();
    t1.cross(&t2).normalize().push(1.0)
}

/// Pinhole camera matrix for intrinsics `k = (fx, fy, cx, cy)`.
pub fn camera_matrix(k: &Vec4) -> Mat4 {
    let mut m = Mat4::identity();
    m[(0, 0)] = k.x;
    m[(0, 2)] = k.z;
    m[(1, 1)] = k.y;
    m[(1, 2)] = k.w;
    m
}

/// Closed-form inverse of [`camera_matrix`].
pub fn inverse_camera_matrix(k: &Vec4) -> Mat4 {
    let mut m = Mat4::identity();
    m[(0, 0)] = 1.0 / k.x;
    m[(0, 2)] = -k.z / k.x;
    m[(1, 1)] = 1.0 / k.y;
    m[(1, 2)] = -k.w / k.y;
    m
}

/// View matrix for raycasting from `pose` (camera-to-world) with intrinsics `k`.
///
/// Its rotation block maps a homogeneous pixel `(x, y, 1)` to a world-space
/// ray direction and its translation is the camera centre.
pub fn raycast_view(pose: &Mat4, k: &Vec4) -> Mat4 {
    pose * inverse_camera_matrix(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn rigid() -> Mat4 {
        let r = Rotation3::from_euler_angles(0.3, -0.7, 1.1).into_inner();
        to_transformation_rt(&r, &Vec3::new(1.0, -2.0, 0.5))
    }

    #[test]
    fn test_blocks() {
        let t = rigid();
        assert_relative_eq!(to_translation(&t), Vec3::new(1.0, -2.0, 0.5));
        let r = to_rotation(&t);
        assert_relative_eq!(r * r.transpose(), Mat3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_transformation() {
        let t = rigid();
        let inv = to_inverse_transformation(&t);
        assert_relative_eq!(t * inv, Mat4::identity(), epsilon = 1e-5);
        assert_relative_eq!(to_translation(&inv), to_inverse_translation(&t), epsilon = 1e-6);
    }

    #[test]
    fn test_singular_rotation_inverts_to_identity() {
        let mut t = to_transformation(&Vec3::new(1.0, 2.0, 3.0));
        t[(2, 2)] = 0.0;
        assert_eq!(to_inverse_rotation(&t), Mat3::identity());
        assert_relative_eq!(to_inverse_translation(&t), Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);

        let mut v = Vec3::new(-1.0, 0.5, 2.0);
        clamp_vec3(&mut v, &Vec3::zeros(), &Vec3::repeat(1.0));
        assert_eq!(v, Vec3::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn test_scalar_helpers() {
        assert_eq!(sq(3.0), 9.0);
        assert_eq!(cu(-2.0), -8.0);
        assert!(in_range(1.0, 1.0, 2.0));
        assert!(!in_range(2.5, 1.0, 2.0));
        assert_eq!(log2_const(1), 0);
        assert_eq!(log2_const(8), 3);
        assert_eq!(log2_const(9), 3);
    }

    #[test]
    fn test_frac_floor() {
        let v = Vec3::new(1.25, -0.25, 3.0);
        assert_relative_eq!(floorf(&v), Vec3::new(1.0, -1.0, 3.0));
        assert_relative_eq!(fracf(&v), Vec3::new(0.25, 0.75, 0.0));
    }

    #[test]
    fn test_plane_normal() {
        let p1 = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let p2 = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let p3 = Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert_relative_eq!(plane_normal(&p1, &p2, &p3), Vec4::new(0.0, 0.0, 1.0, 1.0));
        // Reversed winding flips the normal
        assert_relative_eq!(plane_normal(&p3, &p2, &p1), Vec4::new(0.0, 0.0, -1.0, 1.0));
    }

    #[test]
    fn test_camera_matrix_inverse() {
        let k = Vec4::new(525.0, 525.0, 319.5, 239.5);
        let m = camera_matrix(&k) * inverse_camera_matrix(&k);
        assert_relative_eq!(m, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_raycast_view_centre_pixel() {
        let k = Vec4::new(100.0, 100.0, 32.0, 24.0);
        let view = raycast_view(&Mat4::identity(), &k);
        // The principal point looks straight down +z
        let dir = to_rotation(&view) * Vec3::new(32.0, 24.0, 1.0);
        assert_relative_eq!(dir, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(to_translation(&view), Vec3::zeros());
    }
}

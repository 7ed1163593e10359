//! Palette, colour transfer functions and tracking result codes.

use voxray_math::Vec3;

/// Packed 8-bit RGBA pixel.
pub type Rgba = [u8; 4];

/// Per-scale shading colours, indexed by the resolution level of a hit.
pub const PALETTE: [[f32; 3]; 8] = [
    [102.0, 194.0, 165.0],
    [252.0, 141.0, 98.0],
    [141.0, 160.0, 203.0],
    [231.0, 138.0, 195.0],
    [166.0, 216.0, 84.0],
    [255.0, 217.0, 47.0],
    [229.0, 196.0, 148.0],
    [179.0, 179.0, 179.0],
];

/// Palette entry for `scale`. Scales past the end reuse the last colour.
pub fn palette_color(scale: u8) -> Vec3 {
    let index = usize::from(scale).min(PALETTE.len() - 1);
    Vec3::from(PALETTE[index])
}

/// Map `h` in `[0, 1]` onto a muted rainbow.
///
/// Fixed value 0.75 and saturation 2/3; the hue wheel is split into six
/// sextants. Inputs outside `[0, 1]` are clamped, and `h = 1` lands on the
/// end of the last sextant. Alpha is always 255.
pub fn gs2rgb(h: f32) -> Rgba {
    const V: f32 = 0.75;
    const M: f32 = 0.25;
    const SV: f32 = 0.6667;

    let h = h.clamp(0.0, 1.0) * 6.0;
    let sextant = (h as usize).min(5);
    let fract = h - sextant as f32;
    let vsf = V * SV * fract;
    let mid1 = M + vsf;
    let mid2 = V - vsf;

    let (r, g, b) = match sextant {
        0 => (V, mid1, M),
        1 => (mid2, V, M),
        2 => (M, V, mid1),
        3 => (M, mid2, V),
        4 => (mid1, M, V),
        _ => (V, M, mid2),
    };

    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, 255]
}

/// Per-pixel output of the pose tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackData {
    /// Result code, see [`TrackStatus`].
    pub result: i32,
    /// Point-to-plane residual.
    pub error: f32,
    /// Jacobian row of the residual w.r.t. the 6-DoF pose.
    pub jacobian: [f32; 6],
}

impl TrackData {
    /// Classified result code.
    pub fn status(&self) -> TrackStatus {
        TrackStatus::from_code(self.result)
    }
}

/// Classification of a tracking result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// Correspondence used (code 1).
    Ok,
    /// No input measurement (code -1).
    NoInput,
    /// Projected outside the reference image (code -2).
    OutOfImage,
    /// No reference point found (code -3).
    NoCorrespondence,
    /// Correspondence beyond the distance threshold (code -4).
    TooFar,
    /// Normals disagree beyond the angle threshold (code -5).
    WrongNormal,
    /// Any other code.
    Other(i32),
}

impl TrackStatus {
    /// Classify a raw code. Total: unknown codes become [`TrackStatus::Other`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TrackStatus::Ok,
            -1 => TrackStatus::NoInput,
            -2 => TrackStatus::OutOfImage,
            -3 => TrackStatus::NoCorrespondence,
            -4 => TrackStatus::TooFar,
            -5 => TrackStatus::WrongNormal,
            other => TrackStatus::Other(other),
        }
    }

    /// Flat visualization colour.
    pub fn color(self) -> Rgba {
        match self {
            TrackStatus::Ok => [128, 128, 128, 0],
            TrackStatus::NoInput => [0, 0, 0, 0],
            TrackStatus::OutOfImage => [255, 0, 0, 0],
            TrackStatus::NoCorrespondence => [0, 255, 0, 0],
            TrackStatus::TooFar => [0, 0, 255, 0],
            TrackStatus::WrongNormal => [255, 255, 0, 0],
            TrackStatus::Other(_) => [255, 128, 128, 0],
        }
    }
}

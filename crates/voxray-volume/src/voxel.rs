//! Voxel payloads and the sign convention attached to each map type.

/// Closed set of voxel traits a map can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelKind {
    /// Truncated signed distance field (positive outside, negative inside).
    Sdf,
    /// Multi-resolution truncated signed distance field.
    MultiresSdf,
    /// Probabilistic occupancy in log-odds (negative free, positive occupied).
    Occupancy,
}

impl VoxelKind {
    /// True for the signed-distance family.
    ///
    /// Their gradients point into free space from the inside, so surface
    /// normals are the negated gradient.
    pub fn is_signed_distance(self) -> bool {
        matches!(self, VoxelKind::Sdf | VoxelKind::MultiresSdf)
    }

    /// Factor that maps the raw field onto "positive in free space".
    pub fn surface_sign(self) -> f32 {
        if self.is_signed_distance() {
            1.0
        } else {
            -1.0
        }
    }
}

/// Two-channel voxel payload: `x` is the field value, `y` the
/// integration weight (zero means never observed).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoxelData {
    /// Field value (normalised distance or log-odds).
    pub x: f32,
    /// Integration weight / observation count.
    pub y: f32,
}

/// Compile-time description of a voxel payload.
pub trait VoxelTrait: Send + Sync + 'static {
    /// Raw payload stored per voxel.
    type Data: Copy + Send + Sync + std::fmt::Debug;

    /// Which family this trait belongs to.
    const KIND: VoxelKind;

    /// Payload of a voxel that was never integrated.
    const EMPTY: Self::Data;

    /// Field channel, the default projector for interpolation.
    fn value(data: &Self::Data) -> f32;

    /// Weight channel.
    fn weight(data: &Self::Data) -> f32;
}

/// Single-resolution TSDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sdf;

/// Multi-resolution TSDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiresSdf;

/// Log-odds occupancy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Occupancy;

impl VoxelTrait for Sdf {
    type Data = VoxelData;
    const KIND: VoxelKind = VoxelKind::Sdf;
    const EMPTY: VoxelData = VoxelData { x: 1.0, y: 0.0 };

    fn value(data: &VoxelData) -> f32 {
        data.x
    }

    fn weight(data: &VoxelData) -> f32 {
        data.y
    }
}

impl VoxelTrait for MultiresSdf {
    type Data = VoxelData;
    const KIND: VoxelKind = VoxelKind::MultiresSdf;
    const EMPTY: VoxelData = VoxelData { x: 1.0, y: 0.0 };

    fn value(data: &VoxelData) -> f32 {
        data.x
    }

    fn weight(data: &VoxelData) -> f32 {
        data.y
    }
}

impl VoxelTrait for Occupancy {
    type Data = VoxelData;
    const KIND: VoxelKind = VoxelKind::Occupancy;
    const EMPTY: VoxelData = VoxelData { x: 0.0, y: 0.0 };

    fn value(data: &VoxelData) -> f32 {
        data.x
    }

    fn weight(data: &VoxelData) -> f32 {
        data.y
    }
}

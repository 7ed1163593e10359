//! Per-call render parameters and their serialized form.

use log::warn;
use serde::{Deserialize, Serialize};
use voxray_math::Vec3;

use crate::error::{RenderError, Result};

/// Parameters of the first-hit raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastParams {
    /// Near clip distance (m).
    pub near_plane: f32,
    /// Far clip distance (m).
    pub far_plane: f32,
    /// Truncation band of the distance field (m).
    pub mu: f32,
    /// Fine marching step (m).
    pub step: f32,
    /// Coarse marching step used away from the surface (m).
    pub large_step: f32,
}

/// Light and ambient terms for Lambertian shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    /// World-space light position.
    pub light: Vec3,
    /// Ambient term added to every channel.
    pub ambient: Vec3,
}

/// Rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Near clip distance (m).
    pub near_plane: f32,
    /// Far clip distance (m).
    pub far_plane: f32,
    /// Truncation band (m).
    pub mu: f32,
    /// Fine marching step (m).
    pub step: f32,
    /// Coarse marching step (m). Should stay below `0.8 * mu`.
    pub large_step: f32,
    /// Light position.
    pub light: [f32; 3],
    /// Ambient term.
    pub ambient: [f32; 3],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            near_plane: 0.4,
            far_plane: 4.0,
            mu: 0.1,
            step: 0.02,
            large_step: 0.075,
            light: [1.0, 1.0, -1.0],
            ambient: [0.1, 0.1, 0.1],
        }
    }
}

impl RenderSettings {
    /// Parse settings from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        if let Err(e) = settings.validate() {
            warn!("rejecting render settings: {e}");
            return Err(e);
        }
        Ok(settings)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.near_plane, self.far_plane, self.mu, self.step, self.large_step]
            .iter()
            .chain(&self.light)
            .chain(&self.ambient)
            .all(|v| v.is_finite());
        if !finite {
            return Err(RenderError::InvalidSettings(
                "all settings must be finite".into(),
            ));
        }
        if self.near_plane <= 0.0 {
            return Err(RenderError::InvalidSettings(
                "near_plane must be positive".into(),
            ));
        }
        if self.far_plane <= self.near_plane {
            return Err(RenderError::InvalidSettings(
                "far_plane must be beyond near_plane".into(),
            ));
        }
        if self.mu <= 0.0 {
            return Err(RenderError::InvalidSettings("mu must be positive".into()));
        }
        if self.step <= 0.0 {
            return Err(RenderError::InvalidSettings("step must be positive".into()));
        }
        if self.large_step < self.step {
            return Err(RenderError::InvalidSettings(
                "large_step must be at least step".into(),
            ));
        }
        Ok(())
    }

    /// Raycast parameters for [`crate::raycast_kernel`] and friends.
    pub fn raycast_params(&self) -> RaycastParams {
        RaycastParams {
            near_plane: self.near_plane,
            far_plane: self.far_plane,
            mu: self.mu,
            step: self.step,
            large_step: self.large_step,
        }
    }

    /// Shading terms.
    pub fn lighting(&self) -> Lighting {
        Lighting {
            light: Vec3::from(self.light),
            ambient: Vec3::from(self.ambient),
        }
    }
}

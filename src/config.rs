//! Render configuration
//!
//! All knobs for one render call. Loadable from YAML; validated as a whole
//! before any worker starts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::{normalize_or_zero, Vec3};

/// Complete description of one render: image geometry, sampling, scene text
/// and materials.
///
/// Colour channels live on the 0-255 scale the output bytes use; the shader
/// accumulates unclamped and clamps only at the pixel write.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    pub image_width: usize,
    pub image_height: usize,
    /// Samples per pixel. Sample colours are summed (weighted by
    /// `brightness`), not averaged; that sum is the intended look.
    pub rays: u32,
    /// Worker count; rows are split into this many contiguous bands.
    pub threads: usize,
    /// ASCII scene grid, `*` = unit sphere. Must be rectangular.
    pub lines: Vec<String>,
    pub ray_origin: Vec3,
    pub cam_direction: Vec3,
    /// Checkerboard floor colours.
    pub odd_colour: Vec3,
    pub even_colour: Vec3,
    pub sky_colour: Vec3,
    /// Fraction of a bounced ray's contribution retained, in [0, 1].
    pub sphere_reflectivity: f64,
    pub brightness: f64,
    /// Master seed for the per-pixel sample generators. Seeded renders are
    /// reproducible and independent of the thread count; when absent, a
    /// clock-derived seed makes every render differ (stochastic sampling).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RenderConfig {
    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: RenderConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// The classic card-tracer demo scene.
    pub fn demo() -> Self {
        let lines = [
            "*** ****",
            "* *   * ",
            "***   * ",
            "* *   * ",
            "* *   * ",
        ];
        Self {
            image_width: 512,
            image_height: 512,
            rays: 64,
            threads: 4,
            lines: lines.iter().map(|s| s.to_string()).collect(),
            ray_origin: Vec3::new(17.0, 16.0, 8.0),
            cam_direction: Vec3::new(-6.0, -16.0, 0.0),
            odd_colour: Vec3::new(3.0, 1.0, 1.0),
            even_colour: Vec3::new(3.0, 3.0, 3.0),
            sky_colour: Vec3::new(0.7, 0.6, 1.0),
            sphere_reflectivity: 0.5,
            brightness: 3.5,
            seed: None,
        }
    }

    /// Check the whole configuration up front; nothing renders on error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.image_width,
                height: self.image_height,
            });
        }
        if self.rays == 0 {
            return Err(ConfigError::InvalidSampling);
        }
        if self.threads == 0 || self.threads > self.image_height {
            return Err(ConfigError::InvalidThreads {
                threads: self.threads,
                height: self.image_height,
            });
        }
        if self.lines.is_empty() || self.lines[0].is_empty() {
            return Err(ConfigError::EmptyScene);
        }
        let expected = self.lines[0].chars().count();
        for (line, text) in self.lines.iter().enumerate() {
            let len = text.chars().count();
            if len != expected {
                return Err(ConfigError::RaggedScene {
                    line,
                    len,
                    expected,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.sphere_reflectivity) {
            return Err(ConfigError::InvalidReflectivity(self.sphere_reflectivity));
        }
        if !(self.brightness > 0.0) {
            return Err(ConfigError::InvalidBrightness(self.brightness));
        }
        // The view basis starts from cross((0,0,1), direction); a zero or
        // exactly vertical direction collapses it and every ray would be NaN.
        let right = normalize_or_zero(Vec3::z().cross(&self.cam_direction));
        if right == Vec3::zeros() {
            return Err(ConfigError::DegenerateCamera);
        }
        Ok(())
    }
}

//! gridtrace - a parallel recursive ray tracer for ASCII sphere-grid scenes
//!
//! A scene is an ASCII grid where each `*` places a unit sphere on a regular
//! lattice above a checkerboard floor, under a gradient sky. Rendering casts
//! several jittered rays per pixel (antialiasing + depth of field), bounces
//! them off spheres with geometric attenuation, and fills the image in
//! parallel scanline bands.
//!
//! ```no_run
//! use gridtrace::{RenderConfig, Renderer};
//!
//! let config = RenderConfig::demo();
//! let pixels = Renderer::new().render(&config).unwrap();
//! assert_eq!(pixels.len(), config.image_width * config.image_height * 3);
//! ```

pub mod config;
pub mod error;
pub mod math;
pub mod render;
pub mod scene;
pub mod term;

pub use config::RenderConfig;
pub use error::{ConfigError, RenderError};
pub use render::{Hit, Renderer};
pub use scene::Scene;

/// Minimum ray parameter accepted by intersection tests.
///
/// Rays restarted from a surface would otherwise re-hit it at t ~ 0
/// ("shadow acne").
pub const EPSILON: f64 = 0.01;

/// Hard cap on reflection bounces per sample.
///
/// Attenuation alone terminates any reflectivity < 1, but a bound keeps
/// pathological configurations from looping forever.
pub const MAX_BOUNCES: u32 = 50;

//! Scene loading
//!
//! An ASCII grid becomes a lattice of unit spheres: occupied cell
//! `(row, col)` puts a sphere at `(col, 0, row + 4)`. Columns map to x and
//! rows to height, so the art stands upright above the z = 0 floor (z is up).
//! The grid is index-flipped on load, putting the last text line nearest the
//! camera side of the lattice.

use crate::config::RenderConfig;
use crate::error::ConfigError;
use crate::math::Vec3;

/// Immutable scene state shared read-only across render workers.
#[derive(Debug, Clone)]
pub struct Scene {
    rows: usize,
    cols: usize,
    grid: Vec<bool>,
    spheres: Vec<Vec3>,
    pub odd_colour: Vec3,
    pub even_colour: Vec3,
    pub sky_colour: Vec3,
    pub reflectivity: f64,
}

impl Scene {
    pub fn from_config(config: &RenderConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.lines,
            config.odd_colour,
            config.even_colour,
            config.sky_colour,
            config.sphere_reflectivity,
        )
    }

    pub fn new(
        lines: &[String],
        odd_colour: Vec3,
        even_colour: Vec3,
        sky_colour: Vec3,
        reflectivity: f64,
    ) -> Result<Self, ConfigError> {
        if lines.is_empty() || lines[0].is_empty() {
            return Err(ConfigError::EmptyScene);
        }
        let rows = lines.len();
        let cols = lines[0].chars().count();

        let mut grid = vec![false; rows * cols];
        for (r, line) in lines.iter().enumerate() {
            let len = line.chars().count();
            if len != cols {
                return Err(ConfigError::RaggedScene {
                    line: r,
                    len,
                    expected: cols,
                });
            }
            for (c, ch) in line.chars().enumerate() {
                if ch == '*' {
                    grid[(rows - 1 - r) * cols + (cols - 1 - c)] = true;
                }
            }
        }

        // Flatten occupied cells into centers once; the intersector walks
        // this list for every ray.
        let spheres = grid
            .iter()
            .enumerate()
            .filter(|(_, &occupied)| occupied)
            .map(|(i, _)| Vec3::new((i % cols) as f64, 0.0, (i / cols + 4) as f64))
            .collect();

        Ok(Self {
            rows,
            cols,
            grid,
            spheres,
            odd_colour,
            even_colour,
            sky_colour,
            reflectivity,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Occupancy after the load-time index flip.
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.grid[row * self.cols + col]
    }

    /// Centers of all spheres in the scene.
    pub fn sphere_centers(&self) -> &[Vec3] {
        &self.spheres
    }
}

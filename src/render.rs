//! The ray tracer core
//!
//! Intersection, shading and sampling for the sphere-grid scene, plus the
//! band-parallel renderer that fills the output buffer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::RenderConfig;
use crate::error::{ConfigError, RenderError};
use crate::math::{normalize_or_zero, reflect, Vec3};
use crate::scene::Scene;
use crate::{EPSILON, MAX_BOUNCES};

/// Result of intersecting a ray with the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    /// Nothing in the ray's path; it escapes upward.
    Sky,
    /// The z = 0 floor plane, normal (0, 0, 1).
    Floor { distance: f64 },
    /// A unit sphere, with the surface normal at the hit point.
    Sphere { distance: f64, normal: Vec3 },
}

/// Find the nearest hit along `direction`, brute force over every sphere.
///
/// The scene holds tens of spheres at most; a spatial index would add
/// complexity without payoff here.
pub fn intersect(scene: &Scene, origin: Vec3, direction: Vec3) -> Hit {
    let mut best = 1e9;
    let mut hit = Hit::Sky;

    let t_plane = -origin.z / direction.z;
    if t_plane > EPSILON {
        best = t_plane;
        hit = Hit::Floor { distance: t_plane };
    }

    for &center in scene.sphere_centers() {
        // Unit sphere quadratic in the sphere's local frame.
        let p = origin - center;
        let b = p.dot(&direction);
        let c = p.dot(&p) - 1.0;
        let q = b * b - c;
        if q > 0.0 {
            let s = -b - q.sqrt();
            if s < best && s > EPSILON {
                best = s;
                hit = Hit::Sphere {
                    distance: s,
                    normal: normalize_or_zero(p + direction * s),
                };
            }
        }
    }

    hit
}

/// Radiance along a ray, as an unclamped RGB triple.
///
/// Reflection is a depth-bounded loop rather than recursion: each sphere
/// bounce adds its specular term scaled by the running attenuation, then
/// restarts the ray from the hit point. Sky and floor terminate.
pub fn shade(scene: &Scene, origin: Vec3, direction: Vec3, rng: &mut SampleRng) -> Vec3 {
    let mut colour = Vec3::zeros();
    let mut attenuation = 1.0;
    let mut origin = origin;
    let mut direction = direction;

    for _ in 0..MAX_BOUNCES {
        match intersect(scene, origin, direction) {
            Hit::Sky => {
                colour += scene.sky_colour * (1.0 - direction.z).powi(4) * attenuation;
                break;
            }
            Hit::Floor { distance } => {
                let h = origin + direction * distance;
                let light = jittered_light(h, rng);
                let mut b = light.z.max(0.0); // lambertian against (0,0,1)
                if b > 0.0 && intersect(scene, h, light) != Hit::Sky {
                    b = 0.0;
                }
                let tile = h / 4.0;
                let parity = (tile.x.ceil() + tile.y.ceil()) as i64;
                let floor = if parity & 1 == 1 {
                    scene.odd_colour
                } else {
                    scene.even_colour
                };
                colour += floor * (b / 4.0 + 0.1) * attenuation;
                break;
            }
            Hit::Sphere { distance, normal } => {
                let h = origin + direction * distance;
                let light = jittered_light(h, rng);
                let bounce = reflect(direction, normal);

                let mut b = light.dot(&normal);
                if b < 0.0 {
                    b = 0.0;
                } else if intersect(scene, h, light) != Hit::Sky {
                    b = 0.0;
                }
                let p = if b > 0.0 {
                    light.dot(&bounce).max(0.0).powi(64)
                } else {
                    0.0
                };
                colour += Vec3::new(p, p, p) * attenuation;

                attenuation *= scene.reflectivity;
                origin = h;
                direction = bounce;
            }
        }
    }

    colour
}

/// Direction from `point` toward the light, jittered per sample for soft
/// shadows.
fn jittered_light(point: Vec3, rng: &mut SampleRng) -> Vec3 {
    let target = Vec3::new(9.0 + rng.next_f64(), 9.0 + rng.next_f64(), 16.0);
    normalize_or_zero(target - point)
}

/// Precomputed view basis shared by every sample of a render.
struct CameraBasis {
    right: Vec3,
    up: Vec3,
    centre: Vec3,
}

fn camera_basis(cam_direction: Vec3) -> Result<CameraBasis, ConfigError> {
    let forward = normalize_or_zero(cam_direction);
    let right = normalize_or_zero(Vec3::z().cross(&forward));
    if right == Vec3::zeros() {
        return Err(ConfigError::DegenerateCamera);
    }
    let right = right * 0.003;
    let up = normalize_or_zero(forward.cross(&right)) * 0.003;
    let centre = (right + up) * -256.0 + forward;
    Ok(CameraBasis { right, up, centre })
}

/// Accumulate all samples for pixel (x, y).
///
/// Starts from the default near-black colour and sums brightness-weighted
/// sample colours without dividing by the ray count; the sum is the intended
/// exposure.
fn sample_pixel(
    scene: &Scene,
    config: &RenderConfig,
    basis: &CameraBasis,
    x: usize,
    y: usize,
    rng: &mut SampleRng,
) -> Vec3 {
    let mut colour = Vec3::new(16.0, 16.0, 16.0);

    for _ in 0..config.rays {
        // Lens jitter: shifting the ray origin inside the aperture gives
        // depth of field.
        let t = basis.right * ((rng.next_f64() - 0.5) * 64.0)
            + basis.up * ((rng.next_f64() - 0.5) * 64.0);
        let direction = normalize_or_zero(
            (basis.right * (rng.next_f64() + x as f64)
                + basis.up * (rng.next_f64() + y as f64)
                + basis.centre)
                * 16.0
                - t,
        );
        colour += shade(scene, config.ray_origin + t, direction, rng) * config.brightness;
    }

    colour
}

/// Deterministic per-pixel sample generator.
///
/// A plain LCG, seeded from the master seed and pixel index so a seeded
/// render is reproducible regardless of how rows are banded across threads.
pub struct SampleRng {
    state: u64,
}

impl SampleRng {
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: seed ^ 0x9e37_79b9_7f4a_7c15,
        };
        // Warm up so adjacent seeds decorrelate.
        rng.advance();
        rng.advance();
        rng
    }

    fn advance(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.advance() >> 40) as f64 / (1u64 << 24) as f64
    }
}

/// Band-parallel renderer with a minimal lifecycle: idle, rendering, idle.
///
/// The image is split into `threads` contiguous horizontal bands, each filled
/// by one worker into its own disjoint slice of the buffer. Workers share
/// only the read-only scene and config.
pub struct Renderer {
    cancel: AtomicBool,
    rendering: AtomicBool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            cancel: AtomicBool::new(false),
            rendering: AtomicBool::new(false),
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::SeqCst)
    }

    /// Signal the in-flight render to stop, then block until it has exited.
    ///
    /// Workers observe the flag once per row; the cancelled render call
    /// returns `RenderError::Cancelled`.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        while self.is_rendering() {
            std::thread::yield_now();
        }
    }

    /// Render the configured scene into a `width * height * 3` RGB buffer,
    /// row-major, top row first.
    ///
    /// Rows partition into `threads` bands of `height / threads` rows; when
    /// the division has a remainder, the bottom `height % threads` rows are
    /// left black. Known limitation: pick a thread count that divides the
    /// height to cover every row.
    pub fn render(&self, config: &RenderConfig) -> Result<Vec<u8>, RenderError> {
        config.validate()?;
        let scene = Scene::from_config(config)?;
        let basis = camera_basis(config.cam_direction)?;

        let width = config.image_width;
        let height = config.image_height;
        let band_rows = height / config.threads;
        let rendered_rows = band_rows * config.threads;
        let row_bytes = width * 3;

        let seed = config.seed.unwrap_or_else(clock_seed);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| RenderError::Pool(e.to_string()))?;

        log::debug!(
            "rendering {}x{} at {} rays/pixel: {} bands of {} rows (seed {:#x})",
            width,
            height,
            config.rays,
            config.threads,
            band_rows,
            seed
        );
        if rendered_rows < height {
            log::warn!(
                "thread count {} does not divide height {}; bottom {} rows dropped",
                config.threads,
                height,
                height - rendered_rows
            );
        }

        let mut buffer = vec![0u8; width * height * 3];
        let start = Instant::now();

        self.cancel.store(false, Ordering::SeqCst);
        self.rendering.store(true, Ordering::SeqCst);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                buffer[..rendered_rows * row_bytes]
                    .par_chunks_mut(band_rows * row_bytes)
                    .enumerate()
                    .try_for_each(|(band, rows)| {
                        self.render_band(&scene, config, &basis, seed, band * band_rows, rows)
                    })
            })
        }));

        self.rendering.store(false, Ordering::SeqCst);

        match outcome {
            Ok(Ok(())) => {
                log::info!(
                    "rendered {}x{} in {} ms",
                    width,
                    height,
                    start.elapsed().as_millis()
                );
                Ok(buffer)
            }
            Ok(Err(e)) => Err(e),
            Err(panic) => Err(RenderError::Worker(describe_panic(&panic))),
        }
    }

    fn render_band(
        &self,
        scene: &Scene,
        config: &RenderConfig,
        basis: &CameraBasis,
        seed: u64,
        first_row: usize,
        rows: &mut [u8],
    ) -> Result<(), RenderError> {
        let width = config.image_width;
        let height = config.image_height;

        for (i, row) in rows.chunks_exact_mut(width * 3).enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(RenderError::Cancelled);
            }
            // Buffer row 0 is the top of the image: scanline y counts down.
            let y = height - 1 - (first_row + i);
            for (j, pixel) in row.chunks_exact_mut(3).enumerate() {
                let x = width - 1 - j;
                let mut rng = SampleRng::new(seed.wrapping_add((y * width + x) as u64));
                let colour = sample_pixel(scene, config, basis, x, y, &mut rng);
                pixel[0] = colour.x.clamp(0.0, 255.0) as u8;
                pixel[1] = colour.y.clamp(0.0, 255.0) as u8;
                pixel[2] = colour.z.clamp(0.0, 255.0) as u8;
            }
        }
        Ok(())
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn describe_panic(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn blank_scene() -> Scene {
        let lines = vec!["   ".to_string(), "   ".to_string()];
        Scene::new(
            &lines,
            Vec3::new(3.0, 1.0, 1.0),
            Vec3::new(3.0, 3.0, 3.0),
            Vec3::new(0.7, 0.6, 1.0),
            0.5,
        )
        .unwrap()
    }

    fn single_sphere_scene() -> Scene {
        let lines = vec!["*".to_string()];
        Scene::new(
            &lines,
            Vec3::new(3.0, 1.0, 1.0),
            Vec3::new(3.0, 3.0, 3.0),
            Vec3::new(0.7, 0.6, 1.0),
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn test_upward_ray_is_sky() {
        let scene = blank_scene();
        let hit = intersect(&scene, Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(hit, Hit::Sky);
    }

    #[test]
    fn test_downward_ray_hits_floor() {
        let scene = blank_scene();
        let hit = intersect(&scene, Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(matches!(hit, Hit::Floor { distance } if (distance - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_aimed_ray_hits_sphere_at_expected_distance() {
        // Sphere center (0, 0, 4); firing straight at it from 10 units out
        // must hit the near surface at t = 9.
        let scene = single_sphere_scene();
        let hit = intersect(&scene, Vec3::new(0.0, -10.0, 4.0), Vec3::new(0.0, 1.0, 0.0));
        match hit {
            Hit::Sphere { distance, normal } => {
                assert!((distance - 9.0).abs() < 1e-9);
                assert!((normal.y + 1.0).abs() < 1e-9);
            }
            other => panic!("expected sphere hit, got {:?}", other),
        }
    }

    #[test]
    fn test_sphere_in_front_of_floor_wins() {
        // Both the floor (t = 10) and the sphere (t = 5) are in the path;
        // the nearer sphere must win.
        let scene = single_sphere_scene();
        let hit = intersect(&scene, Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(matches!(hit, Hit::Sphere { distance, .. } if (distance - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_sky_shade_matches_formula() {
        let scene = blank_scene();
        let direction = normalize_or_zero(Vec3::new(1.0, 0.0, 1.0));
        let mut rng = SampleRng::new(1);
        let colour = shade(&scene, Vec3::new(0.0, 0.0, 1.0), direction, &mut rng);
        let expected = scene.sky_colour * (1.0 - direction.z).powi(4);
        assert!((colour - expected).norm() < 1e-12);
    }

    #[test]
    fn test_shade_terminates_at_full_reflectivity() {
        // Reflectivity 1.0 would recurse forever without the bounce cap.
        let lines = vec!["*".to_string()];
        let scene = Scene::new(
            &lines,
            Vec3::new(3.0, 1.0, 1.0),
            Vec3::new(3.0, 3.0, 3.0),
            Vec3::new(0.7, 0.6, 1.0),
            1.0,
        )
        .unwrap();
        let mut rng = SampleRng::new(7);
        let colour = shade(
            &scene,
            Vec3::new(0.0, -10.0, 4.0),
            Vec3::new(0.0, 1.0, 0.0),
            &mut rng,
        );
        assert!(colour.x.is_finite() && colour.y.is_finite() && colour.z.is_finite());
    }

    #[test]
    fn test_camera_basis_shape() {
        let basis = camera_basis(Vec3::new(-6.0, -16.0, 0.0)).unwrap();
        let forward = normalize_or_zero(Vec3::new(-6.0, -16.0, 0.0));
        assert!((basis.right.norm() - 0.003).abs() < 1e-12);
        assert!((basis.up.norm() - 0.003).abs() < 1e-12);
        assert!(basis.right.dot(&forward).abs() < 1e-12);
        assert!(basis.up.dot(&forward).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_camera_basis_fails() {
        assert!(matches!(
            camera_basis(Vec3::new(0.0, 0.0, 1.0)),
            Err(ConfigError::DegenerateCamera)
        ));
    }

    #[test]
    fn test_sample_rng_deterministic_and_in_range() {
        let mut a = SampleRng::new(99);
        let mut b = SampleRng::new(99);
        for _ in 0..1000 {
            let v = a.next_f64();
            assert_eq!(v, b.next_f64());
            assert!((0.0..1.0).contains(&v));
        }
    }

    fn test_config(width: usize, height: usize, threads: usize) -> RenderConfig {
        let mut config = RenderConfig::demo();
        config.image_width = width;
        config.image_height = height;
        config.threads = threads;
        config.rays = 2;
        config.seed = Some(42);
        config
    }

    #[test]
    fn test_buffer_length() {
        let config = test_config(16, 12, 3);
        let buffer = Renderer::new().render(&config).unwrap();
        assert_eq!(buffer.len(), 16 * 12 * 3);
    }

    #[test]
    fn test_seeded_render_independent_of_thread_count() {
        let one = Renderer::new().render(&test_config(16, 16, 1)).unwrap();
        let four = Renderer::new().render(&test_config(16, 16, 4)).unwrap();
        assert_eq!(one, four);
    }

    #[test]
    fn test_remainder_rows_are_dropped() {
        // 5 rows over 2 threads: bands cover 4 rows, the bottom row stays
        // black while every rendered pixel is at least the default colour.
        let config = test_config(8, 5, 2);
        let buffer = Renderer::new().render(&config).unwrap();
        let row_bytes = 8 * 3;
        assert!(buffer[..4 * row_bytes].iter().all(|&b| b >= 16));
        assert!(buffer[4 * row_bytes..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_black_scene_gives_default_pixels() {
        // No spheres and all-black sky and floor: every sample shades to
        // zero, leaving exactly the default pixel colour everywhere.
        let mut config = test_config(8, 8, 2);
        config.lines = vec!["   ".to_string()];
        config.sky_colour = Vec3::zeros();
        config.odd_colour = Vec3::zeros();
        config.even_colour = Vec3::zeros();
        config.ray_origin = Vec3::zeros();
        config.cam_direction = Vec3::new(0.0, 1.0, 1.0);
        let buffer = Renderer::new().render(&config).unwrap();
        assert!(buffer.iter().all(|&b| b == 16));
    }

    #[test]
    fn test_single_pixel_render_matches_sampler() {
        // A 1x1 render must agree with one direct call to the sampler using
        // the same per-pixel seed.
        let config = test_config(1, 1, 1);
        let buffer = Renderer::new().render(&config).unwrap();

        let scene = Scene::from_config(&config).unwrap();
        let basis = camera_basis(config.cam_direction).unwrap();
        let mut rng = SampleRng::new(config.seed.unwrap());
        let expected = sample_pixel(&scene, &config, &basis, 0, 0, &mut rng);

        assert_eq!(buffer[0], expected.x.clamp(0.0, 255.0) as u8);
        assert_eq!(buffer[1], expected.y.clamp(0.0, 255.0) as u8);
        assert_eq!(buffer[2], expected.z.clamp(0.0, 255.0) as u8);
    }

    #[test]
    fn test_invalid_config_renders_nothing() {
        let mut config = test_config(16, 16, 1);
        config.rays = 0;
        let renderer = Renderer::new();
        assert!(matches!(
            renderer.render(&config),
            Err(RenderError::Config(ConfigError::InvalidSampling))
        ));
        assert!(!renderer.is_rendering());
    }

    #[test]
    fn test_stop_while_idle_then_render() {
        let renderer = Renderer::new();
        renderer.stop();
        // The next render call resets the cancel flag and completes.
        let buffer = renderer.render(&test_config(8, 8, 2)).unwrap();
        assert_eq!(buffer.len(), 8 * 8 * 3);
    }

    #[test]
    fn test_stop_cancels_inflight_render() {
        let renderer = Arc::new(Renderer::new());
        let mut config = test_config(16, 16, 2);
        config.rays = 2000;

        let worker = {
            let renderer = Arc::clone(&renderer);
            std::thread::spawn(move || renderer.render(&config))
        };

        let start = Instant::now();
        while !renderer.is_rendering() && start.elapsed() < Duration::from_secs(10) {
            std::thread::yield_now();
        }
        renderer.stop();

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(RenderError::Cancelled)));
        assert!(!renderer.is_rendering());
    }
}

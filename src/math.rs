//! Vector math helpers
//!
//! The renderer uses one vector type everywhere: `nalgebra::Vector3<f64>`,
//! doubling as an RGB triple in the shading code.

pub type Vec3 = nalgebra::Vector3<f64>;

/// Normalize, returning the zero vector (not NaN) for zero-length input.
///
/// Degenerate camera configurations produce zero cross products; those are
/// rejected at validation time, but every normalization in the hot path goes
/// through this guard so a zero vector can never poison a pixel with NaN.
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    let mag_sq = v.dot(&v);
    if mag_sq == 0.0 {
        Vec3::zeros()
    } else {
        v / mag_sq.sqrt()
    }
}

/// Mirror reflection of `d` about the surface normal `n`.
pub fn reflect(d: Vec3, n: Vec3) -> Vec3 {
    d - n * (2.0 * n.dot(&d))
}

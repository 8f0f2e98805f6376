//! Utilities to approximate equality of floating point values.
//!
//! Serial and parallel convolution paths, or analytic and finite-difference
//! gradients, agree only up to rounding; the test suite compares them
//! through these helpers instead of demanding bit-exact equality.

/// Loose tolerance: acceptable for finite-difference gradient checks.
pub const F32_MAX_ERROR: f32 = 1e-3;

/// Typical tolerance for comparing two orderings of the same computation.
pub const F32_AVG_ERROR: f32 = 1e-5;

/// Tight tolerance: effectively equal for `f32` work at this scale.
pub const F32_MIN_ERROR: f32 = 1e-6;

/// Absolute-difference equality at a caller-chosen epsilon.
pub fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

/// Relative-difference equality, guarded against tiny denominators.
pub fn relative_eq(a: f32, b: f32, eps: f32) -> bool {
    let scale = a.abs().max(b.abs()).max(1e-8);
    (a - b).abs() / scale < eps
}

/// Largest absolute elementwise difference between two equal-length slices.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "length mismatch: {} vs {}", a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

//! Tunable thresholds of the morphology drivers.

/// The longest window handled by the closed-form running extremum filters.
///
/// Longer windows use the Van Herk/Gil-Werman recursion, which costs three comparisons per sample
/// regardless of the window length.
pub const BRUTE_FORCE_MAX_LENGTH: usize = 3;

/// The size from which an isotropic diamond is decomposed into a unit diamond and diagonal lines.
pub const DIAMOND_DECOMPOSITION_MIN_SIZE: usize = 5;

/// Bias added before flooring Bresenham coordinates.
///
/// Keeps lines with exactly representable slopes on the same pixels regardless of rounding in the
/// slope computation.
pub const LINE_EPSILON: f64 = 1e-5;

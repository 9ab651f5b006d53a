//! Numeric constants shared by the geometric solvers

/// Amount by which an impossible circle pair is pushed past tangency (meters)
pub const CLAMP_EPSILON: f64 = 1e-3;

/// Coordinate tolerance for treating two intersection points as the same (meters)
pub const DEDUP_EPSILON: f64 = 1e-3;

/// Smallest |det| accepted for the linearised three-anchor system
pub const DETERMINANT_EPSILON: f64 = 1e-9;

/// Minimum number of usable range samples for a 2D fix
pub const MIN_SAMPLES: usize = 3;

/// Distance reported by the ranging subsystem when no estimate is available
pub const INVALID_DISTANCE: f64 = -1.0;

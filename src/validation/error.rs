//! Typed failures of the geometric solvers and the estimator
//!
//! Every failure is recoverable at the call boundary: the caller decides
//! whether to hold the last known position, hide the anchored content for
//! the frame, or surface a diagnostic.

use thiserror::Error;

use crate::core::BeaconId;

/// Failure of a single geometric primitive
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Circle centers coincide; no finite intersection locus exists
    #[error("circles are concentric")]
    Concentric,

    /// Computation produced NaN or infinity
    #[error("geometry is numerically unstable")]
    NumericallyUnstable,

    /// Anchors are collinear or coincident (linear system determinant ~ 0)
    #[error("degenerate anchor geometry (determinant {determinant:e})")]
    DegenerateGeometry { determinant: f64 },

    /// Negative or non-finite circle radius
    #[error("invalid circle radius {radius}")]
    InvalidRadius { radius: f64 },
}

/// Failure of a full position estimate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("insufficient samples: {valid} usable, {required} required")]
    InsufficientSamples { valid: usize, required: usize },

    #[error("invalid range {distance} for beacon {beacon}")]
    InvalidRange { beacon: BeaconId, distance: f64 },

    #[error("degenerate anchor geometry (determinant {determinant:e})")]
    DegenerateGeometry { determinant: f64 },

    #[error("circles are concentric")]
    Concentric,

    #[error("position estimate is numerically unstable")]
    NumericallyUnstable,

    #[error("refinement did not converge after {iterations} iterations (cost {cost:e})")]
    NonConvergent { iterations: usize, cost: f64 },
}

impl From<GeometryError> for PositionError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::Concentric => PositionError::Concentric,
            GeometryError::NumericallyUnstable | GeometryError::InvalidRadius { .. } => {
                PositionError::NumericallyUnstable
            }
            GeometryError::DegenerateGeometry { determinant } => {
                PositionError::DegenerateGeometry { determinant }
            }
        }
    }
}

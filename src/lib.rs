//! Beacon Positioning
//!
//! Indoor 2D positioning from beacon range estimates. Ranges to anchors at
//! known floor-plan coordinates are reduced to a device position by
//! closed-form trilateration (three ranges) or least-squares refinement
//! seeded from pairwise circle intersections (four or more).

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod estimator;
pub mod graceful_degradation;

// Re-export commonly used types
pub use core::{Anchor, AnchorRegistry, BeaconId, Circle, Point2D, Proximity, RangeSample};
pub use algorithms::{CandidateSet, CircleIntersector, IntersectionResult, LeastSquaresRefiner, Trilaterator};
pub use estimator::{EstimateReport, PositionEstimator, SolveMethod};
pub use graceful_degradation::{FallbackPolicy, PositionFix, PositionTracker};
pub use processing::{RangingSnapshot, RangingTable, SharedRangingTable};
pub use utils::{ConfigError, ConfigurationManager, EstimatorConfig};
pub use validation::{GeometryError, PositionError};

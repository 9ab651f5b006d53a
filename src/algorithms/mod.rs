//! Geometric solvers

pub mod intersection;
pub mod trilateration;
pub mod candidates;
pub mod refinement;
pub mod gdop;

pub use intersection::{CircleIntersector, IntersectionResult};
pub use trilateration::Trilaterator;
pub use candidates::{CandidateReconciler, CandidateSet, PointPairKey};
pub use refinement::{LeastSquaresRefiner, Refinement};
pub use gdop::{horizontal_dop, GdopQuality};

//! Position estimation from a snapshot of range samples
//!
//! Three usable ranges go through closed-form trilateration. More than three
//! are reduced to one point by least-squares refinement, seeded from the
//! centroid of the pairwise circle intersections. The estimator holds no
//! numeric state between calls and never logs: every outcome is returned to
//! the caller.

use serde::{Deserialize, Serialize};

use crate::algorithms::{
    horizontal_dop, CandidateReconciler, CircleIntersector, LeastSquaresRefiner, Trilaterator,
};
use crate::core::{AnchorRegistry, Point2D, RangeSample};
use crate::processing::RangingSnapshot;
use crate::utils::config::{ConfigError, EstimatorConfig};
use crate::validation::{PositionError, SampleFilter, ValidSample};

/// Solver that produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMethod {
    /// Exactly three ranges, closed form
    Trilateration,
    /// Four or more ranges, Levenberg-Marquardt refinement
    LeastSquares,
}

/// Position estimate with solver diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateReport {
    pub position: Point2D,
    pub method: SolveMethod,
    /// Usable samples that went into the solve
    pub beacons_used: usize,
    /// Input samples left out: unknown beacon, unusable range or superseded
    pub samples_rejected: usize,
    /// Distinct intersection pairs (0 on the trilateration path)
    pub candidate_count: usize,
    /// Refinement iterations (0 on the trilateration path)
    pub iterations: usize,
    /// Root-mean-square range residual at `position` (meters)
    pub residual_rms: f64,
    /// Horizontal dilution of precision, `None` for singular geometry
    pub hdop: Option<f64>,
}

/// Stateless position estimator
#[derive(Debug, Clone)]
pub struct PositionEstimator {
    config: EstimatorConfig,
    trilaterator: Trilaterator,
    reconciler: CandidateReconciler,
    refiner: LeastSquaresRefiner,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::from_valid_config(EstimatorConfig::default())
    }
}

impl PositionEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EstimatorConfig) -> Self {
        let intersector = CircleIntersector::with_clamp_epsilon(config.clamp_epsilon);
        Self {
            trilaterator: Trilaterator::with_determinant_epsilon(config.determinant_epsilon),
            reconciler: CandidateReconciler::new(intersector, config.dedup_epsilon),
            refiner: LeastSquaresRefiner::new(config.max_iterations, config.convergence_tolerance),
            config,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate the device position from `samples`.
    ///
    /// `last_known` is only used as an alternative refinement seed when more
    /// than three ranges are available.
    pub fn estimate(
        &self,
        samples: &[RangeSample],
        registry: &AnchorRegistry,
        last_known: Option<Point2D>,
    ) -> Result<Point2D, PositionError> {
        self.estimate_detailed(samples, registry, last_known)
            .map(|report| report.position)
    }

    pub fn estimate_snapshot(
        &self,
        snapshot: &RangingSnapshot,
        registry: &AnchorRegistry,
        last_known: Option<Point2D>,
    ) -> Result<Point2D, PositionError> {
        self.estimate(snapshot.samples(), registry, last_known)
    }

    /// Like [`PositionEstimator::estimate`], with solver diagnostics
    pub fn estimate_detailed(
        &self,
        samples: &[RangeSample],
        registry: &AnchorRegistry,
        last_known: Option<Point2D>,
    ) -> Result<EstimateReport, PositionError> {
        let filtered = SampleFilter::apply(samples, registry);
        let valid = filtered.accepted;

        if valid.len() < self.config.min_samples {
            return Err(PositionError::InsufficientSamples {
                valid: valid.len(),
                required: self.config.min_samples,
            });
        }

        let mut report = if valid.len() == 3 {
            self.solve_three(&valid)?
        } else {
            self.solve_redundant(&valid, last_known)?
        };
        report.samples_rejected = filtered.rejected.len();
        Ok(report)
    }

    fn solve_three(&self, valid: &[ValidSample]) -> Result<EstimateReport, PositionError> {
        let position = self.trilaterator.solve_positions(
            [valid[0].anchor, valid[1].anchor, valid[2].anchor],
            [valid[0].distance, valid[1].distance, valid[2].distance],
        )?;

        Ok(self.report(valid, position, SolveMethod::Trilateration, 0, 0))
    }

    fn solve_redundant(
        &self,
        valid: &[ValidSample],
        last_known: Option<Point2D>,
    ) -> Result<EstimateReport, PositionError> {
        let candidates = self.reconciler.reconcile_valid(valid);

        let primary_seed = match candidates.centroid() {
            Some(centroid) => centroid,
            None => Point2D::centroid(valid.iter().map(|s| &s.anchor))
                .ok_or(PositionError::NumericallyUnstable)?,
        };

        let seed = match last_known.filter(Point2D::is_finite) {
            Some(previous)
                if LeastSquaresRefiner::cost(valid, &previous)
                    < LeastSquaresRefiner::cost(valid, &primary_seed) =>
            {
                previous
            }
            _ => primary_seed,
        };

        let refinement = self.refiner.refine(valid, seed)?;

        Ok(self.report(
            valid,
            refinement.position,
            SolveMethod::LeastSquares,
            candidates.len(),
            refinement.iterations,
        ))
    }

    fn report(
        &self,
        valid: &[ValidSample],
        position: Point2D,
        method: SolveMethod,
        candidate_count: usize,
        iterations: usize,
    ) -> EstimateReport {
        let cost = LeastSquaresRefiner::cost(valid, &position);
        let anchors: Vec<Point2D> = valid.iter().map(|s| s.anchor).collect();

        EstimateReport {
            position,
            method,
            beacons_used: valid.len(),
            samples_rejected: 0,
            candidate_count,
            iterations,
            residual_rms: (cost / valid.len() as f64).sqrt(),
            hdop: horizontal_dop(&anchors, &position),
        }
    }
}

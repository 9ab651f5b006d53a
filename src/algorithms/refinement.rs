//! Nonlinear least-squares refinement for over-determined range sets
//!
//! Minimises `sum_i (|x - anchor_i| - distance_i)^2` with a damped
//! Gauss-Newton (Levenberg-Marquardt) iteration on fixed-size 2x2 systems.

use nalgebra::{Matrix2, Vector2};

use crate::core::Point2D;
use crate::validation::{PositionError, ValidSample};

/// Levenberg-Marquardt solver settings
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresRefiner {
    pub max_iterations: usize,
    /// Stop once the cost or the step length changes by less than this
    pub convergence_tolerance: f64,
    /// Initial damping
    pub initial_lambda: f64,
}

impl Default for LeastSquaresRefiner {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_tolerance: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

/// Converged refinement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    pub position: Point2D,
    /// Sum of squared range residuals at `position`
    pub cost: f64,
    pub iterations: usize,
}

const MAX_LAMBDA: f64 = 1e12;
const MIN_LAMBDA: f64 = 1e-12;

impl LeastSquaresRefiner {
    pub fn new(max_iterations: usize, convergence_tolerance: f64) -> Self {
        Self {
            max_iterations,
            convergence_tolerance,
            ..Default::default()
        }
    }

    /// Sum of squared range residuals at `estimate`
    pub fn cost(samples: &[ValidSample], estimate: &Point2D) -> f64 {
        samples
            .iter()
            .map(|s| {
                let r = estimate.distance_to(&s.anchor) - s.distance;
                r * r
            })
            .sum()
    }

    /// Refine `seed` against `samples`.
    ///
    /// Fails with `NonConvergent` when the iteration budget runs out before
    /// the cost change or step length drops under the tolerance.
    pub fn refine(&self, samples: &[ValidSample], seed: Point2D) -> Result<Refinement, PositionError> {
        if !seed.is_finite() {
            return Err(PositionError::NumericallyUnstable);
        }

        let mut estimate = seed.to_vector();
        let mut lambda = self.initial_lambda;
        let mut cost = Self::cost(samples, &seed);

        for iteration in 1..=self.max_iterations {
            let (jt_j, jt_r) = normal_equations(samples, &estimate);

            // Already at a stationary point
            if jt_r.norm() <= self.convergence_tolerance {
                return self.finish(estimate, cost, iteration);
            }

            let mut damped = jt_j;
            for i in 0..2 {
                damped[(i, i)] += lambda * (1.0 + jt_j[(i, i)]);
            }

            let step = match damped.lu().solve(&jt_r) {
                Some(step) => step,
                None => {
                    lambda = (lambda * 10.0).min(MAX_LAMBDA);
                    continue;
                }
            };

            if step.norm() <= self.convergence_tolerance {
                return self.finish(estimate, cost, iteration);
            }

            let candidate = estimate - step;
            let candidate_cost = Self::cost(samples, &Point2D::from_vector(candidate));
            if !candidate_cost.is_finite() {
                return Err(PositionError::NumericallyUnstable);
            }

            if candidate_cost < cost {
                let improvement = cost - candidate_cost;
                estimate = candidate;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(MIN_LAMBDA);

                if improvement <= self.convergence_tolerance {
                    return self.finish(estimate, cost, iteration);
                }
            } else {
                lambda = (lambda * 10.0).min(MAX_LAMBDA);
            }
        }

        Err(PositionError::NonConvergent {
            iterations: self.max_iterations,
            cost,
        })
    }

    fn finish(&self, estimate: Vector2<f64>, cost: f64, iterations: usize) -> Result<Refinement, PositionError> {
        let position = Point2D::from_vector(estimate);
        if !position.is_finite() || !cost.is_finite() {
            return Err(PositionError::NumericallyUnstable);
        }
        Ok(Refinement {
            position,
            cost,
            iterations,
        })
    }
}

/// `(J^T J, J^T r)` for residuals `r_i = |x - a_i| - d_i`
fn normal_equations(samples: &[ValidSample], estimate: &Vector2<f64>) -> (Matrix2<f64>, Vector2<f64>) {
    let mut jt_j = Matrix2::zeros();
    let mut jt_r = Vector2::zeros();

    for sample in samples {
        let diff = estimate - sample.anchor.to_vector();
        let predicted = diff.norm();
        let residual = predicted - sample.distance;

        // Gradient is undefined on top of an anchor; the row drops out
        if predicted > 1e-12 {
            let row = diff / predicted;
            jt_j += row * row.transpose();
            jt_r += row * residual;
        }
    }

    (jt_j, jt_r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::trilateration::Trilaterator;
    use crate::core::BeaconId;
    use approx::assert_abs_diff_eq;
    use uuid::Uuid;

    fn five_anchor_samples(truth: Point2D) -> Vec<ValidSample> {
        [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(5.0, -3.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, anchor)| ValidSample {
            beacon_id: BeaconId::new(Uuid::nil(), 1, i as u16),
            anchor: *anchor,
            distance: anchor.distance_to(&truth),
        })
        .collect()
    }

    #[test]
    fn test_converges_from_anchor_centroid() {
        let truth = Point2D::new(3.0, 4.0);
        let samples = five_anchor_samples(truth);
        let seed = Point2D::centroid(samples.iter().map(|s| &s.anchor)).unwrap();

        let refined = LeastSquaresRefiner::default().refine(&samples, seed).unwrap();
        assert_abs_diff_eq!(refined.position.x, truth.x, epsilon = 1e-6);
        assert_abs_diff_eq!(refined.position.y, truth.y, epsilon = 1e-6);
        assert!(refined.cost < 1e-12);
    }

    #[test]
    fn test_converges_from_trilateration_of_first_three() {
        let truth = Point2D::new(3.0, 4.0);
        let samples = five_anchor_samples(truth);

        // Perturb the first three ranges so the seed is not already exact
        let positions = [samples[0].anchor, samples[1].anchor, samples[2].anchor];
        let ranges = [samples[0].distance + 0.3, samples[1].distance - 0.2, samples[2].distance + 0.1];
        let seed = Trilaterator::new().solve_positions(positions, ranges).unwrap();
        assert!(!seed.approx_eq(&truth, 1e-3));

        let refined = LeastSquaresRefiner::default().refine(&samples, seed).unwrap();
        assert_abs_diff_eq!(refined.position.x, truth.x, epsilon = 1e-6);
        assert_abs_diff_eq!(refined.position.y, truth.y, epsilon = 1e-6);
    }

    #[test]
    fn test_converges_from_offset_seeds() {
        let truth = Point2D::new(7.5, 2.5);
        let samples = five_anchor_samples(truth);

        for seed in [Point2D::new(5.0, 5.0), Point2D::new(2.0, 8.0), Point2D::new(9.0, 9.0)] {
            let refined = LeastSquaresRefiner::default().refine(&samples, seed).unwrap();
            assert_abs_diff_eq!(refined.position.x, truth.x, epsilon = 1e-6);
            assert_abs_diff_eq!(refined.position.y, truth.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_noisy_ranges_settle_near_truth() {
        let truth = Point2D::new(4.0, 6.0);
        let mut samples = five_anchor_samples(truth);
        let noise = [0.05, -0.04, 0.03, -0.02, 0.04];
        for (sample, n) in samples.iter_mut().zip(noise) {
            sample.distance += n;
        }

        let refined = LeastSquaresRefiner::default()
            .refine(&samples, Point2D::new(5.0, 5.0))
            .unwrap();
        assert!(refined.position.distance_to(&truth) < 0.1);
        assert!(refined.cost > 0.0);
    }

    #[test]
    fn test_iteration_budget_exhaustion_is_non_convergent() {
        let samples = five_anchor_samples(Point2D::new(3.0, 4.0));
        let refiner = LeastSquaresRefiner::new(1, 1e-15);

        let err = refiner.refine(&samples, Point2D::new(-20.0, 30.0)).unwrap_err();
        assert!(matches!(err, PositionError::NonConvergent { iterations: 1, .. }));
    }

    #[test]
    fn test_non_finite_seed_is_rejected() {
        let samples = five_anchor_samples(Point2D::new(3.0, 4.0));
        let err = LeastSquaresRefiner::default()
            .refine(&samples, Point2D::new(f64::NAN, 0.0))
            .unwrap_err();
        assert_eq!(err, PositionError::NumericallyUnstable);
    }
}

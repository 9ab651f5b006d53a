//! Closed-form trilateration for exactly three range measurements
//!
//! Subtracting the first circle equation from the other two removes the
//! quadratic terms and leaves a 2x2 linear system in (x, y), solved by
//! Cramer's rule. Exact and non-iterative, so it is preferred whenever
//! exactly three usable ranges are available.

use nalgebra::{Matrix2, Vector2};

use crate::core::{Anchor, Point2D, DETERMINANT_EPSILON};
use crate::validation::GeometryError;

#[derive(Debug, Clone, Copy)]
pub struct Trilaterator {
    /// Smallest |det| treated as a unique solution
    pub determinant_epsilon: f64,
}

impl Default for Trilaterator {
    fn default() -> Self {
        Self {
            determinant_epsilon: DETERMINANT_EPSILON,
        }
    }
}

impl Trilaterator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_determinant_epsilon(determinant_epsilon: f64) -> Self {
        Self { determinant_epsilon }
    }

    /// Solve for the point at distances `r1`, `r2`, `r3` from the three anchors
    pub fn solve(
        &self,
        p1: &Anchor,
        p2: &Anchor,
        p3: &Anchor,
        r1: f64,
        r2: f64,
        r3: f64,
    ) -> Result<Point2D, GeometryError> {
        self.solve_positions([p1.position, p2.position, p3.position], [r1, r2, r3])
    }

    /// Same as [`Trilaterator::solve`] on bare positions
    pub fn solve_positions(&self, positions: [Point2D; 3], ranges: [f64; 3]) -> Result<Point2D, GeometryError> {
        if let Some(&radius) = ranges.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(GeometryError::InvalidRadius { radius });
        }

        let [p1, p2, p3] = positions;
        let [r1, r2, r3] = ranges;

        let a_matrix = Matrix2::new(
            2.0 * (p2.x - p1.x),
            2.0 * (p2.y - p1.y),
            2.0 * (p3.x - p1.x),
            2.0 * (p3.y - p1.y),
        );

        let b_vector = Vector2::new(
            r1 * r1 - r2 * r2 + p2.x * p2.x - p1.x * p1.x + p2.y * p2.y - p1.y * p1.y,
            r1 * r1 - r3 * r3 + p3.x * p3.x - p1.x * p1.x + p3.y * p3.y - p1.y * p1.y,
        );

        let det = a_matrix.determinant();
        if !det.is_finite() {
            return Err(GeometryError::NumericallyUnstable);
        }
        if det.abs() <= self.determinant_epsilon {
            return Err(GeometryError::DegenerateGeometry { determinant: det });
        }

        let x = (b_vector.x * a_matrix[(1, 1)] - b_vector.y * a_matrix[(0, 1)]) / det;
        let y = (a_matrix[(0, 0)] * b_vector.y - a_matrix[(1, 0)] * b_vector.x) / det;

        let solution = Point2D::new(x, y);
        if !solution.is_finite() {
            return Err(GeometryError::NumericallyUnstable);
        }

        Ok(solution)
    }
}

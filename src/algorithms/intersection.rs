//! Pairwise circle intersection with clamping of noise-induced impossible geometry
//!
//! Real ranging noise regularly produces circle pairs that do not meet (too
//! far apart) or where one circle swallows the other. Both cases are pulled
//! back to a near-tangent configuration instead of being rejected, so that a
//! pair of beacons still contributes a usable point. Only concentric circles
//! and non-finite results are errors.

use crate::core::{BeaconId, Circle, Point2D, CLAMP_EPSILON};
use crate::validation::GeometryError;

/// The two intersection points of a beacon pair.
///
/// `a` and `b` carry no order: `(a, b)` describes the same result as `(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionResult {
    pub a: Point2D,
    pub b: Point2D,
    /// Beacons in the order they were passed in
    pub anchors: (BeaconId, BeaconId),
}

impl IntersectionResult {
    /// Same unordered point pair within `epsilon`
    pub fn same_points(&self, other: &IntersectionResult, epsilon: f64) -> bool {
        (self.a.approx_eq(&other.a, epsilon) && self.b.approx_eq(&other.b, epsilon))
            || (self.a.approx_eq(&other.b, epsilon) && self.b.approx_eq(&other.a, epsilon))
    }
}

/// Circle-circle intersection solver
#[derive(Debug, Clone, Copy)]
pub struct CircleIntersector {
    /// Overlap forced onto clamped pairs (meters)
    pub clamp_epsilon: f64,
}

impl Default for CircleIntersector {
    fn default() -> Self {
        Self {
            clamp_epsilon: CLAMP_EPSILON,
        }
    }
}

impl CircleIntersector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clamp_epsilon(clamp_epsilon: f64) -> Self {
        Self { clamp_epsilon }
    }

    /// Intersect the range circles of two beacons
    pub fn intersect_beacons(
        &self,
        first: BeaconId,
        c1: &Circle,
        second: BeaconId,
        c2: &Circle,
    ) -> Result<IntersectionResult, GeometryError> {
        let [a, b] = self.intersect(c1, c2)?;
        Ok(IntersectionResult {
            a,
            b,
            anchors: (first, second),
        })
    }

    /// Both intersection points of `c1` and `c2`.
    ///
    /// Tangent (or clamped-to-tangent) pairs return the same point twice.
    pub fn intersect(&self, c1: &Circle, c2: &Circle) -> Result<[Point2D; 2], GeometryError> {
        for circle in [c1, c2] {
            if !circle.radius.is_finite() || circle.radius < 0.0 {
                return Err(GeometryError::InvalidRadius {
                    radius: circle.radius,
                });
            }
            if !circle.center.is_finite() {
                return Err(GeometryError::NumericallyUnstable);
            }
        }

        // Larger radius first
        let (big, small) = if c1.radius >= c2.radius { (c1, c2) } else { (c2, c1) };

        let d = big.center.distance_to(&small.center);
        if d == 0.0 {
            return Err(GeometryError::Concentric);
        }

        let mut r1 = big.radius;
        let mut r2 = small.radius;

        if d > r1 + r2 {
            // Too far apart: grow the smaller circle until the pair just overlaps
            r2 = d - r1 + self.clamp_epsilon;
        } else if d < r1 - r2 {
            // Contained: shrink the larger circle until it just overlaps
            r1 = (d + r2 - self.clamp_epsilon).max(0.0);
        }

        let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
        let h = (r1 * r1 - a * a).max(0.0).sqrt();

        let ex = (small.center.to_vector() - big.center.to_vector()) / d;
        let perpendicular = nalgebra::Vector2::new(-ex.y, ex.x);
        let chord_mid = big.center.to_vector() + ex * a;

        let p_a = Point2D::from_vector(chord_mid + perpendicular * h);
        let p_b = Point2D::from_vector(chord_mid - perpendicular * h);

        if !p_a.is_finite() || !p_b.is_finite() {
            return Err(GeometryError::NumericallyUnstable);
        }

        Ok([p_a, p_b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uuid::Uuid;

    fn circle(x: f64, y: f64, r: f64) -> Circle {
        Circle::new(Point2D::new(x, y), r)
    }

    #[test]
    fn test_regular_intersection_lies_on_both_circles() {
        let intersector = CircleIntersector::new();
        let c1 = circle(1.0, 2.0, 5.0);
        let c2 = circle(7.0, 4.0, 3.5);

        let [a, b] = intersector.intersect(&c1, &c2).unwrap();

        for p in [a, b] {
            assert_relative_eq!(p.distance_to(&c1.center), c1.radius, epsilon = 1e-9);
            assert_relative_eq!(p.distance_to(&c2.center), c2.radius, epsilon = 1e-9);
        }

        // Reflections across the center line: the chord is perpendicular to
        // the center line and its midpoint lies on it.
        let axis = c2.center.to_vector() - c1.center.to_vector();
        let chord = b.to_vector() - a.to_vector();
        assert_relative_eq!(axis.dot(&chord), 0.0, epsilon = 1e-9);

        let mid = (a.to_vector() + b.to_vector()) / 2.0 - c1.center.to_vector();
        assert_relative_eq!(axis.perp(&mid), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_argument_order_does_not_change_points() {
        let intersector = CircleIntersector::new();
        let c1 = circle(0.0, 0.0, 2.0);
        let c2 = circle(3.0, 0.0, 2.0);

        let [a1, b1] = intersector.intersect(&c1, &c2).unwrap();
        let [a2, b2] = intersector.intersect(&c2, &c1).unwrap();

        assert!(
            (a1.approx_eq(&a2, 1e-12) && b1.approx_eq(&b2, 1e-12))
                || (a1.approx_eq(&b2, 1e-12) && b1.approx_eq(&a2, 1e-12))
        );
        assert_relative_eq!(a1.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(a1.y.abs(), (4.0f64 - 2.25).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_concentric_is_rejected() {
        let intersector = CircleIntersector::new();
        let err = intersector
            .intersect(&circle(1.0, 1.0, 2.0), &circle(1.0, 1.0, 3.0))
            .unwrap_err();
        assert_eq!(err, GeometryError::Concentric);
    }

    #[test]
    fn test_far_apart_circles_are_clamped_to_tangency() {
        let intersector = CircleIntersector::new();
        let [a, b] = intersector
            .intersect(&circle(0.0, 0.0, 1.0), &circle(10.0, 0.0, 2.0))
            .unwrap();

        // Grown small circle reaches the big one's rim on the side facing it
        assert_relative_eq!(a.x, 8.0, epsilon = 1e-2);
        assert_relative_eq!(b.x, 8.0, epsilon = 1e-2);
        assert!(a.distance_to(&b) < 0.5);
        assert!(a.is_finite() && b.is_finite());
    }

    #[test]
    fn test_contained_circle_is_clamped() {
        let intersector = CircleIntersector::new();
        // Small circle strictly inside the big one
        let [a, b] = intersector
            .intersect(&circle(0.0, 0.0, 10.0), &circle(1.0, 0.0, 2.0))
            .unwrap();

        // Shrunk big circle touches the small one on the far side
        assert_relative_eq!(a.x, 3.0, epsilon = 1e-2);
        assert_relative_eq!(b.x, 3.0, epsilon = 1e-2);
        assert!(a.distance_to(&b) < 0.5);
    }

    #[test]
    fn test_invalid_radius_is_rejected() {
        let intersector = CircleIntersector::new();
        let err = intersector
            .intersect(&circle(0.0, 0.0, -1.0), &circle(1.0, 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidRadius { .. }));

        let err = intersector
            .intersect(&circle(0.0, 0.0, f64::NAN), &circle(1.0, 0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidRadius { .. }));
    }

    #[test]
    fn test_clamping_never_produces_nan() {
        let intersector = CircleIntersector::new();
        let values = [0.0, 1e-9, 1e-4, 0.5, 1.0, 3.0, 10.0, 1e3, 1e6, 1e160, 1e300];

        for &d in values.iter().filter(|d| **d > 0.0) {
            for &r1 in &values {
                for &r2 in &values {
                    let c1 = circle(0.0, 0.0, r1);
                    let c2 = circle(d, 0.0, r2);
                    match intersector.intersect(&c1, &c2) {
                        Ok([a, b]) => {
                            assert!(a.is_finite() && b.is_finite(), "d={d} r1={r1} r2={r2}");
                        }
                        Err(err) => {
                            assert!(matches!(
                                err,
                                GeometryError::NumericallyUnstable | GeometryError::Concentric
                            ));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_result_keeps_caller_anchor_order() {
        let intersector = CircleIntersector::new();
        let first = BeaconId::new(Uuid::nil(), 1, 7);
        let second = BeaconId::new(Uuid::nil(), 1, 3);

        // Second circle is the larger one; labels must not swap
        let result = intersector
            .intersect_beacons(first, &circle(0.0, 0.0, 1.0), second, &circle(1.5, 0.0, 2.0))
            .unwrap();
        assert_eq!(result.anchors, (first, second));

        let swapped = IntersectionResult {
            a: result.b,
            b: result.a,
            anchors: (second, first),
        };
        assert!(result.same_points(&swapped, 1e-9));
    }
}

//! Core data types for the positioning engine

use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constants::INVALID_DISTANCE;

/// Identity of a ranging beacon (proximity UUID + major + minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeaconId {
    pub namespace: Uuid,
    pub major: u16,
    pub minor: u16,
}

impl BeaconId {
    pub fn new(namespace: Uuid, major: u16, minor: u16) -> Self {
        Self { namespace, major, minor }
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.major, self.minor)
    }
}

/// Point in the local planar frame (meters).
///
/// `PartialEq` is exact; geometric comparisons go through [`Point2D::approx_eq`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Both coordinates within `epsilon` of `other`
    pub fn approx_eq(&self, other: &Point2D, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Arithmetic mean of `points`, `None` for an empty input
    pub fn centroid<'a, I>(points: I) -> Option<Point2D>
    where
        I: IntoIterator<Item = &'a Point2D>,
    {
        let (sum, count) = points
            .into_iter()
            .fold((Vector2::<f64>::zeros(), 0usize), |(sum, count), p| (sum + p.to_vector(), count + 1));

        if count == 0 {
            None
        } else {
            Some(Point2D::from_vector(sum / count as f64))
        }
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Fixed beacon with its position in the local plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: BeaconId,
    pub position: Point2D,
}

impl Anchor {
    pub fn new(id: BeaconId, position: Point2D) -> Self {
        Self { id, position }
    }
}

/// Categorical proximity reported alongside a ranging estimate.
///
/// Diagnostic only: the solvers consume the metric `distance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Proximity {
    Immediate,
    Near,
    Far,
    #[default]
    Unknown,
}

/// One ranging update for a single beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSample {
    pub beacon_id: BeaconId,
    /// Metric distance estimate (meters); `-1` when unavailable
    pub distance: f64,
    pub captured_at_ms: u64,
    #[serde(default)]
    pub proximity: Proximity,
}

impl RangeSample {
    pub const INVALID_DISTANCE: f64 = INVALID_DISTANCE;

    pub fn new(beacon_id: BeaconId, distance: f64, captured_at_ms: u64) -> Self {
        Self {
            beacon_id,
            distance,
            captured_at_ms,
            proximity: Proximity::Unknown,
        }
    }

    pub fn with_proximity(mut self, proximity: Proximity) -> Self {
        self.proximity = proximity;
        self
    }

    /// Finite and strictly positive; rejects the `-1` sentinel and NaN
    pub fn is_valid_distance(&self) -> bool {
        self.distance.is_finite() && self.distance > 0.0
    }
}

/// Range circle around an anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point2D,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2D, radius: f64) -> Self {
        Self { center, radius }
    }
}

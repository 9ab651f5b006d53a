//! Candidate points from redundant beacon coverage
//!
//! With more than three ranges every beacon pair contributes the two points
//! where its range circles cross. Pairs whose circles cross at the same two
//! places (within epsilon) collapse to a single candidate, regardless of which
//! beacons produced them.

use std::collections::HashMap;

use crate::core::{AnchorRegistry, Circle, Point2D, RangeSample, DEDUP_EPSILON};
use crate::validation::{SampleFilter, ValidSample};

use super::intersection::{CircleIntersector, IntersectionResult};

/// Hashable identity of an unordered intersection point pair.
///
/// Coordinates are quantised to `epsilon` buckets and the two points are put
/// in canonical order, so `(a, b)` and `(b, a)` map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointPairKey {
    first: (i64, i64),
    second: (i64, i64),
}

impl PointPairKey {
    pub fn new(a: &Point2D, b: &Point2D, epsilon: f64) -> Self {
        let qa = quantize(a, epsilon);
        let qb = quantize(b, epsilon);
        if qa <= qb {
            Self { first: qa, second: qb }
        } else {
            Self { first: qb, second: qa }
        }
    }

    pub fn of(result: &IntersectionResult, epsilon: f64) -> Self {
        Self::new(&result.a, &result.b, epsilon)
    }
}

fn quantize(p: &Point2D, epsilon: f64) -> (i64, i64) {
    ((p.x / epsilon).round() as i64, (p.y / epsilon).round() as i64)
}

/// Deduplicated pairwise intersections, kept in insertion order
#[derive(Debug, Clone)]
pub struct CandidateSet {
    epsilon: f64,
    entries: Vec<IntersectionResult>,
    index: HashMap<PointPairKey, usize>,
}

impl CandidateSet {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert unless an equivalent point pair is already present.
    ///
    /// Returns `true` when the result became a new entry.
    pub fn insert(&mut self, result: IntersectionResult) -> bool {
        let key = PointPairKey::of(&result, self.epsilon);
        if self.index.contains_key(&key) {
            return false;
        }

        // Near-equal points can straddle a bucket edge
        if self.entries.iter().any(|existing| existing.same_points(&result, self.epsilon)) {
            return false;
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(result);
        true
    }

    pub fn contains(&self, result: &IntersectionResult) -> bool {
        self.index.contains_key(&PointPairKey::of(result, self.epsilon))
            || self.entries.iter().any(|existing| existing.same_points(result, self.epsilon))
    }

    pub fn get(&self, key: &PointPairKey) -> Option<&IntersectionResult> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntersectionResult> {
        self.entries.iter()
    }

    /// Every candidate point, both members of each pair
    pub fn points(&self) -> impl Iterator<Item = &Point2D> {
        self.entries.iter().flat_map(|entry| [&entry.a, &entry.b])
    }

    pub fn centroid(&self) -> Option<Point2D> {
        Point2D::centroid(self.points())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

/// Builds a [`CandidateSet`] from every beacon pair
#[derive(Debug, Clone, Copy)]
pub struct CandidateReconciler {
    pub intersector: CircleIntersector,
    pub dedup_epsilon: f64,
}

impl Default for CandidateReconciler {
    fn default() -> Self {
        Self {
            intersector: CircleIntersector::default(),
            dedup_epsilon: DEDUP_EPSILON,
        }
    }
}

impl CandidateReconciler {
    pub fn new(intersector: CircleIntersector, dedup_epsilon: f64) -> Self {
        Self {
            intersector,
            dedup_epsilon,
        }
    }

    /// Filter raw samples against the registry, then reconcile
    pub fn reconcile(&self, samples: &[RangeSample], registry: &AnchorRegistry) -> CandidateSet {
        let filtered = SampleFilter::apply(samples, registry);
        self.reconcile_valid(&filtered.accepted)
    }

    /// Intersect every unordered pair `i < j`; failing pairs are skipped
    pub fn reconcile_valid(&self, samples: &[ValidSample]) -> CandidateSet {
        let mut candidates = CandidateSet::new(self.dedup_epsilon);

        for (i, first) in samples.iter().enumerate() {
            for second in &samples[i + 1..] {
                if first.beacon_id == second.beacon_id {
                    continue;
                }

                let c1 = Circle::new(first.anchor, first.distance);
                let c2 = Circle::new(second.anchor, second.distance);

                if let Ok(result) =
                    self.intersector
                        .intersect_beacons(first.beacon_id, &c1, second.beacon_id, &c2)
                {
                    candidates.insert(result);
                }
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Anchor, BeaconId};
    use uuid::Uuid;

    fn id(minor: u16) -> BeaconId {
        BeaconId::new(Uuid::nil(), 1, minor)
    }

    fn valid(minor: u16, anchor: Point2D, truth: Point2D) -> ValidSample {
        ValidSample {
            beacon_id: id(minor),
            anchor,
            distance: anchor.distance_to(&truth),
        }
    }

    #[test]
    fn test_key_ignores_point_order() {
        let a = Point2D::new(1.0, 2.0);
        let b = Point2D::new(-3.0, 0.5);
        assert_eq!(PointPairKey::new(&a, &b, 1e-3), PointPairKey::new(&b, &a, 1e-3));
        assert_eq!(
            PointPairKey::new(&a, &b, 1e-3),
            PointPairKey::new(&Point2D::new(1.0002, 2.0001), &b, 1e-3)
        );
        assert_ne!(PointPairKey::new(&a, &b, 1e-3), PointPairKey::new(&a, &a, 1e-3));
    }

    #[test]
    fn test_set_collapses_reversed_and_near_pairs() {
        let mut set = CandidateSet::new(1e-3);
        let a = Point2D::new(2.0, 3.0);
        let b = Point2D::new(2.0, -3.0);

        assert!(set.insert(IntersectionResult { a, b, anchors: (id(1), id(2)) }));
        assert!(!set.insert(IntersectionResult { a: b, b: a, anchors: (id(3), id(4)) }));
        // Straddles the 0.5e-3 rounding edge but is still within epsilon
        assert!(!set.insert(IntersectionResult {
            a: Point2D::new(2.0004, 3.0006),
            b,
            anchors: (id(1), id(3)),
        }));
        assert!(set.insert(IntersectionResult {
            a: Point2D::new(5.0, 5.0),
            b,
            anchors: (id(2), id(3)),
        }));

        assert_eq!(set.len(), 2);
        assert_eq!(set.points().count(), 4);
        let first = set.get(&PointPairKey::new(&b, &a, 1e-3)).unwrap();
        assert_eq!(first.anchors, (id(1), id(2)));
    }

    #[test]
    fn test_coincident_beacon_pairs_give_one_entry() {
        // All four circles pass through (2, 3) and (2, -3): every beacon pair
        // crosses at the same two points.
        let truth = Point2D::new(2.0, 3.0);
        let samples = vec![
            valid(1, Point2D::new(0.0, 0.0), truth),
            valid(2, Point2D::new(4.0, 0.0), truth),
            valid(3, Point2D::new(-2.0, 0.0), truth),
            valid(4, Point2D::new(6.0, 0.0), truth),
        ];

        let set = CandidateReconciler::default().reconcile_valid(&samples);
        assert_eq!(set.len(), 1);

        let entry = set.iter().next().unwrap();
        assert!(
            entry.a.approx_eq(&truth, 1e-6) || entry.b.approx_eq(&truth, 1e-6),
            "{entry:?}"
        );
    }

    #[test]
    fn test_every_pair_is_visited() {
        let truth = Point2D::new(3.0, 4.0);
        let anchors = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(5.0, -3.0),
        ];
        let samples: Vec<ValidSample> = anchors
            .iter()
            .enumerate()
            .map(|(i, p)| valid(i as u16, *p, truth))
            .collect();

        let set = CandidateReconciler::default().reconcile_valid(&samples);

        // No two pairs share both crossing points here, so all 10 survive
        assert_eq!(set.len(), 10);
        for entry in set.iter() {
            assert!(entry.a.approx_eq(&truth, 1e-6) || entry.b.approx_eq(&truth, 1e-6));
        }

        let mut labelled: Vec<(u16, u16)> = set.iter().map(|e| (e.anchors.0.minor, e.anchors.1.minor)).collect();
        labelled.sort();
        let expected: Vec<(u16, u16)> = (0..5u16)
            .flat_map(|i| (i + 1..5).map(move |j| (i, j)))
            .collect();
        assert_eq!(labelled, expected);
    }

    #[test]
    fn test_concentric_pairs_are_skipped() {
        let samples = vec![
            ValidSample { beacon_id: id(1), anchor: Point2D::new(0.0, 0.0), distance: 1.0 },
            ValidSample { beacon_id: id(2), anchor: Point2D::new(0.0, 0.0), distance: 2.0 },
        ];
        assert!(CandidateReconciler::default().reconcile_valid(&samples).is_empty());
    }

    #[test]
    fn test_reconcile_filters_raw_samples() {
        let truth = Point2D::new(1.0, 1.0);
        let registry = AnchorRegistry::new(vec![
            Anchor::new(id(1), Point2D::new(0.0, 0.0)),
            Anchor::new(id(2), Point2D::new(4.0, 0.0)),
            Anchor::new(id(3), Point2D::new(0.0, 3.0)),
            Anchor::new(id(4), Point2D::new(4.0, 3.0)),
        ])
        .unwrap();

        let mut samples: Vec<RangeSample> = registry
            .iter()
            .map(|a| RangeSample::new(a.id, a.position.distance_to(&truth), 0))
            .collect();
        samples[3].distance = RangeSample::INVALID_DISTANCE;

        let set = CandidateReconciler::default().reconcile(&samples, &registry);
        // Three usable beacons: three pairs
        assert_eq!(set.len(), 3);
    }
}

//! Filtering of raw range samples before they reach the solvers

use std::collections::HashMap;

use crate::core::{AnchorRegistry, BeaconId, Point2D, RangeSample};

use super::error::PositionError;

/// Range sample resolved against the registry and checked for a usable distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidSample {
    pub beacon_id: BeaconId,
    pub anchor: Point2D,
    pub distance: f64,
}

/// Why a sample was left out of the solve
#[derive(Debug, Clone, PartialEq)]
pub enum SampleRejection {
    /// Beacon is not in the anchor registry
    UnknownBeacon(BeaconId),
    /// Sentinel, zero, negative or non-finite distance
    InvalidRange(PositionError),
    /// A newer sample for the same beacon is present in the input
    Superseded { beacon_id: BeaconId, captured_at_ms: u64 },
}

/// Result of filtering a batch of samples
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    /// Accepted samples, ordered by beacon id
    pub accepted: Vec<ValidSample>,
    pub rejected: Vec<SampleRejection>,
}

impl SampleFilter {
    /// Check a single sample against the registry
    pub fn validate(sample: &RangeSample, registry: &AnchorRegistry) -> Result<ValidSample, SampleRejection> {
        let anchor = registry
            .position(&sample.beacon_id)
            .ok_or(SampleRejection::UnknownBeacon(sample.beacon_id))?;

        if !sample.is_valid_distance() {
            return Err(SampleRejection::InvalidRange(PositionError::InvalidRange {
                beacon: sample.beacon_id,
                distance: sample.distance,
            }));
        }

        Ok(ValidSample {
            beacon_id: sample.beacon_id,
            anchor,
            distance: sample.distance,
        })
    }

    /// Keep the latest sample per known beacon, then check its distance.
    ///
    /// Ties on `captured_at_ms` go to the sample appearing later in `samples`.
    /// An unusable latest sample drops its beacon; older readings never
    /// stand in for it.
    pub fn apply(samples: &[RangeSample], registry: &AnchorRegistry) -> Self {
        let mut latest: HashMap<BeaconId, &RangeSample> = HashMap::new();
        let mut rejected = Vec::new();

        for sample in samples {
            if !registry.contains(&sample.beacon_id) {
                rejected.push(SampleRejection::UnknownBeacon(sample.beacon_id));
                continue;
            }

            match latest.get(&sample.beacon_id) {
                Some(held) if held.captured_at_ms > sample.captured_at_ms => {
                    rejected.push(SampleRejection::Superseded {
                        beacon_id: sample.beacon_id,
                        captured_at_ms: sample.captured_at_ms,
                    });
                }
                Some(held) => {
                    rejected.push(SampleRejection::Superseded {
                        beacon_id: held.beacon_id,
                        captured_at_ms: held.captured_at_ms,
                    });
                    latest.insert(sample.beacon_id, sample);
                }
                None => {
                    latest.insert(sample.beacon_id, sample);
                }
            }
        }

        let mut accepted = Vec::with_capacity(latest.len());
        for sample in latest.into_values() {
            match Self::validate(sample, registry) {
                Ok(valid) => accepted.push(valid),
                Err(rejection) => rejected.push(rejection),
            }
        }
        accepted.sort_by(|a, b| a.beacon_id.cmp(&b.beacon_id));

        Self { accepted, rejected }
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

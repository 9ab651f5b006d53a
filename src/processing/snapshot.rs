//! Latest-sample-per-beacon table and the immutable snapshots handed to the estimator
//!
//! Ranging callbacks write into a [`RangingTable`]; the render loop takes a
//! [`RangingSnapshot`] and passes it to the estimator. The estimator never
//! sees a half-updated measurement set.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::core::{AnchorRegistry, BeaconId, RangeSample};

/// Mutable last-value-wins store of range samples, keyed by beacon
#[derive(Debug, Clone, Default)]
pub struct RangingTable {
    latest: HashMap<BeaconId, RangeSample>,
}

impl RangingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `sample` unless a newer one is already held for its beacon.
    ///
    /// Returns `true` when the table changed.
    pub fn record(&mut self, sample: RangeSample) -> bool {
        if let Some(current) = self.latest.get(&sample.beacon_id) {
            if current.captured_at_ms > sample.captured_at_ms {
                debug!(
                    beacon = %sample.beacon_id,
                    held_ms = current.captured_at_ms,
                    received_ms = sample.captured_at_ms,
                    "ignoring out-of-order range sample"
                );
                return false;
            }
        }

        trace!(beacon = %sample.beacon_id, distance = sample.distance, "range sample recorded");
        self.latest.insert(sample.beacon_id, sample);
        true
    }

    /// Record every sample of one ranging callback
    pub fn record_all<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = RangeSample>,
    {
        let mut changed = 0;
        for sample in samples {
            if self.record(sample) {
                changed += 1;
            }
        }
        changed
    }

    /// Drop the sample of a beacon that left range
    pub fn remove(&mut self, beacon_id: &BeaconId) -> Option<RangeSample> {
        let removed = self.latest.remove(beacon_id);
        if removed.is_some() {
            debug!(beacon = %beacon_id, "beacon left range");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }

    pub fn get(&self, beacon_id: &BeaconId) -> Option<&RangeSample> {
        self.latest.get(beacon_id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Copy out every sample no older than `max_age_ms` at `now_ms`
    pub fn snapshot(&self, now_ms: u64, max_age_ms: u64) -> RangingSnapshot {
        let mut samples = Vec::with_capacity(self.latest.len());
        let mut stale = 0usize;

        for sample in self.latest.values() {
            if now_ms.saturating_sub(sample.captured_at_ms) > max_age_ms {
                stale += 1;
            } else {
                samples.push(sample.clone());
            }
        }

        if stale > 0 {
            debug!(stale, kept = samples.len(), max_age_ms, "excluded stale range samples");
        }

        samples.sort_by(|a, b| a.beacon_id.cmp(&b.beacon_id));
        RangingSnapshot {
            samples,
            taken_at_ms: now_ms,
        }
    }
}

/// Immutable set of fresh samples taken at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct RangingSnapshot {
    samples: Vec<RangeSample>,
    taken_at_ms: u64,
}

impl RangingSnapshot {
    pub fn samples(&self) -> &[RangeSample] {
        &self.samples
    }

    pub fn taken_at_ms(&self) -> u64 {
        self.taken_at_ms
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// At least `n` samples carry a usable distance
    pub fn has_minimum(&self, n: usize) -> bool {
        self.samples.iter().filter(|s| s.is_valid_distance()).count() >= n
    }

    /// Every registered beacon has a usable sample in this snapshot
    pub fn is_complete(&self, registry: &AnchorRegistry) -> bool {
        registry.ids().all(|id| {
            self.samples
                .iter()
                .any(|s| s.beacon_id == *id && s.is_valid_distance())
        })
    }
}

/// [`RangingTable`] shared between the ranging callback (single writer) and readers
#[derive(Debug, Clone, Default)]
pub struct SharedRangingTable {
    inner: Arc<RwLock<RangingTable>>,
}

impl SharedRangingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sample: RangeSample) -> bool {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).record(sample)
    }

    pub fn record_all<I>(&self, samples: I) -> usize
    where
        I: IntoIterator<Item = RangeSample>,
    {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).record_all(samples)
    }

    pub fn remove(&self, beacon_id: &BeaconId) -> Option<RangeSample> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).remove(beacon_id)
    }

    pub fn snapshot(&self, now_ms: u64, max_age_ms: u64) -> RangingSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(now_ms, max_age_ms)
    }
}

//! Last-known-position fallback for callers that render a fix every frame
//!
//! The estimator reports failures as errors. A UI usually wants to keep
//! drawing the previous position for a short while instead of blanking on
//! one bad snapshot; [`PositionTracker`] owns that policy.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::Point2D;
use crate::validation::PositionError;

/// How long a previous fix may stand in for a failed estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub max_hold_ms: u64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { max_hold_ms: 3_000 }
    }
}

/// Position to present for one update
#[derive(Debug, Clone, PartialEq)]
pub enum PositionFix {
    /// Estimate computed from the current snapshot
    Fresh(Point2D),
    /// Previous fix reused because the current estimate failed
    Held {
        position: Point2D,
        age_ms: u64,
        reason: PositionError,
    },
    /// No usable position
    Suppressed(PositionError),
}

impl PositionFix {
    pub fn position(&self) -> Option<Point2D> {
        match self {
            PositionFix::Fresh(position) | PositionFix::Held { position, .. } => Some(*position),
            PositionFix::Suppressed(_) => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, PositionFix::Fresh(_))
    }
}

/// Caller-owned cache of the last good position
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    policy: FallbackPolicy,
    last_good: Option<(Point2D, u64)>,
}

impl PositionTracker {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            policy,
            last_good: None,
        }
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Last good position, usable as a refinement seed
    pub fn last_known(&self) -> Option<Point2D> {
        self.last_good.map(|(position, _)| position)
    }

    pub fn reset(&mut self) {
        self.last_good = None;
    }

    /// Fold one estimator outcome observed at `now_ms` into the tracker
    pub fn update(&mut self, result: Result<Point2D, PositionError>, now_ms: u64) -> PositionFix {
        let reason = match result {
            Ok(position) => {
                self.last_good = Some((position, now_ms));
                return PositionFix::Fresh(position);
            }
            Err(reason) => reason,
        };

        match self.last_good {
            Some((position, at_ms)) => {
                let age_ms = now_ms.saturating_sub(at_ms);
                if age_ms <= self.policy.max_hold_ms {
                    debug!(age_ms, error = %reason, "holding last known position");
                    PositionFix::Held {
                        position,
                        age_ms,
                        reason,
                    }
                } else {
                    warn!(
                        age_ms,
                        max_hold_ms = self.policy.max_hold_ms,
                        error = %reason,
                        "last known position expired"
                    );
                    self.last_good = None;
                    PositionFix::Suppressed(reason)
                }
            }
            None => {
                debug!(error = %reason, "no position available");
                PositionFix::Suppressed(reason)
            }
        }
    }
}

//! Immutable beacon-to-anchor lookup

use std::collections::BTreeMap;

use thiserror::Error;

use super::types::{Anchor, BeaconId, Point2D};

/// Reasons an anchor set cannot become a registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("anchor registry must contain at least one anchor")]
    Empty,

    #[error("duplicate anchor for beacon {0}")]
    DuplicateBeacon(BeaconId),

    #[error("anchor {id} has non-finite position ({x}, {y})")]
    NonFinitePosition { id: BeaconId, x: f64, y: f64 },
}

/// Fixed mapping from beacon identity to its local-plane position.
///
/// Built once from configuration and never mutated; replacing the layout
/// means building a new registry.
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    anchors: BTreeMap<BeaconId, Anchor>,
}

impl AnchorRegistry {
    pub fn new<I>(anchors: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Anchor>,
    {
        let mut map = BTreeMap::new();

        for anchor in anchors {
            if !anchor.position.is_finite() {
                return Err(RegistryError::NonFinitePosition {
                    id: anchor.id,
                    x: anchor.position.x,
                    y: anchor.position.y,
                });
            }
            if map.contains_key(&anchor.id) {
                return Err(RegistryError::DuplicateBeacon(anchor.id));
            }
            map.insert(anchor.id, anchor);
        }

        if map.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self { anchors: map })
    }

    pub fn get(&self, id: &BeaconId) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn position(&self, id: &BeaconId) -> Option<Point2D> {
        self.anchors.get(id).map(|anchor| anchor.position)
    }

    pub fn contains(&self, id: &BeaconId) -> bool {
        self.anchors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in beacon-id order
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BeaconId> {
        self.anchors.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn anchor(minor: u16, x: f64, y: f64) -> Anchor {
        Anchor::new(BeaconId::new(Uuid::nil(), 1, minor), Point2D::new(x, y))
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AnchorRegistry::new(vec![anchor(4, 0.74, 1.75), anchor(2, -0.47, -2.72)]).unwrap();

        assert_eq!(registry.len(), 2);
        let id = BeaconId::new(Uuid::nil(), 1, 4);
        assert!(registry.contains(&id));
        assert_eq!(registry.position(&id), Some(Point2D::new(0.74, 1.75)));
        assert!(registry.get(&BeaconId::new(Uuid::nil(), 1, 9)).is_none());

        // BTreeMap order: minor 2 before minor 4
        let minors: Vec<u16> = registry.ids().map(|id| id.minor).collect();
        assert_eq!(minors, vec![2, 4]);
    }

    #[test]
    fn test_registry_rejects_bad_input() {
        assert_eq!(AnchorRegistry::new(Vec::new()).unwrap_err(), RegistryError::Empty);

        let err = AnchorRegistry::new(vec![anchor(1, 0.0, 0.0), anchor(1, 1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBeacon(id) if id.minor == 1));

        let err = AnchorRegistry::new(vec![anchor(1, f64::NAN, 0.0)]).unwrap_err();
        assert!(matches!(err, RegistryError::NonFinitePosition { .. }));
    }
}

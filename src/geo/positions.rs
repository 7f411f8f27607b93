//! Registry of projected entity positions.
//!
//! Filled once at setup from the city list and read by the camera sync
//! whenever the carousel moves.

use glam::Vec3;
use std::collections::HashMap;

/// Projected positions keyed by entity name.
#[derive(Debug, Default)]
pub struct PositionRegistry {
    positions: HashMap<String, Vec3>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or overwrites) the position for an entity.
    pub fn record(&mut self, entity: impl Into<String>, position: Vec3) {
        let entity = entity.into();
        log::debug!("Recorded position for {}: {:?}", entity, position);
        self.positions.insert(entity, position);
    }

    /// Returns the recorded position, or `None` if the entity was never
    /// positioned. A miss is never reported as the origin.
    pub fn lookup(&self, entity: &str) -> Option<Vec3> {
        self.positions.get(entity).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::project;

    #[test]
    fn test_record_and_lookup_paris() {
        let mut registry = PositionRegistry::new();
        registry.record("Paris", project(48.8566, 2.3522, 2.01));

        let pos = registry.lookup("Paris").unwrap();
        assert!((pos.length() - 2.01).abs() < 1e-4);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut registry = PositionRegistry::new();
        registry.record("Sydney", project(-33.8688, 151.2093, 2.01));

        assert_eq!(registry.lookup("Sydney"), registry.lookup("Sydney"));
    }

    #[test]
    fn test_miss_is_distinct_from_origin() {
        let mut registry = PositionRegistry::new();
        registry.record("Origin", Vec3::ZERO);

        assert_eq!(registry.lookup("Origin"), Some(Vec3::ZERO));
        assert_eq!(registry.lookup("Tokyo"), None);
    }
}

//! Label registry and swap protocol.
//!
//! Owns the single attached label per entity. Replacing a label detaches
//! and releases the previous visual in the same call, so the painter never
//! sees two labels for one entity and never sees a released one.

use glam::Vec3;
use std::collections::HashMap;

use super::factory::LabelVisual;

/// Errors from label placement.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelError {
    /// First label for an entity was set without a position.
    Unplaced(String),
    /// A ticketed update lost to a newer request for the same entity.
    Stale {
        entity: String,
        ticket: u64,
        current: u64,
    },
}

impl std::fmt::Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::Unplaced(entity) => {
                write!(f, "Label for {} has no position", entity)
            }
            LabelError::Stale {
                entity,
                ticket,
                current,
            } => write!(
                f,
                "Stale label update for {} (ticket {}, current {})",
                entity, ticket, current
            ),
        }
    }
}

impl std::error::Error for LabelError {}

/// Reservation taken when an asynchronous label update is requested.
///
/// Updates apply in reservation order, not completion order: a ticket is
/// rejected once any later reservation (or direct `set_label`) for the
/// same entity has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTicket {
    entity: String,
    seq: u64,
}

impl LabelTicket {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Position of this reservation in the entity's request order.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

struct LabelSlot {
    visual: LabelVisual,
    position: Vec3,
    /// Sequence number of the update currently attached.
    applied: u64,
}

/// The currently attached label per entity.
#[derive(Default)]
pub struct LabelRegistry {
    slots: HashMap<String, LabelSlot>,
    /// Last sequence number handed out per entity.
    issued: HashMap<String, u64>,
    /// Total number of visuals released so far.
    released: usize,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next update slot for `entity`.
    pub fn reserve(&mut self, entity: &str) -> LabelTicket {
        let seq = self.next_seq(entity);
        LabelTicket {
            entity: entity.to_string(),
            seq,
        }
    }

    /// Attaches `visual` as the label of `entity`.
    ///
    /// If the entity already has a label, the new visual takes over its
    /// position and the old visual is released; `position` is ignored.
    /// The first label of an entity must come with a position.
    pub fn set_label(
        &mut self,
        entity: &str,
        visual: LabelVisual,
        position: Option<Vec3>,
    ) -> Result<(), LabelError> {
        let seq = self.next_seq(entity);
        self.apply(entity, seq, visual, position)
    }

    /// Attaches `visual` under a previously reserved ticket.
    ///
    /// Returns `LabelError::Stale` (and releases `visual`) if a newer update
    /// for the same entity has already been applied.
    pub fn set_label_ticketed(
        &mut self,
        ticket: LabelTicket,
        visual: LabelVisual,
        position: Option<Vec3>,
    ) -> Result<(), LabelError> {
        if let Some(slot) = self.slots.get(&ticket.entity) {
            if ticket.seq <= slot.applied {
                let err = LabelError::Stale {
                    entity: ticket.entity,
                    ticket: ticket.seq,
                    current: slot.applied,
                };
                log::debug!("{}", err);
                self.release(visual);
                return Err(err);
            }
        }
        self.apply(&ticket.entity, ticket.seq, visual, position)
    }

    /// Moves an attached label. Returns false if the entity has no label.
    pub fn move_label(&mut self, entity: &str, position: Vec3) -> bool {
        match self.slots.get_mut(entity) {
            Some(slot) => {
                slot.position = position;
                true
            }
            None => false,
        }
    }

    /// Detaches and releases the label of `entity`, if any.
    pub fn remove(&mut self, entity: &str) -> bool {
        match self.slots.remove(entity) {
            Some(slot) => {
                self.release(slot.visual);
                true
            }
            None => false,
        }
    }

    /// Detaches and releases every label.
    pub fn clear(&mut self) {
        let entities: Vec<String> = self.slots.keys().cloned().collect();
        for entity in entities {
            self.remove(&entity);
        }
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.slots.contains_key(entity)
    }

    /// Returns the attached label and its position.
    pub fn get(&self, entity: &str) -> Option<(&LabelVisual, Vec3)> {
        self.slots.get(entity).map(|s| (&s.visual, s.position))
    }

    /// Iterates attached labels for painting.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, Vec3, &mut LabelVisual)> {
        self.slots
            .iter_mut()
            .map(|(entity, slot)| (entity.as_str(), slot.position, &mut slot.visual))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of visuals released since creation.
    pub fn released_count(&self) -> usize {
        self.released
    }

    fn next_seq(&mut self, entity: &str) -> u64 {
        let seq = self.issued.entry(entity.to_string()).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Swaps in `visual`. Runs to completion without yielding.
    fn apply(
        &mut self,
        entity: &str,
        seq: u64,
        visual: LabelVisual,
        position: Option<Vec3>,
    ) -> Result<(), LabelError> {
        if let Some(slot) = self.slots.get_mut(entity) {
            let old = std::mem::replace(&mut slot.visual, visual);
            slot.applied = seq;
            log::debug!(
                "Swapped label for {}: '{}' -> '{}'",
                entity,
                old.text(),
                slot.visual.text()
            );
            self.release(old);
            return Ok(());
        }

        match position {
            Some(position) => {
                log::debug!("Attached label for {}: '{}'", entity, visual.text());
                self.slots.insert(
                    entity.to_string(),
                    LabelSlot {
                        visual,
                        position,
                        applied: seq,
                    },
                );
                Ok(())
            }
            None => {
                self.release(visual);
                Err(LabelError::Unplaced(entity.to_string()))
            }
        }
    }

    fn release(&mut self, visual: LabelVisual) {
        self.released += 1;
        visual.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::factory::tests::FixedMeasure;
    use crate::label::{make_label, LabelStyle};

    fn label(text: &str) -> LabelVisual {
        make_label(text, &LabelStyle::default(), &FixedMeasure(0.5))
    }

    #[test]
    fn test_sequence_leaves_last_visual_attached() {
        let mut registry = LabelRegistry::new();
        registry
            .set_label("Paris", label("v1"), Some(Vec3::X))
            .unwrap();
        for text in ["v2", "v3", "v4"] {
            registry.set_label("Paris", label(text), None).unwrap();
        }

        assert_eq!(registry.len(), 1);
        let (visual, _) = registry.get("Paris").unwrap();
        assert_eq!(visual.text(), "v4");
        assert_eq!(registry.released_count(), 3);
    }

    #[test]
    fn test_swap_keeps_position() {
        let mut registry = LabelRegistry::new();
        let pos = Vec3::new(1.0, 2.0, 3.0);
        registry.set_label("Tokyo", label("Tokyo"), Some(pos)).unwrap();
        registry
            .set_label("Tokyo", label("Tokyo: 21°C"), Some(Vec3::ZERO))
            .unwrap();

        let (visual, position) = registry.get("Tokyo").unwrap();
        assert_eq!(visual.text(), "Tokyo: 21°C");
        assert_eq!(position, pos);
    }

    #[test]
    fn test_first_label_needs_position() {
        let mut registry = LabelRegistry::new();
        let err = registry.set_label("ISS", label("ISS: --"), None).unwrap_err();

        assert_eq!(err, LabelError::Unplaced("ISS".to_string()));
        assert!(!registry.contains("ISS"));
        // The rejected visual is still released
        assert_eq!(registry.released_count(), 1);
    }

    #[test]
    fn test_stale_ticket_rejected() {
        let mut registry = LabelRegistry::new();
        registry
            .set_label("Sydney", label("Sydney"), Some(Vec3::Y))
            .unwrap();

        let slow = registry.reserve("Sydney");
        let fast = registry.reserve("Sydney");

        registry
            .set_label_ticketed(fast, label("Sydney: 19°C"), None)
            .unwrap();
        let err = registry
            .set_label_ticketed(slow, label("Sydney: 18°C"), None)
            .unwrap_err();

        assert!(matches!(err, LabelError::Stale { .. }));
        assert_eq!(registry.get("Sydney").unwrap().0.text(), "Sydney: 19°C");
        // Original label swapped out, stale visual dropped
        assert_eq!(registry.released_count(), 2);
    }

    #[test]
    fn test_ticket_in_order_applies() {
        let mut registry = LabelRegistry::new();
        registry
            .set_label("Cape Town", label("Cape Town"), Some(Vec3::Z))
            .unwrap();

        let first = registry.reserve("Cape Town");
        let second = registry.reserve("Cape Town");
        assert_eq!(first.entity(), "Cape Town");

        registry
            .set_label_ticketed(first, label("Cape Town: 15°C"), None)
            .unwrap();
        registry
            .set_label_ticketed(second, label("Cape Town: 16°C"), None)
            .unwrap();

        assert_eq!(
            registry.get("Cape Town").unwrap().0.text(),
            "Cape Town: 16°C"
        );
    }

    #[test]
    fn test_direct_set_supersedes_older_ticket() {
        let mut registry = LabelRegistry::new();
        let ticket = registry.reserve("New York");
        registry
            .set_label("New York", label("New York"), Some(Vec3::X))
            .unwrap();

        let result = registry.set_label_ticketed(ticket, label("New York: 5°C"), None);
        assert!(result.is_err());
        assert_eq!(registry.get("New York").unwrap().0.text(), "New York");
    }

    #[test]
    fn test_move_and_remove() {
        let mut registry = LabelRegistry::new();
        assert!(!registry.move_label("ISS", Vec3::X));

        registry.set_label("ISS", label("ISS: --"), Some(Vec3::ZERO)).unwrap();
        assert!(registry.move_label("ISS", Vec3::X));
        assert_eq!(registry.get("ISS").unwrap().1, Vec3::X);

        assert!(registry.remove("ISS"));
        assert!(registry.is_empty());
        assert_eq!(registry.released_count(), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut registry = LabelRegistry::new();
        registry.set_label("a", label("a"), Some(Vec3::X)).unwrap();
        registry.set_label("b", label("b"), Some(Vec3::Y)).unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.released_count(), 2);
    }
}

//! Reaction statistics ledger and the product signal log.
//!
//! The ledger is updated exclusively by the reaction system and read by the
//! snapshot path. `reset` zeroes the counters without touching any entity.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Cumulative reaction counters for the whole run.
///
/// Counters are non-decreasing between explicit resets. Displacement and
/// liberation are two views of the same Rule A event: the factor leaving
/// the template, and the template becoming transcribable.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionLedger {
    /// Factor-displacement events (Rule A successes).
    pub displacements: u64,
    /// Templates liberated by Rule A.
    pub liberations: u64,
    /// Transcription events (Rule B successes).
    pub transcriptions: u64,
    /// Product signals emitted by Rule B.
    pub productions: u64,
}

impl ReactionLedger {
    /// Record one Rule A success.
    pub fn record_displacement(&mut self) {
        self.displacements += 1;
        self.liberations += 1;
    }

    /// Record one Rule B success.
    pub fn record_transcription(&mut self) {
        self.transcriptions += 1;
        self.productions += 1;
    }

    /// Zero all counters. Entity populations are untouched.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Ephemeral product signal emitted by a transcription event.
///
/// Read-only after creation; purged in batches once older than the
/// configured age threshold (simulating signal decay).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionProduct {
    pub x: f32,
    pub y: f32,
    /// Tick of emission.
    pub created_tick: u64,
    /// Identifier of the emitting template.
    pub template_id: u32,
}

/// Append-only log of product signals, purged periodically.
#[derive(Resource, Debug, Clone, Default)]
pub struct ProductLog {
    products: Vec<ReactionProduct>,
}

impl ProductLog {
    pub fn push(&mut self, product: ReactionProduct) {
        self.products.push(product);
    }

    /// Drop every product older than `max_age` ticks.
    pub fn purge_older_than(&mut self, tick: u64, max_age: u64) {
        self.products
            .retain(|p| tick.saturating_sub(p.created_tick) < max_age);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReactionProduct> {
        self.products.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_records_coupled_counters() {
        let mut ledger = ReactionLedger::default();
        ledger.record_displacement();
        ledger.record_displacement();
        ledger.record_transcription();
        assert_eq!(ledger.displacements, 2);
        assert_eq!(ledger.liberations, 2);
        assert_eq!(ledger.transcriptions, 1);
        assert_eq!(ledger.productions, 1);
    }

    #[test]
    fn test_ledger_reset_zeroes_everything() {
        let mut ledger = ReactionLedger::default();
        ledger.record_displacement();
        ledger.record_transcription();
        ledger.reset();
        assert_eq!(ledger, ReactionLedger::default());
    }

    #[test]
    fn test_product_purge_keeps_young_entries() {
        let mut log = ProductLog::default();
        for tick in [0, 100, 400] {
            log.push(ReactionProduct {
                x: 0.0,
                y: 0.0,
                created_tick: tick,
                template_id: 1,
            });
        }
        log.purge_older_than(500, 500);
        // Entry from tick 0 is exactly 500 ticks old and gets dropped.
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|p| p.created_tick > 0));
    }
}

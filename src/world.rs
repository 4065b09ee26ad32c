//! Snapshot types handed to the rendering sink.
//!
//! The `Snapshot` struct is a serializable view of the simulation state as
//! of the most recent tick. Building it never mutates the world, so two
//! snapshots without an intervening tick are identical.

use crate::components::*;
use crate::field::{FieldCache, FieldSnapshot};
use crate::ledger::{ProductLog, ReactionLedger, ReactionProduct};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// One pollutant's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantSnapshot {
    pub x: f32,
    pub y: f32,
    pub complexed: bool,
}

/// One template complex's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

/// One liberated template's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub transcribing: bool,
    pub product_count: u32,
}

/// One polymerase's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymeraseSnapshot {
    pub x: f32,
    pub y: f32,
    pub engaged: bool,
}

/// Live population counts per entity category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Populations {
    pub free_pollutants: usize,
    pub complexed_pollutants: usize,
    pub active_complexes: usize,
    pub inactive_complexes: usize,
    pub free_templates: usize,
    pub polymerases: usize,
    pub products: usize,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed ticks.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub pollutants: Vec<PollutantSnapshot>,
    pub complexes: Vec<ComplexSnapshot>,
    pub templates: Vec<TemplateSnapshot>,
    pub polymerases: Vec<PolymeraseSnapshot>,
    /// Product signals still alive (not yet purged).
    pub products: Vec<ReactionProduct>,
    /// Smoothed free-pollutant density grid.
    pub pollutant_field: FieldSnapshot,
    /// Smoothed active-complex density grid.
    pub complex_field: FieldSnapshot,
    /// Cumulative reaction counters.
    pub stats: ReactionLedger,
    pub populations: Populations,
}

impl Snapshot {
    /// Assemble a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut pollutants = Vec::new();
        let mut populations = Populations::default();

        let mut pollutant_query = world.query::<(&Position, &Pollutant)>();
        for (pos, pollutant) in pollutant_query.iter(world) {
            let complexed = !pollutant.is_free();
            if complexed {
                populations.complexed_pollutants += 1;
            } else {
                populations.free_pollutants += 1;
            }
            pollutants.push(PollutantSnapshot {
                x: pos.x,
                y: pos.y,
                complexed,
            });
        }

        let mut complexes = Vec::new();
        let mut complex_query = world.query::<(&Position, &TemplateComplex)>();
        for (pos, complex) in complex_query.iter(world) {
            if complex.active {
                populations.active_complexes += 1;
            } else {
                populations.inactive_complexes += 1;
            }
            complexes.push(ComplexSnapshot {
                id: complex.id,
                x: pos.x,
                y: pos.y,
                active: complex.active,
            });
        }

        let mut templates = Vec::new();
        let mut template_query = world.query::<(&Position, &FreeTemplate)>();
        for (pos, template) in template_query.iter(world) {
            templates.push(TemplateSnapshot {
                id: template.id,
                x: pos.x,
                y: pos.y,
                transcribing: template.transcribing,
                product_count: template.product_count,
            });
        }
        populations.free_templates = templates.len();

        let mut polymerases = Vec::new();
        let mut polymerase_query = world.query::<(&Position, &Polymerase)>();
        for (pos, polymerase) in polymerase_query.iter(world) {
            polymerases.push(PolymeraseSnapshot {
                x: pos.x,
                y: pos.y,
                engaged: polymerase.engaged,
            });
        }
        populations.polymerases = polymerases.len();

        let log = world.resource::<ProductLog>();
        let products: Vec<ReactionProduct> = log.iter().copied().collect();
        populations.products = products.len();

        let cache = world.resource::<FieldCache>();
        let pollutant_field = FieldSnapshot::from(&cache.pollutant);
        let complex_field = FieldSnapshot::from(&cache.complex);

        Self {
            tick,
            time,
            pollutants,
            complexes,
            templates,
            polymerases,
            products,
            pollutant_field,
            complex_field,
            stats: *world.resource::<ReactionLedger>(),
            populations,
        }
    }

    /// Serialize the snapshot to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the snapshot to a pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

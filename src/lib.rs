//! Strand-Displacement Sensor - Simulation Core
//!
//! A stochastic, fixed-timestep particle simulation of a molecular
//! strand-displacement sensing reaction in a 2D chamber. Uses `bevy_ecs`
//! for the entity-component-system architecture.
//!
//! Pollutant analytes displace the repressing strand of template-repressor
//! complexes; the liberated templates are then transcribed by polymerases
//! into fluorescent product signals. The observable output per tick is a
//! serializable [`Snapshot`].

pub mod api;
pub mod components;
pub mod config;
pub mod field;
pub mod ledger;
pub mod profiler;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{ChamberBounds, ConfigError, SimConfig};
pub use field::{ConcentrationField, FieldCache, FieldSnapshot};
pub use ledger::{ProductLog, ReactionLedger, ReactionProduct};
pub use systems::*;
pub use world::Snapshot;

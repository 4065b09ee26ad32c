//! ECS systems for the sensing-layer simulation.
//!
//! Every tick runs one chained, strictly sequential pass:
//!
//! 1. `flag_reset_system` - clears the previous tick's transient flags
//! 2. `brownian_motion_system` - damped random walk for mobile entities
//! 3. `reaction_system` - Rule A (displacement) and Rule B (transcription),
//!    at the configured reduced cadence
//! 4. `partner_sync_system` - anchored pollutants track their partner
//! 5. `field_refresh_system` - concentration grids, at their own cadence
//! 6. `product_purge_system` - drops aged product signals periodically
//!
//! Chaining makes each tick atomic from the caller's perspective; no system
//! ever observes a half-updated tick.

pub mod lifecycle;
pub mod motion;
pub mod reaction;

pub use lifecycle::*;
pub use motion::*;
pub use reaction::*;

use bevy_ecs::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Zero-based index of the tick currently being processed.
///
/// `SimWorld` sets this before running the schedule, so cadence checks of
/// the form `tick % interval == 0` fire on the very first advance.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

/// The simulation's single random source.
///
/// Seeded from `SimConfig::seed` for reproducible runs, from entropy
/// otherwise. All stochastic passes draw from this one stream, so a fixed
/// seed fixes the whole trajectory.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

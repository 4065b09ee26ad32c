//! Reaction rule engine - proximity-triggered stochastic state transitions.
//!
//! Two independent rules run at a reduced cadence, each over bounded-size
//! random subsets rather than exhaustive pairwise scans, so the per-tick
//! cost stays near-constant regardless of population size:
//!
//! - **Rule A (displacement)**: a free pollutant within radius of an active
//!   template complex displaces the regulatory factor. The complex is soft-
//!   deleted, a free template spawns at its location inheriting its id, and
//!   the pollutant is anchored at the reaction site.
//! - **Rule B (transcription)**: a polymerase within radius of a free
//!   template triggers an emission, gated by the template's refractory
//!   period. The product signal lands in the `ProductLog`.
//!
//! Failed proximity or probability checks are the expected common case and
//! have no side effects.

use crate::components::*;
use crate::config::SimConfig;
use crate::ledger::{ProductLog, ReactionLedger, ReactionProduct};
use crate::systems::{SimRng, SimTick};
use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Offset of the anchored pollutant from the reaction site.
const ANCHOR_OFFSET_X: f32 = 0.08;
/// Positional jitter applied to emitted product signals.
const PRODUCT_JITTER: f32 = 0.05;
/// Initial velocity jitter of a freshly liberated template.
const TEMPLATE_VELOCITY_JITTER: f32 = 0.015;

/// Exclusive system running both reaction rules at the configured cadence.
pub fn reaction_system(world: &mut World) {
    let tick = world.resource::<SimTick>().0;
    let config = world.resource::<SimConfig>().clone();
    if tick % config.reaction_interval != 0 {
        return;
    }

    let displaced = resolve_displacement(world, &config);
    let transcribed = resolve_transcription(world, &config, tick);
    if displaced + transcribed > 0 {
        debug!(tick, displaced, transcribed, "reaction pass");
    }
}

/// Truncate `candidates` to a random subset of at most `cap` elements,
/// in randomized order (no positional bias).
fn sample_in_place<T, R: Rng>(candidates: &mut Vec<T>, cap: usize, rng: &mut R) {
    let n = cap.min(candidates.len());
    candidates.partial_shuffle(rng, n);
    candidates.truncate(n);
}

struct DisplacementEvent {
    pollutant: Entity,
    complex: Entity,
    complex_id: u32,
    x: f32,
    y: f32,
    template_vx: f32,
    template_vy: f32,
}

fn resolve_displacement(world: &mut World, config: &SimConfig) -> usize {
    let mut pollutants: Vec<(Entity, f32, f32)> = world
        .query::<(Entity, &Position, &Pollutant)>()
        .iter(world)
        .filter(|(_, _, p)| p.is_free())
        .map(|(e, pos, _)| (e, pos.x, pos.y))
        .collect();
    let mut complexes: Vec<(Entity, f32, f32, u32)> = world
        .query::<(Entity, &Position, &TemplateComplex)>()
        .iter(world)
        .filter(|(_, _, c)| c.active)
        .map(|(e, pos, c)| (e, pos.x, pos.y, c.id))
        .collect();
    // Exhausted populations are a silent skip, not an error.
    if pollutants.is_empty() || complexes.is_empty() {
        return 0;
    }

    let radius_sq = config.displacement_radius * config.displacement_radius;
    let mut events: Vec<DisplacementEvent> = Vec::new();
    {
        let mut rng = world.resource_mut::<SimRng>();
        let rng = &mut rng.0;
        sample_in_place(&mut pollutants, config.displacement_pollutant_samples, rng);
        sample_in_place(&mut complexes, config.displacement_complex_samples, rng);

        let mut consumed = vec![false; complexes.len()];
        for &(pollutant, px, py) in &pollutants {
            for (idx, &(complex, cx, cy, complex_id)) in complexes.iter().enumerate() {
                if consumed[idx] {
                    continue;
                }
                let d_sq = (px - cx) * (px - cx) + (py - cy) * (py - cy);
                if d_sq >= radius_sq {
                    continue;
                }
                if rng.gen::<f32>() >= config.displacement_probability {
                    continue;
                }
                consumed[idx] = true;
                events.push(DisplacementEvent {
                    pollutant,
                    complex,
                    complex_id,
                    x: cx,
                    y: cy,
                    template_vx: rng
                        .gen_range(-TEMPLATE_VELOCITY_JITTER..=TEMPLATE_VELOCITY_JITTER),
                    template_vy: rng
                        .gen_range(-TEMPLATE_VELOCITY_JITTER..=TEMPLATE_VELOCITY_JITTER),
                });
                // First match wins: at most one reaction per pollutant per pass.
                break;
            }
        }
    }

    let count = events.len();
    let max_x = config.chamber().max_x;
    for ev in events {
        if let Some(mut complex) = world.get_mut::<TemplateComplex>(ev.complex) {
            complex.active = false;
        }
        if let Some(mut pollutant) = world.get_mut::<Pollutant>(ev.pollutant) {
            pollutant.state = PollutantState::Complexed;
        }
        if let Some(mut vel) = world.get_mut::<Velocity>(ev.pollutant) {
            *vel = Velocity::default();
        }
        // Anchor just beside the reaction site, clamped so a wall-adjacent
        // complex cannot push its pollutant outside the chamber.
        let anchor_x = (ev.x + ANCHOR_OFFSET_X).min(max_x);
        if let Some(mut pos) = world.get_mut::<Position>(ev.pollutant) {
            pos.x = anchor_x;
            pos.y = ev.y;
        }
        world.entity_mut(ev.pollutant).insert(BoundTo {
            partner: ev.complex,
            offset_x: anchor_x - ev.x,
            offset_y: 0.0,
        });
        world.spawn(FreeTemplateBundle::new(
            ev.complex_id,
            ev.x,
            ev.y,
            ev.template_vx,
            ev.template_vy,
            config.template_motility,
        ));
        world.resource_mut::<ReactionLedger>().record_displacement();
    }
    count
}

struct TranscriptionEvent {
    polymerase: Entity,
    template: Entity,
    template_id: u32,
    x: f32,
    y: f32,
}

fn resolve_transcription(world: &mut World, config: &SimConfig, tick: u64) -> usize {
    let mut polymerases: Vec<(Entity, f32, f32)> = world
        .query::<(Entity, &Position, &Polymerase)>()
        .iter(world)
        .filter(|(_, _, p)| !p.engaged)
        .map(|(e, pos, _)| (e, pos.x, pos.y))
        .collect();
    let mut templates: Vec<(Entity, f32, f32, u32, bool)> = world
        .query::<(Entity, &Position, &FreeTemplate)>()
        .iter(world)
        .filter(|(_, _, t)| !t.transcribing)
        .map(|(e, pos, t)| {
            (
                e,
                pos.x,
                pos.y,
                t.id,
                t.can_emit(tick, config.refractory_ticks),
            )
        })
        .collect();
    if polymerases.is_empty() || templates.is_empty() {
        return 0;
    }

    let radius_sq = config.transcription_radius * config.transcription_radius;
    let mut events: Vec<TranscriptionEvent> = Vec::new();
    {
        let mut rng = world.resource_mut::<SimRng>();
        let rng = &mut rng.0;
        sample_in_place(
            &mut polymerases,
            config.transcription_polymerase_samples,
            rng,
        );
        sample_in_place(&mut templates, config.transcription_template_samples, rng);

        let mut emitting = vec![false; templates.len()];
        for &(polymerase, px, py) in &polymerases {
            for (idx, &(template, tx, ty, template_id, ready)) in templates.iter().enumerate() {
                if emitting[idx] {
                    continue;
                }
                let d_sq = (px - tx) * (px - tx) + (py - ty) * (py - ty);
                if d_sq >= radius_sq {
                    continue;
                }
                if rng.gen::<f32>() >= config.transcription_probability {
                    continue;
                }
                // A refractory template absorbs the encounter without
                // emitting; the polymerase keeps scanning.
                if !ready {
                    continue;
                }
                emitting[idx] = true;
                events.push(TranscriptionEvent {
                    polymerase,
                    template,
                    template_id,
                    x: tx + rng.gen_range(-PRODUCT_JITTER..=PRODUCT_JITTER),
                    y: ty + rng.gen_range(-PRODUCT_JITTER..=PRODUCT_JITTER),
                });
                // One emission per polymerase per pass.
                break;
            }
        }
    }

    let count = events.len();
    for ev in events {
        if let Some(mut template) = world.get_mut::<FreeTemplate>(ev.template) {
            template.transcribing = true;
            template.product_count += 1;
            template.last_emission = Some(tick);
        }
        if let Some(mut polymerase) = world.get_mut::<Polymerase>(ev.polymerase) {
            polymerase.engaged = true;
        }
        world.resource_mut::<ProductLog>().push(ReactionProduct {
            x: ev.x,
            y: ev.y,
            created_tick: tick,
            template_id: ev.template_id,
        });
        world.resource_mut::<ReactionLedger>().record_transcription();
    }
    count
}

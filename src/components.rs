//! ECS components for the sensing-layer simulation.
//!
//! Components are pure data containers attached to entities.
//! All reaction and motion logic lives in systems that query them.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position inside the reaction chamber.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D velocity vector.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Rescale to `max_speed` if faster, preserving direction.
    pub fn clamp_speed(&mut self, max_speed: f32) {
        let speed = self.magnitude();
        if speed > max_speed && speed > 0.0 {
            self.vx = (self.vx / speed) * max_speed;
            self.vy = (self.vy / speed) * max_speed;
        }
    }
}

/// Brownian-motion parameters for one entity kind.
///
/// Each tick the motion integrator draws a Gaussian kick scaled by
/// `sqrt(2 * diffusion * dt)`, feeds a `drive` fraction of it into the
/// velocity, applies multiplicative `friction` and clamps to `max_speed`.
/// Wall hits invert the velocity component scaled by `restitution`.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Motility {
    /// Diffusion coefficient (scales the Brownian kick).
    pub diffusion: f32,
    /// Fraction of the kick fed into velocity per tick.
    pub drive: f32,
    /// Multiplicative velocity decay per tick.
    pub friction: f32,
    /// Speed ceiling (direction-preserving clamp).
    pub max_speed: f32,
    /// Inelastic wall reflection factor, in [0, 1].
    pub restitution: f32,
    /// Physical radius; keeps the entity strictly inside the walls.
    pub size: f32,
}

impl Motility {
    pub fn pollutant() -> Self {
        Self {
            diffusion: 0.012,
            drive: 0.1,
            friction: 0.995,
            max_speed: 0.025,
            restitution: 0.8,
            size: 0.015,
        }
    }

    pub fn template_complex() -> Self {
        Self {
            diffusion: 0.008,
            drive: 0.08,
            friction: 0.99,
            max_speed: 0.015,
            restitution: 0.8,
            size: 0.03,
        }
    }

    pub fn free_template() -> Self {
        Self {
            diffusion: 0.012,
            drive: 0.1,
            friction: 0.985,
            max_speed: 0.02,
            restitution: 0.8,
            size: 0.025,
        }
    }

    pub fn polymerase() -> Self {
        Self {
            diffusion: 0.008,
            drive: 0.1,
            friction: 0.995,
            max_speed: 0.025,
            restitution: 0.8,
            size: 0.035,
        }
    }
}

// ============================================================================
// REACTION-STATE COMPONENTS
// ============================================================================

/// Reaction state of a pollutant molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollutantState {
    /// Diffusing freely, eligible for the displacement reaction.
    #[default]
    Free,
    /// Captured into a pollutant-factor complex; anchored, never reverts.
    Complexed,
}

/// Pollutant analog (e.g. tetracycline).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pollutant {
    pub state: PollutantState,
}

impl Pollutant {
    pub fn is_free(&self) -> bool {
        self.state == PollutantState::Free
    }
}

/// Anchor to a reaction partner. Attached to complexed pollutants; the
/// position is re-synchronized to the partner plus the offset each tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoundTo {
    pub partner: Entity,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Repressed template bound to a regulatory factor.
///
/// `active == false` is a soft deletion: the entity stays in the world for
/// identifier stability, but is excluded from motion, reaction sampling and
/// field estimation.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemplateComplex {
    pub id: u32,
    pub active: bool,
}

impl TemplateComplex {
    pub fn new(id: u32) -> Self {
        Self { id, active: true }
    }
}

/// Liberated template, transcriptionally active for the rest of the run.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FreeTemplate {
    /// Identifier inherited from the consumed complex.
    pub id: u32,
    /// Set for the tick of an emission, cleared at the next tick start.
    pub transcribing: bool,
    /// Cumulative products emitted by this template.
    pub product_count: u32,
    /// Tick of the last emission; `None` before the first one.
    pub last_emission: Option<u64>,
}

impl FreeTemplate {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            transcribing: false,
            product_count: 0,
            last_emission: None,
        }
    }

    /// Whether the refractory gap has elapsed since the last emission.
    pub fn can_emit(&self, tick: u64, refractory_ticks: u64) -> bool {
        match self.last_emission {
            None => true,
            Some(last) => tick.saturating_sub(last) > refractory_ticks,
        }
    }
}

/// Mobile catalyst. `engaged` is a transient per-tick visual flag.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Polymerase {
    pub engaged: bool,
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a pollutant molecule.
#[derive(Bundle)]
pub struct PollutantBundle {
    pub pollutant: Pollutant,
    pub position: Position,
    pub velocity: Velocity,
    pub motility: Motility,
}

impl PollutantBundle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, motility: Motility) -> Self {
        Self {
            pollutant: Pollutant::default(),
            position: Position::new(x, y),
            velocity: Velocity::new(vx, vy),
            motility,
        }
    }
}

/// Bundle for spawning a repressed template complex.
#[derive(Bundle)]
pub struct TemplateComplexBundle {
    pub complex: TemplateComplex,
    pub position: Position,
    pub velocity: Velocity,
    pub motility: Motility,
}

impl TemplateComplexBundle {
    pub fn new(id: u32, x: f32, y: f32, vx: f32, vy: f32, motility: Motility) -> Self {
        Self {
            complex: TemplateComplex::new(id),
            position: Position::new(x, y),
            velocity: Velocity::new(vx, vy),
            motility,
        }
    }
}

/// Bundle for spawning a liberated template at a reaction site.
#[derive(Bundle)]
pub struct FreeTemplateBundle {
    pub template: FreeTemplate,
    pub position: Position,
    pub velocity: Velocity,
    pub motility: Motility,
}

impl FreeTemplateBundle {
    pub fn new(id: u32, x: f32, y: f32, vx: f32, vy: f32, motility: Motility) -> Self {
        Self {
            template: FreeTemplate::new(id),
            position: Position::new(x, y),
            velocity: Velocity::new(vx, vy),
            motility,
        }
    }
}

/// Bundle for spawning a polymerase.
#[derive(Bundle)]
pub struct PolymeraseBundle {
    pub polymerase: Polymerase,
    pub position: Position,
    pub velocity: Velocity,
    pub motility: Motility,
}

impl PolymeraseBundle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, motility: Motility) -> Self {
        Self {
            polymerase: Polymerase::default(),
            position: Position::new(x, y),
            velocity: Velocity::new(vx, vy),
            motility,
        }
    }
}

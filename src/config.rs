//! Simulation configuration and validation.
//!
//! `SimConfig` carries everything `SimWorld::new` needs: chamber geometry,
//! population counts, Brownian-motion parameters per entity kind, reaction
//! probabilities and radii, and the cadences of the reduced-rate passes.
//! Validation runs up front; a bad config never yields a partial instance.

use crate::components::Motility;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned chamber rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChamberBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ChamberBounds {
    /// Rectangle of the given dimensions centered at the origin.
    pub fn centered(width: f32, height: f32) -> Self {
        Self {
            min_x: -width / 2.0,
            max_x: width / 2.0,
            min_y: -height / 2.0,
            max_y: height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Whether a point lies inside the rectangle shrunk by `margin`.
    pub fn contains(&self, x: f32, y: f32, margin: f32) -> bool {
        x >= self.min_x + margin
            && x <= self.max_x - margin
            && y >= self.min_y + margin
            && y <= self.max_y - margin
    }
}

/// Configuration error reported synchronously by `SimWorld::new`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("chamber dimensions must be positive and finite, got {width} x {height}")]
    InvalidChamber { width: f32, height: f32 },
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f32 },
    #[error("{name} population must be at least 1")]
    EmptyPopulation { name: &'static str },
    #[error("{name} must be at least 1 tick")]
    ZeroCadence { name: &'static str },
    #[error("field grid size must be at least 2 cells per axis")]
    InvalidGrid,
    #[error("field smoothing factor must lie in (0, 1], got {value}")]
    InvalidSmoothing { value: f32 },
}

/// Full simulation configuration.
///
/// Defaults reproduce the reference chamber: 6 x 4 units, a pollutant
/// plume in the upper-left, repressed templates in the upper-right.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Chamber width in world units.
    pub width: f32,
    /// Chamber height in world units.
    pub height: f32,
    /// Tick duration `dt`.
    pub dt: f32,
    /// RNG seed; identical seeds reproduce runs exactly.
    pub seed: Option<u64>,

    /// Pollutant population (constant for the whole run).
    pub pollutants: usize,
    /// Initially repressed template-complex population.
    pub template_complexes: usize,
    /// Polymerase population; zero disables transcription entirely.
    pub polymerases: usize,

    /// Interaction radius for the displacement reaction (Rule A).
    pub displacement_radius: f32,
    /// Per-pair success probability for Rule A.
    pub displacement_probability: f32,
    /// Pollutant sample cap per Rule A pass.
    pub displacement_pollutant_samples: usize,
    /// Complex sample cap per Rule A pass.
    pub displacement_complex_samples: usize,

    /// Interaction radius for the transcription reaction (Rule B).
    pub transcription_radius: f32,
    /// Per-pair success probability for Rule B.
    pub transcription_probability: f32,
    /// Polymerase sample cap per Rule B pass.
    pub transcription_polymerase_samples: usize,
    /// Template sample cap per Rule B pass.
    pub transcription_template_samples: usize,
    /// Minimum tick gap between emissions of one template.
    pub refractory_ticks: u64,

    /// Reaction passes run every this many ticks.
    pub reaction_interval: u64,
    /// Concentration fields refresh every this many ticks.
    pub field_interval: u64,
    /// Product purge runs every this many ticks.
    pub purge_interval: u64,
    /// Products older than this many ticks are purged (signal decay).
    pub product_max_age: u64,

    /// Field grid resolution per axis.
    pub grid_size: usize,
    /// Gaussian kernel bandwidth of the field estimator.
    pub kernel_sigma: f32,
    /// EMA blend factor for field refreshes, in (0, 1].
    pub field_smoothing: f32,

    pub pollutant_motility: Motility,
    pub complex_motility: Motility,
    pub template_motility: Motility,
    pub polymerase_motility: Motility,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 6.0,
            height: 4.0,
            dt: 0.1,
            seed: None,
            pollutants: 1000,
            template_complexes: 1000,
            polymerases: 150,
            displacement_radius: 0.15,
            displacement_probability: 0.4,
            displacement_pollutant_samples: 50,
            displacement_complex_samples: 30,
            transcription_radius: 0.18,
            transcription_probability: 0.6,
            transcription_polymerase_samples: 25,
            transcription_template_samples: 20,
            refractory_ticks: 15,
            reaction_interval: 2,
            field_interval: 2,
            purge_interval: 100,
            product_max_age: 500,
            grid_size: 20,
            kernel_sigma: 0.15,
            field_smoothing: 0.5,
            pollutant_motility: Motility::pollutant(),
            complex_motility: Motility::template_complex(),
            template_motility: Motility::free_template(),
            polymerase_motility: Motility::polymerase(),
        }
    }
}

impl SimConfig {
    /// Chamber rectangle, centered at the origin.
    pub fn chamber(&self) -> ChamberBounds {
        ChamberBounds::centered(self.width, self.height)
    }

    /// Validate the whole configuration. Called by `SimWorld::new`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(ConfigError::InvalidChamber {
                width: self.width,
                height: self.height,
            });
        }
        check_positive("dt", self.dt)?;
        check_positive("displacement_radius", self.displacement_radius)?;
        check_positive("transcription_radius", self.transcription_radius)?;
        check_positive("kernel_sigma", self.kernel_sigma)?;
        check_probability("displacement_probability", self.displacement_probability)?;
        check_probability("transcription_probability", self.transcription_probability)?;

        // Pollutants and templates drive the sensing reaction; polymerases
        // may legitimately be absent (transcription then never fires).
        if self.pollutants == 0 {
            return Err(ConfigError::EmptyPopulation { name: "pollutant" });
        }
        if self.template_complexes == 0 {
            return Err(ConfigError::EmptyPopulation {
                name: "template complex",
            });
        }

        check_cadence("reaction_interval", self.reaction_interval)?;
        check_cadence("field_interval", self.field_interval)?;
        check_cadence("purge_interval", self.purge_interval)?;

        if self.grid_size < 2 {
            return Err(ConfigError::InvalidGrid);
        }
        if !(self.field_smoothing > 0.0 && self.field_smoothing <= 1.0) {
            return Err(ConfigError::InvalidSmoothing {
                value: self.field_smoothing,
            });
        }

        for (name, motility) in [
            ("pollutant diffusion", &self.pollutant_motility),
            ("complex diffusion", &self.complex_motility),
            ("template diffusion", &self.template_motility),
            ("polymerase diffusion", &self.polymerase_motility),
        ] {
            if !motility.diffusion.is_finite() || motility.diffusion < 0.0 {
                return Err(ConfigError::NonPositive {
                    name,
                    value: motility.diffusion,
                });
            }
        }
        Ok(())
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(())
}

fn check_probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ProbabilityOutOfRange { name, value });
    }
    Ok(())
}

fn check_cadence(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCadence { name });
    }
    Ok(())
}

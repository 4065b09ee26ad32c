//! Concentration field estimation.
//!
//! Each field is a fixed-resolution grid over the chamber; every refresh
//! accumulates a Gaussian-kernel contribution from each active entity of
//! one kind, then blends the fresh grid into the previous one with an
//! exponential moving average so consecutive frames stay smooth.
//!
//! Cost is O(grid cells x active entities). With the `parallel` feature the
//! per-row accumulation fans out across cores.

use crate::config::{ChamberBounds, SimConfig};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Smoothed spatial density estimate over a fixed grid.
#[derive(Debug, Clone)]
pub struct ConcentrationField {
    /// Grid node x-coordinates (uniform over the chamber width).
    xs: Vec<f32>,
    /// Grid node y-coordinates (uniform over the chamber height).
    ys: Vec<f32>,
    /// Row-major values, `ys.len()` rows of `xs.len()` columns.
    values: Vec<f32>,
    /// Kernel bandwidth.
    sigma: f32,
    /// False until the first refresh; the first fresh grid is adopted
    /// as-is instead of being blended with the all-zero initial state.
    primed: bool,
}

impl ConcentrationField {
    pub fn new(bounds: ChamberBounds, grid_size: usize, sigma: f32) -> Self {
        Self {
            xs: linspace(bounds.min_x, bounds.max_x, grid_size),
            ys: linspace(bounds.min_y, bounds.max_y, grid_size),
            values: vec![0.0; grid_size * grid_size],
            sigma,
            primed: false,
        }
    }

    pub fn width(&self) -> usize {
        self.xs.len()
    }

    pub fn height(&self) -> usize {
        self.ys.len()
    }

    /// Row-major grid values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn value_at(&self, col: usize, row: usize) -> f32 {
        self.values[row * self.xs.len() + col]
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Re-estimate the field from `positions` and blend via EMA.
    ///
    /// An empty input yields a well-defined all-zero fresh grid.
    pub fn refresh(&mut self, positions: &[(f32, f32)], smoothing: f32) {
        let fresh = self.accumulate(positions);
        if !self.primed {
            self.values = fresh;
            self.primed = true;
        } else {
            for (old, new) in self.values.iter_mut().zip(fresh) {
                *old = smoothing * new + (1.0 - smoothing) * *old;
            }
        }
    }

    fn accumulate(&self, positions: &[(f32, f32)]) -> Vec<f32> {
        let mut fresh = vec![0.0f32; self.xs.len() * self.ys.len()];
        if positions.is_empty() {
            return fresh;
        }
        let inv_two_sigma_sq = 1.0 / (2.0 * self.sigma * self.sigma);

        #[cfg(feature = "parallel")]
        fresh
            .par_chunks_mut(self.xs.len())
            .zip(self.ys.par_iter())
            .for_each(|(row, &gy)| {
                accumulate_row(row, &self.xs, gy, positions, inv_two_sigma_sq);
            });

        #[cfg(not(feature = "parallel"))]
        for (row, &gy) in fresh.chunks_mut(self.xs.len()).zip(self.ys.iter()) {
            accumulate_row(row, &self.xs, gy, positions, inv_two_sigma_sq);
        }

        fresh
    }
}

fn accumulate_row(
    row: &mut [f32],
    xs: &[f32],
    gy: f32,
    positions: &[(f32, f32)],
    inv_two_sigma_sq: f32,
) {
    for (cell, &gx) in row.iter_mut().zip(xs) {
        let mut sum = 0.0;
        for &(px, py) in positions {
            let d_sq = (px - gx) * (px - gx) + (py - gy) * (py - gy);
            sum += (-d_sq * inv_two_sigma_sq).exp();
        }
        *cell = sum;
    }
}

fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    let step = (end - start) / (n - 1) as f32;
    (0..n).map(|i| start + step * i as f32).collect()
}

/// The two smoothed fields kept by the simulation: free-pollutant density
/// and active-complex density.
#[derive(Resource, Debug, Clone)]
pub struct FieldCache {
    pub pollutant: ConcentrationField,
    pub complex: ConcentrationField,
}

impl FieldCache {
    pub fn new(config: &SimConfig) -> Self {
        let bounds = config.chamber();
        Self {
            pollutant: ConcentrationField::new(bounds, config.grid_size, config.kernel_sigma),
            complex: ConcentrationField::new(bounds, config.grid_size, config.kernel_sigma),
        }
    }
}

/// Serializable view of one field for the rendering sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl From<&ConcentrationField> for FieldSnapshot {
    fn from(field: &ConcentrationField) -> Self {
        Self {
            width: field.width(),
            height: field.height(),
            values: field.values().to_vec(),
        }
    }
}

/// System that refreshes both density grids at the field cadence.
///
/// Complexed pollutants and consumed complexes contribute nothing; the
/// fields describe the reactive populations only.
pub fn field_refresh_system(
    config: Res<SimConfig>,
    tick: Res<crate::systems::SimTick>,
    mut cache: ResMut<FieldCache>,
    pollutants: Query<(&crate::components::Position, &crate::components::Pollutant)>,
    complexes: Query<(&crate::components::Position, &crate::components::TemplateComplex)>,
) {
    if tick.0 % config.field_interval != 0 {
        return;
    }

    let free_pollutants: Vec<(f32, f32)> = pollutants
        .iter()
        .filter(|(_, p)| p.is_free())
        .map(|(pos, _)| (pos.x, pos.y))
        .collect();
    let active_complexes: Vec<(f32, f32)> = complexes
        .iter()
        .filter(|(_, c)| c.active)
        .map(|(pos, _)| (pos.x, pos.y))
        .collect();

    cache
        .pollutant
        .refresh(&free_pollutants, config.field_smoothing);
    cache
        .complex
        .refresh(&active_complexes, config.field_smoothing);
}

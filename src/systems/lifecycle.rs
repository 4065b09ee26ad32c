//! Per-tick housekeeping: transient flag clearing and product decay.

use crate::components::{FreeTemplate, Polymerase};
use crate::config::SimConfig;
use crate::ledger::ProductLog;
use crate::systems::SimTick;
use bevy_ecs::prelude::*;

/// System that clears the previous tick's transient flags.
///
/// Runs first in the schedule, so `transcribing` and `engaged` are only
/// ever observed for the tick in which the reaction happened.
pub fn flag_reset_system(
    mut templates: Query<&mut FreeTemplate>,
    mut polymerases: Query<&mut Polymerase>,
) {
    for mut template in templates.iter_mut() {
        if template.transcribing {
            template.transcribing = false;
        }
    }
    for mut polymerase in polymerases.iter_mut() {
        if polymerase.engaged {
            polymerase.engaged = false;
        }
    }
}

/// System that purges aged product signals in batches.
pub fn product_purge_system(
    config: Res<SimConfig>,
    tick: Res<SimTick>,
    mut log: ResMut<ProductLog>,
) {
    if tick.0 % config.purge_interval != 0 {
        return;
    }
    log.purge_older_than(tick.0, config.product_max_age);
}

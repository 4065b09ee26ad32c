//! Motion integrator - damped Brownian random walk with reflecting walls.

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::SimRng;
use bevy_ecs::prelude::*;
use rand::Rng;
use rand_distr::StandardNormal;

/// Resource containing the fixed tick duration.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);

/// System that advances every mobile entity by one Brownian step.
///
/// Complexed pollutants and inactive complexes skip independent motion;
/// the former are re-anchored by `partner_sync_system` afterwards.
pub fn brownian_motion_system(
    config: Res<SimConfig>,
    dt: Res<DeltaTime>,
    mut rng: ResMut<SimRng>,
    mut query: Query<(
        &mut Position,
        &mut Velocity,
        &Motility,
        Option<&Pollutant>,
        Option<&TemplateComplex>,
    )>,
) {
    let bounds = config.chamber();
    let delta = dt.0;

    for (mut pos, mut vel, motility, pollutant, complex) in query.iter_mut() {
        if pollutant.is_some_and(|p| !p.is_free()) {
            continue;
        }
        if complex.is_some_and(|c| !c.active) {
            continue;
        }

        // Zero-mean Gaussian kick, variance 2 * D * dt.
        let sigma = (2.0 * motility.diffusion * delta).sqrt();
        let kick_x: f32 = rng.0.sample::<f32, _>(StandardNormal) * sigma;
        let kick_y: f32 = rng.0.sample::<f32, _>(StandardNormal) * sigma;

        vel.vx += kick_x * motility.drive;
        vel.vy += kick_y * motility.drive;
        vel.vx *= motility.friction;
        vel.vy *= motility.friction;
        vel.clamp_speed(motility.max_speed);

        pos.x += vel.vx;
        pos.y += vel.vy;

        // Inelastic wall reflection; the size margin prevents tunneling.
        let min_x = bounds.min_x + motility.size;
        let max_x = bounds.max_x - motility.size;
        if pos.x <= min_x || pos.x >= max_x {
            vel.vx *= -motility.restitution;
            pos.x = pos.x.clamp(min_x, max_x);
        }
        let min_y = bounds.min_y + motility.size;
        let max_y = bounds.max_y - motility.size;
        if pos.y <= min_y || pos.y >= max_y {
            vel.vy *= -motility.restitution;
            pos.y = pos.y.clamp(min_y, max_y);
        }
    }
}

/// System that re-synchronizes anchored pollutants to their partner's
/// position plus the fixed reaction-site offset.
pub fn partner_sync_system(
    partners: Query<&Position, With<TemplateComplex>>,
    mut bound: Query<(&BoundTo, &mut Position), Without<TemplateComplex>>,
) {
    for (anchor, mut pos) in bound.iter_mut() {
        if let Ok(partner) = partners.get(anchor.partner) {
            pos.x = partner.x + anchor.offset_x;
            pos.y = partner.y + anchor.offset_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::SimTick;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn motion_world() -> (World, Schedule) {
        let mut world = World::new();
        let config = SimConfig::default();
        world.insert_resource(DeltaTime(config.dt));
        world.insert_resource(SimTick(0));
        world.insert_resource(SimRng(ChaCha8Rng::seed_from_u64(42)));
        world.insert_resource(config);
        let mut schedule = Schedule::default();
        schedule.add_systems(brownian_motion_system);
        (world, schedule)
    }

    #[test]
    fn test_free_entities_stay_inside_chamber() {
        let (mut world, mut schedule) = motion_world();
        // Start at a corner to exercise both walls.
        let entity = world
            .spawn(PollutantBundle::new(
                -2.99,
                1.99,
                -0.02,
                0.02,
                Motility::pollutant(),
            ))
            .id();

        for _ in 0..500 {
            schedule.run(&mut world);
            let pos = world.get::<Position>(entity).unwrap();
            assert!(pos.x.is_finite() && pos.y.is_finite());
            assert!(pos.x >= -3.0 && pos.x <= 3.0, "x escaped: {}", pos.x);
            assert!(pos.y >= -2.0 && pos.y <= 2.0, "y escaped: {}", pos.y);
        }
    }

    #[test]
    fn test_speed_never_exceeds_cap() {
        let (mut world, mut schedule) = motion_world();
        let motility = Motility::pollutant();
        let entity = world
            .spawn(PollutantBundle::new(0.0, 0.0, 0.0, 0.0, motility))
            .id();

        for _ in 0..200 {
            schedule.run(&mut world);
            let vel = world.get::<Velocity>(entity).unwrap();
            assert!(vel.magnitude() <= motility.max_speed + 1e-6);
        }
    }

    #[test]
    fn test_complexed_pollutant_does_not_move() {
        let (mut world, mut schedule) = motion_world();
        let entity = world
            .spawn(PollutantBundle::new(
                1.0,
                1.0,
                0.01,
                0.01,
                Motility::pollutant(),
            ))
            .id();
        world.get_mut::<Pollutant>(entity).unwrap().state = PollutantState::Complexed;

        for _ in 0..50 {
            schedule.run(&mut world);
        }
        let pos = world.get::<Position>(entity).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 1.0);
    }

    #[test]
    fn test_inactive_complex_does_not_move() {
        let (mut world, mut schedule) = motion_world();
        let entity = world
            .spawn(TemplateComplexBundle::new(
                7,
                0.5,
                -0.5,
                0.01,
                0.0,
                Motility::template_complex(),
            ))
            .id();
        world.get_mut::<TemplateComplex>(entity).unwrap().active = false;

        for _ in 0..50 {
            schedule.run(&mut world);
        }
        let pos = world.get::<Position>(entity).unwrap();
        assert_eq!(pos.x, 0.5);
        assert_eq!(pos.y, -0.5);
    }

    #[test]
    fn test_partner_sync_tracks_anchor() {
        let mut world = World::new();
        let partner = world
            .spawn(TemplateComplexBundle::new(
                0,
                1.0,
                1.0,
                0.0,
                0.0,
                Motility::template_complex(),
            ))
            .id();
        let follower = world
            .spawn((
                Pollutant {
                    state: PollutantState::Complexed,
                },
                Position::new(0.0, 0.0),
                BoundTo {
                    partner,
                    offset_x: 0.08,
                    offset_y: 0.0,
                },
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(partner_sync_system);
        schedule.run(&mut world);

        let pos = world.get::<Position>(follower).unwrap();
        assert!((pos.x - 1.08).abs() < 1e-6);
        assert!((pos.y - 1.0).abs() < 1e-6);
    }
}

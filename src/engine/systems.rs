// ECS systems for the splash particle effects
// Each system takes the world and the step length so the host can drive them from its fixed tick

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use super::components::*;
use crate::game::dynamics::SplashBurst;

pub const SPLASH_PARTICLES: usize = 8;
const SPLASH_GRAVITY: f32 = 9.8;
const SPLASH_COLOR: Color = Color::new(0.75, 0.88, 1.0);

/// Spawn a handful of droplets scattered over the burst footprint.
pub fn spawn_splash(world: &mut World, burst: &SplashBurst, rng: &mut impl Rng) {
    for _ in 0..SPLASH_PARTICLES {
        let offset = Vec3::new(
            rng.gen_range(-1.0..=1.0) * burst.spread.x,
            0.0,
            rng.gen_range(-1.0..=1.0) * burst.spread.y,
        );
        let velocity = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(2.0..4.0),
            rng.gen_range(-1.0..1.0),
        );
        world.spawn((
            Transform::from_position(burst.position + offset).with_scale(rng.gen_range(0.1..0.2)),
            Velocity::new(velocity),
            Ballistic { gravity: SPLASH_GRAVITY },
            Lifetime::new(rng.gen_range(0.6..1.0)),
            SPLASH_COLOR,
        ));
    }
}

/// Update entity positions based on velocity
pub fn movement_system(world: &mut World, delta_time: f32) {
    let mut falling = world.query::<(&mut Velocity, &Ballistic)>();
    for (mut velocity, ballistic) in falling.iter_mut(world) {
        velocity.linear.y -= ballistic.gravity * delta_time;
    }

    let mut moving = world.query::<(&mut Transform, &Velocity)>();
    for (mut transform, velocity) in moving.iter_mut(world) {
        transform.position += velocity.linear * delta_time;
    }
}

/// Decrease lifetime and despawn entities when lifetime expires
pub fn lifetime_system(world: &mut World, delta_time: f32) {
    let mut query = world.query::<(Entity, &mut Lifetime)>();
    let mut expired = Vec::new();
    for (entity, mut lifetime) in query.iter_mut(world) {
        lifetime.remaining -= delta_time;
        if lifetime.remaining <= 0.0 {
            expired.push(entity);
        }
    }
    for entity in expired {
        world.despawn(entity);
    }
}

/// Drop every particle, e.g. on restart.
pub fn clear_particles(world: &mut World) {
    let mut query = world.query_filtered::<Entity, With<Lifetime>>();
    let all: Vec<Entity> = query.iter(world).collect();
    for entity in all {
        world.despawn(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn particle_count(world: &mut World) -> usize {
        world.query::<&Lifetime>().iter(world).count()
    }

    fn burst() -> SplashBurst {
        SplashBurst { position: Vec3::new(-2.0, -0.6, 0.0), spread: Vec2::new(2.0, 0.75) }
    }

    #[test]
    fn test_splash_spawns_inside_footprint() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(7);
        spawn_splash(&mut world, &burst(), &mut rng);

        assert_eq!(particle_count(&mut world), SPLASH_PARTICLES);
        for transform in world.query::<&Transform>().iter(&world) {
            assert!((transform.position.x + 2.0).abs() <= 2.0 + 1e-5);
            assert!(transform.position.z.abs() <= 0.75 + 1e-5);
        }
    }

    #[test]
    fn test_movement_applies_gravity_then_velocity() {
        let mut world = World::new();
        let entity = world
            .spawn((
                Transform::default(),
                Velocity::new(Vec3::new(1.0, 2.0, 0.0)),
                Ballistic { gravity: 10.0 },
            ))
            .id();

        movement_system(&mut world, 0.1);

        let velocity = world.get::<Velocity>(entity).map(|v| v.linear);
        assert_eq!(velocity, Some(Vec3::new(1.0, 1.0, 0.0)));
        let position = world.get::<Transform>(entity).map(|t| t.position);
        let position = position.unwrap_or(Vec3::NAN);
        assert!((position - Vec3::new(0.1, 0.1, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_lifetime_despawns_expired() {
        let mut world = World::new();
        world.spawn((Transform::default(), Lifetime::new(0.5)));
        world.spawn((Transform::default(), Lifetime::new(1.5)));

        lifetime_system(&mut world, 1.0);
        assert_eq!(particle_count(&mut world), 1);

        lifetime_system(&mut world, 1.0);
        assert_eq!(particle_count(&mut world), 0);
    }

    #[test]
    fn test_clear_particles() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        spawn_splash(&mut world, &burst(), &mut rng);
        spawn_splash(&mut world, &burst(), &mut rng);

        clear_particles(&mut world);
        assert_eq!(particle_count(&mut world), 0);
    }

    #[test]
    fn test_lifetime_fraction() {
        let mut lifetime = Lifetime::new(2.0);
        assert_eq!(lifetime.fraction_left(), 1.0);
        lifetime.remaining = 0.5;
        assert_eq!(lifetime.fraction_left(), 0.25);
        lifetime.remaining = -1.0;
        assert_eq!(lifetime.fraction_left(), 0.0);
    }
}

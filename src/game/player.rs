// Player kinematics and collision resolution.
//
// Movement is an arcade approximation tuned for a fixed 60 Hz tick:
// velocity is a per-tick displacement and gravity a per-tick decrement.
// Collisions are resolved one platform at a time with no iterative solving;
// corrections from different platforms in the same tick may fight, which is
// accepted.
//
// Per-tick order:
//   apply_intent()  facing, horizontal velocity, jump edge
//   step()          gravity → integrate → ground → solids → obstacles
//                   → sinking-log presence → water → on-ship predicate

use glam::Vec3;

use super::config::PhysicsConfig;
use super::timer_elapsed;
use super::world::{Platform, PlatformKind, SinkState, WorldRegistry};

// ============================================================================
// STATE + INPUT
// ============================================================================

/// Everything the resolver owns about the player. Other components read it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec3,
    /// Displacement per tick.
    pub velocity: Vec3,
    /// Yaw in radians; 0 faces +Z, PI/2 faces +X.
    pub facing: f32,
    pub grounded: bool,
    /// Jumps consumed since the last landing.
    pub jump_count: u8,
    pub is_drowning: bool,
    pub drowning_elapsed: f32,
    pub is_sprinting: bool,
}

impl PlayerState {
    pub fn spawn(config: &PhysicsConfig) -> Self {
        Self {
            position: Vec3::from_array(config.spawn_position),
            velocity: Vec3::ZERO,
            facing: config.spawn_facing,
            grounded: false,
            jump_count: 0,
            is_drowning: false,
            drowning_elapsed: 0.0,
            is_sprinting: false,
        }
    }

    /// Back to the spawn point with all motion and drowning state cleared.
    pub fn respawn(&mut self, config: &PhysicsConfig) {
        *self = Self::spawn(config);
    }

    pub fn horizontal_speed(&self) -> f32 {
        (self.velocity.x * self.velocity.x + self.velocity.z * self.velocity.z).sqrt()
    }

    /// Unit vector the player faces on the XZ plane.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.facing.sin(), 0.0, self.facing.cos())
    }
}

/// Movement intent for one tick, already de-noised by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerIntent {
    /// +1 forward, -1 backward, 0 none.
    pub forward: f32,
    /// +1 turns left (counter-clockwise seen from above), -1 right.
    pub turn: f32,
    /// True only on the tick the jump key went down.
    pub jump_pressed: bool,
    pub sprint: bool,
}

/// What happened to the player this tick. Consumed by the session and animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionEvents {
    pub grounded: bool,
    pub obstacle_hit: bool,
    pub drowning_started: bool,
    /// Drowning has run its full duration; fires on one tick only.
    pub drowning_complete: bool,
    pub on_ship: bool,
}

// ============================================================================
// INTENT
// ============================================================================

/// Turn the player and set this tick's horizontal velocity and jump impulse.
///
/// `turn_player` is false in manual camera mode, where the turn axis orbits
/// the camera instead. Ignored entirely while drowning.
pub fn apply_intent(player: &mut PlayerState, intent: &PlayerIntent, config: &PhysicsConfig, turn_player: bool) {
    if player.is_drowning {
        return;
    }

    player.velocity.x = 0.0;
    player.velocity.z = 0.0;

    if turn_player && intent.turn != 0.0 {
        player.facing += intent.turn.signum() * config.rotation_speed;
    }

    player.is_sprinting = intent.sprint;

    if intent.forward > 0.0 {
        let speed = if intent.sprint { config.move_speed * config.sprint_multiplier } else { config.move_speed };
        let dir = player.forward();
        player.velocity.x = dir.x * speed;
        player.velocity.z = dir.z * speed;
    } else if intent.forward < 0.0 {
        // Backing up never sprints.
        let dir = player.forward();
        player.velocity.x = -dir.x * config.move_speed;
        player.velocity.z = -dir.z * config.move_speed;
    }

    if intent.jump_pressed && player.jump_count < config.max_jumps {
        player.velocity.y = config.jump_force;
        player.jump_count += 1;
        player.grounded = false;
    }
}

// ============================================================================
// STEP
// ============================================================================

/// Advance the player one tick against the current world state.
///
/// `time` is the absolute game time (used for sinking-log presence),
/// `dt` the tick length in seconds (used for the drowning timer).
pub fn step(
    player: &mut PlayerState,
    world: &mut WorldRegistry,
    config: &PhysicsConfig,
    drowning_duration: f32,
    time: f32,
    dt: f32,
) -> CollisionEvents {
    let mut events = CollisionEvents::default();

    if player.is_drowning {
        let already_done = timer_elapsed(player.drowning_elapsed, drowning_duration);
        player.position.y -= config.drown_sink_speed;
        player.drowning_elapsed += dt;
        events.drowning_complete = !already_done && timer_elapsed(player.drowning_elapsed, drowning_duration);
        return events;
    }

    if player.grounded {
        // Suppress residual downward drift while resting.
        player.velocity.y = player.velocity.y.max(0.0);
    } else {
        player.velocity.y += config.gravity;
    }
    player.position += player.velocity;

    resolve_ground(player, &world.platforms, config);
    resolve_solids(player, &world.platforms, config);
    events.grounded = player.grounded;

    events.obstacle_hit = world
        .obstacles
        .iter()
        .any(|o| player.position.distance(o.position) < config.obstacle_contact_distance);

    track_sinking_logs(player, world, config, time);

    if player.position.y <= world.water_level {
        start_drowning(player);
        events.drowning_started = true;
        log::debug!("Player hit the water at {:?}", player.position);
    }

    events.on_ship = world.ship().is_some_and(|ship| is_on_ship(player.position, ship, config.ship_reach_tolerance));

    events
}

/// Begin drowning. Idempotent.
pub fn start_drowning(player: &mut PlayerState) {
    if player.is_drowning {
        return;
    }
    player.is_drowning = true;
    player.drowning_elapsed = 0.0;
    player.velocity = Vec3::ZERO;
    player.grounded = false;
}

/// Snap onto the highest platform whose footprint holds the player and whose
/// surface is within tolerance, if the player is not moving up.
fn resolve_ground(player: &mut PlayerState, platforms: &[Platform], config: &PhysicsConfig) {
    player.grounded = false;
    if player.velocity.y > 0.0 {
        return;
    }

    let pos = player.position;
    let tol = config.ground_tolerance;
    let landing = platforms
        .iter()
        .filter(|p| p.supports_ground() && p.bounds.contains_xz(pos))
        .map(|p| p.bounds.surface_y)
        .filter(|&y| pos.y <= y + tol && pos.y > y - tol)
        .fold(None, |best: Option<f32>, y| Some(best.map_or(y, |b| b.max(y))));

    if let Some(surface_y) = landing {
        player.position.y = surface_y;
        player.velocity.y = 0.0;
        player.grounded = true;
        player.jump_count = 0;
    }
}

/// Circular push-out from trunk/rock-like platforms.
fn resolve_solids(player: &mut PlayerState, platforms: &[Platform], config: &PhysicsConfig) {
    let r = config.player_radius;
    for platform in platforms.iter().filter(|p| p.solid) {
        let bounds = &platform.bounds;
        let pos = player.position;
        if !bounds.overlaps_circle_xz(pos, r) || pos.y >= bounds.surface_y + config.solid_clearance {
            continue;
        }

        let center = bounds.center_xz();
        let dx = pos.x - center.x;
        let dz = pos.z - center.y;
        let distance = (dx * dx + dz * dz).sqrt();

        if distance > 0.0 {
            let min_distance = bounds.radius_xz() + r + config.solid_buffer;
            if distance < min_distance {
                player.position.x = center.x + dx / distance * min_distance;
                player.position.z = center.y + dz / distance * min_distance;
                player.velocity.x = 0.0;
                player.velocity.z = 0.0;
            }
        } else {
            player.position.z += r + 0.5;
            player.velocity.x = 0.0;
            player.velocity.z = 0.0;
        }
    }
}

/// Start, keep or break the stand-on timer of every sinking log.
fn track_sinking_logs(player: &PlayerState, world: &mut WorldRegistry, config: &PhysicsConfig, time: f32) {
    let pos = player.position;
    for platform in &mut world.platforms {
        let PlatformKind::SinkingLog(sink) = &mut platform.kind else {
            continue;
        };
        let bounds = &platform.bounds;
        let standing = bounds.contains_xz(pos) && (pos.y - bounds.surface_y).abs() <= config.log_presence_band;

        match (sink.state, standing) {
            (SinkState::Idle, true) => {
                sink.state = SinkState::PlayerPresent;
                sink.presence_start = Some(time);
            }
            (SinkState::PlayerPresent, true) => {
                let since = sink.presence_start.map_or(0.0, |start| time - start);
                if timer_elapsed(since, sink.trigger_delay) {
                    sink.state = SinkState::Sinking;
                    sink.sink_start = Some(time);
                    log::info!("Log at {:?} gives way after {:.1}s", bounds.center_xz(), since);
                }
            }
            (SinkState::PlayerPresent, false) => {
                sink.state = SinkState::Idle;
                sink.presence_start = None;
            }
            _ => {}
        }
    }
}

/// Deck footprint widened by `tolerance`, vertical band [deck - tol, deck + 2 tol].
pub fn is_on_ship(pos: Vec3, ship: &Platform, tolerance: f32) -> bool {
    let b = &ship.bounds;
    pos.x >= b.min_x - tolerance
        && pos.x <= b.max_x + tolerance
        && pos.z >= b.min_z - tolerance
        && pos.z <= b.max_z + tolerance
        && pos.y >= b.surface_y - tolerance
        && pos.y <= b.surface_y + tolerance * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::{Appearance, Bounds, Obstacle, ShipParams, SinkingParams};

    const DT: f32 = 1.0 / 60.0;

    fn config() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    fn flat_world() -> WorldRegistry {
        let mut world = WorldRegistry::new(-1.0);
        world.add_platform(Platform::new(Appearance::Sand, Bounds::new(-50.0, 50.0, -50.0, 50.0, 0.1), PlatformKind::Static));
        world
    }

    fn player_at(position: Vec3) -> PlayerState {
        PlayerState { position, ..PlayerState::spawn(&config()) }
    }

    fn settle(player: &mut PlayerState, world: &mut WorldRegistry) {
        for tick in 0..120 {
            step(player, world, &config(), 3.0, tick as f32 * DT, DT);
        }
    }

    #[test]
    fn test_falls_and_lands_on_platform() {
        let mut world = flat_world();
        let mut player = player_at(Vec3::new(0.0, 1.0, 0.0));
        settle(&mut player, &mut world);
        assert!(player.grounded);
        assert_eq!(player.position.y, 0.1);
        assert_eq!(player.velocity.y, 0.0);
        assert_eq!(player.jump_count, 0);
    }

    #[test]
    fn test_no_landing_outside_footprint() {
        let cfg = config();
        let mut world = WorldRegistry::new(-100.0);
        world.add_platform(Platform::new(Appearance::Rock, Bounds::square(0.0, 0.0, 2.0, 0.0), PlatformKind::Static));

        let samples = [-3.0, -2.0, 2.0, 2.5, 10.0];
        for &x in &samples {
            for &z in &samples {
                for &y in &[-0.4, -0.1, 0.0, 0.2, 0.45] {
                    let mut player = player_at(Vec3::new(x, y, z));
                    player.velocity.y = 0.0;
                    resolve_ground(&mut player, &world.platforms, &cfg);
                    assert!(!player.grounded, "false landing at ({x}, {y}, {z})");
                }
            }
        }
    }

    #[test]
    fn test_no_landing_while_rising() {
        let mut world = flat_world();
        let mut player = player_at(Vec3::new(0.0, 0.1, 0.0));
        player.velocity.y = 0.2;
        step(&mut player, &mut world, &config(), 3.0, 0.0, DT);
        assert!(!player.grounded);
        assert!(player.position.y > 0.1);
    }

    #[test]
    fn test_overlapping_platforms_highest_surface_wins() {
        let mut world = WorldRegistry::new(-10.0);
        world.add_platform(Platform::new(Appearance::Grass, Bounds::square(0.0, 0.0, 5.0, 0.4), PlatformKind::Static));
        world.add_platform(Platform::new(Appearance::Grass, Bounds::square(0.0, 0.0, 5.0, 0.1), PlatformKind::Static));
        let mut player = player_at(Vec3::new(0.0, 0.3, 0.0));
        player.velocity.y = 0.0;
        resolve_ground(&mut player, &world.platforms, &config());
        assert!(player.grounded);
        assert_eq!(player.position.y, 0.4);
    }

    #[test]
    fn test_double_jump_then_blocked_until_landing() {
        let cfg = config();
        let mut world = flat_world();
        let mut player = player_at(Vec3::new(0.0, 1.0, 0.0));
        settle(&mut player, &mut world);

        let jump = PlayerIntent { jump_pressed: true, ..Default::default() };
        let idle = PlayerIntent::default();

        apply_intent(&mut player, &jump, &cfg, true);
        step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert_eq!(player.jump_count, 1);

        apply_intent(&mut player, &jump, &cfg, true);
        step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert_eq!(player.jump_count, 2);
        let vy = player.velocity.y;

        apply_intent(&mut player, &jump, &cfg, true);
        assert_eq!(player.jump_count, 2);
        assert_eq!(player.velocity.y, vy);

        let mut max_seen = 0;
        for tick in 0..300 {
            apply_intent(&mut player, &idle, &cfg, true);
            step(&mut player, &mut world, &cfg, 3.0, tick as f32 * DT, DT);
            max_seen = max_seen.max(player.jump_count);
            if player.grounded {
                break;
            }
        }
        assert!(player.grounded);
        assert!(max_seen <= cfg.max_jumps);
        assert_eq!(player.jump_count, 0);
    }

    #[test]
    fn test_held_jump_without_edge_does_nothing() {
        let cfg = config();
        let mut world = flat_world();
        let mut player = player_at(Vec3::new(0.0, 1.0, 0.0));
        settle(&mut player, &mut world);
        let held = PlayerIntent { jump_pressed: false, ..Default::default() };
        for tick in 0..30 {
            apply_intent(&mut player, &held, &cfg, true);
            step(&mut player, &mut world, &cfg, 3.0, tick as f32 * DT, DT);
        }
        assert!(player.grounded);
        assert_eq!(player.jump_count, 0);
    }

    #[test]
    fn test_sprint_doubles_forward_speed_only() {
        let cfg = config();
        let mut player = player_at(Vec3::ZERO);
        player.facing = 0.0;

        apply_intent(&mut player, &PlayerIntent { forward: 1.0, ..Default::default() }, &cfg, true);
        let walk = player.horizontal_speed();
        apply_intent(&mut player, &PlayerIntent { forward: 1.0, sprint: true, ..Default::default() }, &cfg, true);
        let sprint = player.horizontal_speed();
        apply_intent(&mut player, &PlayerIntent { forward: -1.0, sprint: true, ..Default::default() }, &cfg, true);
        let back = player.horizontal_speed();

        assert!((walk - cfg.move_speed).abs() < 1e-6);
        assert!((sprint - 2.0 * cfg.move_speed).abs() < 1e-6);
        assert!((back - cfg.move_speed).abs() < 1e-6);
        assert!(player.velocity.z < 0.0);
    }

    #[test]
    fn test_turn_goes_to_camera_in_manual_mode() {
        let cfg = config();
        let mut player = player_at(Vec3::ZERO);
        let facing = player.facing;
        let turn = PlayerIntent { turn: 1.0, ..Default::default() };
        apply_intent(&mut player, &turn, &cfg, false);
        assert_eq!(player.facing, facing);
        apply_intent(&mut player, &turn, &cfg, true);
        assert!((player.facing - (facing + cfg.rotation_speed)).abs() < 1e-6);
    }

    #[test]
    fn test_solid_pushes_player_to_clearance_radius() {
        let cfg = config();
        let mut world = flat_world();
        world.add_platform(Platform::solid(Appearance::Tree, Bounds::square(0.0, 0.0, 1.0, 0.5)));
        let mut player = player_at(Vec3::new(1.2, 0.1, 0.0));
        player.velocity = Vec3::new(-0.12, 0.0, 0.0);
        resolve_solids(&mut player, &world.platforms, &cfg);

        let expected = 1.0 + cfg.player_radius + cfg.solid_buffer;
        assert!((player.position.x - expected).abs() < 1e-5);
        assert_eq!(player.position.z, 0.0);
        assert_eq!(player.velocity.x, 0.0);
    }

    #[test]
    fn test_solid_centered_player_pushed_back() {
        let cfg = config();
        let world = {
            let mut w = WorldRegistry::new(-1.0);
            w.add_platform(Platform::solid(Appearance::Rock, Bounds::square(3.0, 4.0, 1.0, 0.5)));
            w
        };
        let mut player = player_at(Vec3::new(3.0, 0.1, 4.0));
        resolve_solids(&mut player, &world.platforms, &cfg);
        assert!((player.position.z - (4.0 + cfg.player_radius + 0.5)).abs() < 1e-5);
        assert_eq!(player.position.x, 3.0);
    }

    #[test]
    fn test_solid_ignored_when_above_top() {
        let cfg = config();
        let mut world = WorldRegistry::new(-1.0);
        world.add_platform(Platform::solid(Appearance::Bush, Bounds::square(0.0, 0.0, 1.0, 0.5)));
        let mut player = player_at(Vec3::new(0.8, 3.0, 0.0));
        resolve_solids(&mut player, &world.platforms, &cfg);
        assert_eq!(player.position.x, 0.8);
    }

    #[test]
    fn test_obstacle_contact_reported() {
        let cfg = config();
        let mut world = flat_world();
        world.add_obstacle(Obstacle::new(Vec3::new(1.0, 0.5, 0.0), Vec3::Z, 0.01, 3.0, 0.0));
        let mut player = player_at(Vec3::new(0.0, 0.1, 0.0));
        player.grounded = true;
        let events = step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert!(events.obstacle_hit);

        world.obstacles[0].position = Vec3::new(5.0, 0.5, 0.0);
        let events = step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert!(!events.obstacle_hit);
    }

    #[test]
    fn test_water_starts_drowning_once() {
        let cfg = config();
        let mut world = WorldRegistry::new(-1.0);
        let mut player = player_at(Vec3::new(0.0, -1.0, 0.0));
        player.velocity = Vec3::new(0.1, 0.0, 0.1);

        let events = step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert!(events.drowning_started);
        assert!(player.is_drowning);
        assert_eq!(player.velocity, Vec3::ZERO);

        let events = step(&mut player, &mut world, &cfg, 3.0, DT, DT);
        assert!(!events.drowning_started);
        assert!((player.drowning_elapsed - DT).abs() < 1e-6);
    }

    #[test]
    fn test_drowning_completes_after_duration() {
        let cfg = config();
        let mut world = WorldRegistry::new(-1.0);
        let mut player = player_at(Vec3::new(0.0, -1.0, 0.0));
        start_drowning(&mut player);

        let mut completions = 0;
        let mut first = None;
        for tick in 1..=240 {
            let events = step(&mut player, &mut world, &cfg, 3.0, tick as f32 * DT, DT);
            if events.drowning_complete {
                completions += 1;
                first.get_or_insert(tick);
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(first, Some(180));
    }

    #[test]
    fn test_intent_ignored_while_drowning() {
        let cfg = config();
        let mut player = player_at(Vec3::new(0.0, -1.0, 0.0));
        start_drowning(&mut player);
        apply_intent(&mut player, &PlayerIntent { forward: 1.0, jump_pressed: true, ..Default::default() }, &cfg, true);
        assert_eq!(player.velocity, Vec3::ZERO);
        assert_eq!(player.jump_count, 0);
    }

    fn log_world() -> WorldRegistry {
        let mut world = WorldRegistry::new(-1.0);
        world.add_platform(Platform::new(
            Appearance::Log,
            Bounds::new(-1.5, 1.5, -1.0, 1.0, -0.6),
            PlatformKind::SinkingLog(SinkingParams::new(-0.6, -3.0, 3.5, 2.0)),
        ));
        world
    }

    fn log_state(world: &WorldRegistry) -> SinkState {
        world.sinking_logs().next().map(|(_, log)| log.state).unwrap()
    }

    #[test]
    fn test_standing_on_log_triggers_sinking() {
        let cfg = config();
        let mut world = log_world();
        let mut player = player_at(Vec3::new(0.0, -0.6, 0.0));
        player.grounded = true;

        for tick in 0..210 {
            step(&mut player, &mut world, &cfg, 3.0, tick as f32 * DT, DT);
        }
        assert_eq!(log_state(&world), SinkState::PlayerPresent);
        step(&mut player, &mut world, &cfg, 3.0, 210.0 * DT, DT);
        assert_eq!(log_state(&world), SinkState::Sinking);
    }

    #[test]
    fn test_leaving_log_resets_presence() {
        let cfg = config();
        let mut world = log_world();
        let mut player = player_at(Vec3::new(0.0, -0.6, 0.0));
        player.grounded = true;
        step(&mut player, &mut world, &cfg, 3.0, 0.0, DT);
        assert_eq!(log_state(&world), SinkState::PlayerPresent);

        player.position = Vec3::new(5.0, 2.0, 0.0);
        player.grounded = true;
        step(&mut player, &mut world, &cfg, 3.0, 1.0, DT);
        assert_eq!(log_state(&world), SinkState::Idle);
        assert!(world.sinking_logs().all(|(_, log)| log.presence_start.is_none()));
    }

    #[test]
    fn test_on_ship_predicate() {
        let ship = Platform::new(Appearance::Deck, Bounds::new(41.0, 55.0, -3.0, 3.0, -0.5), PlatformKind::Ship(ShipParams::new(-1.5)));
        assert!(is_on_ship(Vec3::new(48.0, -0.5, 0.0), &ship, 3.0));
        assert!(is_on_ship(Vec3::new(39.0, 0.0, 5.0), &ship, 3.0));
        assert!(!is_on_ship(Vec3::new(37.0, -0.5, 0.0), &ship, 3.0));
        assert!(!is_on_ship(Vec3::new(48.0, -4.0, 0.0), &ship, 3.0));
        assert!(!is_on_ship(Vec3::new(48.0, 6.0, 0.0), &ship, 3.0));
    }
}

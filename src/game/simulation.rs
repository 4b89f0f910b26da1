// Fixed-step scheduler. The host calls `tick` once per simulation step; each
// tick runs the components in a fixed order and data only flows downstream:
//
//   Dynamics → Resolver → Session → Animation → Camera
//
// Nothing advances unless the session is Playing. Start and restart are
// applied between ticks.

use glam::Vec3;

use super::animation::{AnimState, AnimationBlender, MotionFlags};
use super::assets::LoadedAssets;
use super::camera::{CameraController, CameraInput};
use super::config::GameConfig;
use super::dynamics::{Dynamics, SplashBurst, WaveField};
use super::player::{self, CollisionEvents, PlayerIntent, PlayerState};
use super::session::{LifeLost, Session, SessionPhase};
use super::world::WorldRegistry;

/// Everything the host feeds in for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub player: PlayerIntent,
    pub camera: CameraInput,
}

pub struct Simulation {
    config: GameConfig,
    world: WorldRegistry,
    dynamics: Dynamics,
    player: PlayerState,
    animation: AnimationBlender,
    camera: CameraController,
    session: Session,
    /// Game time in seconds; only advances while Playing.
    time: f32,
    ticks: u64,
    last_events: CollisionEvents,
}

impl Simulation {
    pub fn new(config: GameConfig, assets: LoadedAssets) -> Self {
        let LoadedAssets { skeleton, world } = assets;
        let dynamics = Dynamics::new(&config.world, world.water_level);
        Self {
            player: PlayerState::spawn(&config.physics),
            animation: AnimationBlender::new(skeleton, config.animation.clone()),
            camera: CameraController::new(config.camera.clone()),
            session: Session::new(config.session.clone()),
            world,
            dynamics,
            time: 0.0,
            ticks: 0,
            last_events: CollisionEvents::default(),
            config,
        }
    }

    /// Menu → Playing, with the intro flight armed.
    pub fn start(&mut self) {
        if self.session.start() {
            self.camera.start_intro();
        }
    }

    /// Full reset: lives, player, sinking logs, timers, animation, intro.
    pub fn restart(&mut self) {
        self.session.restart();
        self.respawn_player();
        self.animation.reset();
        self.camera.start_intro();
        self.dynamics.drain_splashes();
        self.last_events = CollisionEvents::default();
    }

    pub fn tick(&mut self, input: &TickInput) {
        if !self.session.is_playing() {
            return;
        }

        let dt = self.config.tick_seconds;
        self.time += dt;
        self.ticks += 1;

        // Dynamics
        self.dynamics.update(&mut self.world, self.time);

        // Resolver
        let manual = self.camera.is_manual();
        if !self.camera.intro_active() {
            player::apply_intent(&mut self.player, &input.player, &self.config.physics, !manual);
        }
        let events = player::step(
            &mut self.player,
            &mut self.world,
            &self.config.physics,
            self.session.drowning_duration(),
            self.time,
            dt,
        );
        self.last_events = events;

        // Session
        if events.drowning_started {
            self.session.mark_drowning();
        }
        let life_lost = events.obstacle_hit || events.drowning_complete;
        if life_lost {
            if events.obstacle_hit {
                log::info!("Caught by a crab at {:?}", self.player.position);
            }
            match self.session.lose_life() {
                LifeLost::Respawn => self.respawn_player(),
                LifeLost::GameOver => {
                    self.player.is_drowning = false;
                    self.player.velocity = Vec3::ZERO;
                }
            }
        } else {
            self.session.update_ship_dwell(events.on_ship, dt);
        }

        // Animation
        if life_lost {
            self.animation.set_state(AnimState::Idle);
        } else {
            self.animation.classify(&MotionFlags {
                grounded: self.player.grounded,
                horizontal_speed: self.player.horizontal_speed(),
                sprinting: self.player.is_sprinting,
                drowning: self.player.is_drowning,
            });
        }

        if !self.session.is_playing() {
            return;
        }
        self.animation.advance(dt);

        // Camera
        let mut camera_input = input.camera;
        if manual && input.player.turn != 0.0 {
            camera_input.orbit += input.player.turn.signum() * self.config.physics.rotation_speed;
        }
        self.camera.update(self.player.position, self.player.facing, &camera_input, dt);
    }

    fn respawn_player(&mut self) {
        self.player.respawn(&self.config.physics);
        self.world.reset_sinking_logs();
    }

    // ========================================================================
    // READ ACCESS FOR THE HOST
    // ========================================================================

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn world(&self) -> &WorldRegistry {
        &self.world
    }

    pub fn waves(&self) -> &WaveField {
        &self.dynamics.waves
    }

    pub fn animation(&self) -> &AnimationBlender {
        &self.animation
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_events(&self) -> CollisionEvents {
        self.last_events
    }

    /// Splash bursts since the last call, for the particle system.
    pub fn drain_splashes(&mut self) -> Vec<SplashBurst> {
        self.dynamics.drain_splashes()
    }
}

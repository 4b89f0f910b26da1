// Environmental dynamics: everything in the world that moves on its own.
//
// Runs first in the tick, before the collision resolver, so the resolver sees
// this tick's platform heights. All motion is a closed-form function of the
// absolute game time except the sinking-log easing and the crab patrols, which
// are stepped per tick.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::WorldConfig;
use super::timer_elapsed;
use super::world::{PlatformKind, SinkState, WorldRegistry, SUBMERGED_SURFACE_Y};

/// Walk-cycle advance per tick for the crabs.
const CRAB_PHASE_STEP: f32 = 0.15;
/// Height the crabs bob around.
const CRAB_BASE_Y: f32 = 1.0;
/// Per-tick chance that a crab turns around on its own.
const CRAB_TURN_CHANCE: f64 = 0.001;

// ============================================================================
// WAVE FIELD
// ============================================================================

/// Fixed random wave profile of one sea vertex.
#[derive(Debug, Clone, Copy)]
pub struct WaveProfile {
    pub amplitude1: f32,
    pub amplitude2: f32,
    pub frequency1: f32,
    pub frequency2: f32,
    pub phase1: f32,
    pub phase2: f32,
    pub speed1: f32,
    pub speed2: f32,
}

impl WaveProfile {
    fn random(rng: &mut impl Rng) -> Self {
        use std::f32::consts::TAU;
        Self {
            amplitude1: 0.2 + rng.gen_range(0.0..1.0_f32) * 0.6,
            amplitude2: 0.1 + rng.gen_range(0.0..1.0_f32) * 0.4,
            frequency1: 1.5 + rng.gen_range(0.0..1.0_f32),
            frequency2: 0.8 + rng.gen_range(0.0..1.0_f32) * 0.8,
            phase1: rng.gen_range(0.0..1.0_f32) * TAU,
            phase2: rng.gen_range(0.0..1.0_f32) * TAU,
            speed1: 1.5 + rng.gen_range(0.0..1.0_f32),
            speed2: 0.5 + rng.gen_range(0.0..1.0_f32),
        }
    }

    /// Vertical displacement at rest position `(x, z)` and absolute time `time`.
    /// Two travelling sines along X plus a diagonal interference term on X+Z.
    pub fn displacement(&self, x: f32, z: f32, time: f32) -> f32 {
        let wave1 = (x * self.frequency1 + time * self.speed1 + self.phase1).sin() * self.amplitude1;
        let wave2 = (x * self.frequency2 + time * self.speed2 + self.phase2).sin() * self.amplitude2;
        let interference = ((x + z) / 3.0 + time * 1.2 + self.phase1).sin() * 0.1 * self.amplitude1;
        wave1 + wave2 + interference
    }
}

/// Dense grid of sea vertices, each with its own wave profile.
pub struct WaveField {
    /// Rest XZ of every vertex, row-major, `(segments + 1)^2` entries.
    rest: Vec<Vec2>,
    profiles: Vec<WaveProfile>,
    /// Current displacement per vertex relative to the water level.
    heights: Vec<f32>,
    /// Vertices per row.
    pub stride: usize,
    pub water_level: f32,
}

impl WaveField {
    pub fn new(center_x: f32, size: f32, segments: u32, water_level: f32, rng: &mut impl Rng) -> Self {
        let stride = segments as usize + 1;
        let step = size / segments.max(1) as f32;
        let half = size * 0.5;
        let mut rest = Vec::with_capacity(stride * stride);
        let mut profiles = Vec::with_capacity(stride * stride);
        for row in 0..stride {
            for col in 0..stride {
                rest.push(Vec2::new(center_x - half + col as f32 * step, -half + row as f32 * step));
                profiles.push(WaveProfile::random(rng));
            }
        }
        let heights = vec![0.0; rest.len()];
        Self { rest, profiles, heights, stride, water_level }
    }

    /// Recompute every vertex from the absolute game time (not a delta).
    pub fn update(&mut self, time: f32) {
        for ((h, rest), profile) in self.heights.iter_mut().zip(&self.rest).zip(&self.profiles) {
            *h = profile.displacement(rest.x, rest.y, time);
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.rest.len()
    }

    /// World position of vertex `idx` at the last update.
    pub fn vertex(&self, idx: usize) -> Vec3 {
        let rest = self.rest[idx];
        Vec3::new(rest.x, self.water_level + self.heights[idx], rest.y)
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }
}

// ============================================================================
// SPLASH EVENTS
// ============================================================================

/// Cosmetic burst requested by a sinking log; the host turns it into particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplashBurst {
    pub position: Vec3,
    /// Half-size of the log footprint, used to scatter particles.
    pub spread: Vec2,
}

// ============================================================================
// DYNAMICS ENGINE
// ============================================================================

pub struct Dynamics {
    pub waves: WaveField,
    rng: StdRng,
    sink_blend: f32,
    burst_interval: f32,
    /// Bursts emitted during the last update; drained by the host.
    splashes: Vec<SplashBurst>,
}

impl Dynamics {
    pub fn new(config: &WorldConfig, water_level: f32) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let waves = WaveField::new(config.sea_center_x, config.sea_size, config.sea_segments, water_level, &mut rng);
        Self {
            waves,
            rng,
            sink_blend: config.log_sink_blend,
            burst_interval: config.log_burst_interval,
            splashes: Vec::new(),
        }
    }

    /// Advance all environmental motion to absolute time `time`.
    pub fn update(&mut self, world: &mut WorldRegistry, time: f32) {
        self.waves.update(time);
        self.update_platforms(world, time);
        self.update_obstacles(world);
    }

    /// Splash bursts produced since the last call.
    pub fn drain_splashes(&mut self) -> Vec<SplashBurst> {
        std::mem::take(&mut self.splashes)
    }

    fn update_platforms(&mut self, world: &mut WorldRegistry, time: f32) {
        for platform in &mut world.platforms {
            let bounds = &mut platform.bounds;
            match &mut platform.kind {
                PlatformKind::Static => {}
                PlatformKind::Floating(float) => {
                    let wave = time * float.frequency + float.phase;
                    let y = float.rest_y + wave.sin() * float.amplitude;
                    float.tilt = Vec2::new(wave.sin() * float.amplitude, wave.cos() * float.tilt_amplitude);
                    bounds.surface_y = y + float.surface_offset;
                }
                PlatformKind::Ship(ship) => {
                    let bob = (time * ship.bob_speed).sin() * ship.bob_amplitude;
                    ship.tilt = Vec2::new(
                        (time * ship.rock_speed).sin() * ship.rock_amplitude,
                        (time * ship.rock_speed * 0.7).cos() * ship.rock_amplitude * 0.5,
                    );
                    bounds.surface_y = ship.rest_y + bob + ship.deck_offset;
                }
                PlatformKind::SinkingLog(sink) => match sink.state {
                    SinkState::Idle | SinkState::PlayerPresent | SinkState::Submerged => {}
                    SinkState::Sinking => {
                        let started = *sink.sink_start.get_or_insert(time);
                        // Constant-rate easing toward the sunk height, independent of progress.
                        bounds.surface_y += (sink.target_y - bounds.surface_y) * self.sink_blend;

                        let due = sink.last_burst.is_none_or(|last| time - last >= self.burst_interval);
                        if due {
                            sink.last_burst = Some(time);
                            let center = bounds.center_xz();
                            self.splashes.push(SplashBurst {
                                position: Vec3::new(center.x, world.water_level, center.y),
                                spread: bounds.size_xz() * 0.5,
                            });
                        }

                        if timer_elapsed(time - started, sink.sink_duration) {
                            sink.state = SinkState::Submerged;
                            bounds.surface_y = SUBMERGED_SURFACE_Y;
                            log::debug!("Sinking log at {:?} submerged", bounds.center_xz());
                        }
                    }
                },
            }
        }
    }

    fn update_obstacles(&mut self, world: &mut WorldRegistry) {
        for crab in &mut world.obstacles {
            crab.position += crab.axis * crab.direction * crab.speed;
            if crab.patrol_offset().abs() > crab.range {
                crab.direction = -crab.direction;
                crab.heading += std::f32::consts::PI;
            }

            crab.phase += CRAB_PHASE_STEP;
            crab.position.y = CRAB_BASE_Y + crab.phase.sin() * crab.bob_amount;

            if self.rng.gen_bool(CRAB_TURN_CHANCE) {
                crab.direction = -crab.direction;
                crab.heading += std::f32::consts::PI;
            }
        }
    }
}

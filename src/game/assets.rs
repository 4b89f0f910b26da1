// Asset provider seam and the background loader.
//
// The simulation never loads anything itself: it receives a skeleton and a
// populated world registry from an `AssetProvider`. The built-in provider
// generates both procedurally. `AssetLoader` runs any provider on a worker
// thread so the host can keep rendering while it waits, and gives up after a
// bounded timeout.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::animation::Skeleton;
use super::config::GameConfig;
use super::GameError;
use super::world::{Appearance, Bounds, FloatingParams, Obstacle, Platform, PlatformKind, ShipParams, SinkingParams, WorldRegistry};

/// Everything the simulation needs before it can enter Playing.
pub struct LoadedAssets {
    pub skeleton: Skeleton,
    pub world: WorldRegistry,
}

pub trait AssetProvider: Send + 'static {
    fn name(&self) -> &str;
    fn load(&self) -> Result<LoadedAssets, GameError>;
}

// ============================================================================
// PROCEDURAL PROVIDER
// ============================================================================

/// Builds the island level and the pirate rig from code.
pub struct ProceduralAssets {
    config: GameConfig,
}

impl ProceduralAssets {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }
}

impl AssetProvider for ProceduralAssets {
    fn name(&self) -> &str {
        "procedural"
    }

    fn load(&self) -> Result<LoadedAssets, GameError> {
        let skeleton = pirate_skeleton();
        let world = build_world(&self.config);
        if world.ship().is_none() {
            return Err(GameError::AssetUnavailable("level has no ship deck".into()));
        }
        Ok(LoadedAssets { skeleton, world })
    }
}

/// Humanoid rig with the joints the animation blender drives.
/// Offsets are in model units (about 1.8 tall); arms rest rotated down out of T-pose.
pub fn pirate_skeleton() -> Skeleton {
    let arms_down = Vec3::new(std::f32::consts::FRAC_PI_4, 0.0, 0.0);
    let mut s = Skeleton::new();

    let hips = s.add_joint("Hips", None, Vec3::new(0.0, 0.95, 0.0), Vec3::ZERO);
    let spine = s.add_joint("Spine", Some(hips), Vec3::new(0.0, 0.1, 0.0), Vec3::ZERO);
    let spine1 = s.add_joint("Spine1", Some(spine), Vec3::new(0.0, 0.12, 0.0), Vec3::ZERO);
    let spine2 = s.add_joint("Spine2", Some(spine1), Vec3::new(0.0, 0.12, 0.0), Vec3::ZERO);
    let neck = s.add_joint("Neck", Some(spine2), Vec3::new(0.0, 0.16, 0.0), Vec3::ZERO);
    s.add_joint("Head", Some(neck), Vec3::new(0.0, 0.1, 0.0), Vec3::ZERO);

    for (side, sign) in [("Left", 1.0), ("Right", -1.0)] {
        let shoulder = s.add_joint(&format!("{side}Shoulder"), Some(spine2), Vec3::new(0.08 * sign, 0.12, 0.0), Vec3::ZERO);
        let arm = s.add_joint(&format!("{side}Arm"), Some(shoulder), Vec3::new(0.12 * sign, 0.0, 0.0), arms_down);
        let fore = s.add_joint(&format!("{side}ForeArm"), Some(arm), Vec3::new(0.26 * sign, 0.0, 0.0), Vec3::ZERO);
        s.add_joint(&format!("{side}Hand"), Some(fore), Vec3::new(0.24 * sign, 0.0, 0.0), Vec3::ZERO);
    }

    for (side, sign) in [("Left", 1.0), ("Right", -1.0)] {
        let up = s.add_joint(&format!("{side}UpLeg"), Some(hips), Vec3::new(0.1 * sign, -0.05, 0.0), Vec3::ZERO);
        let leg = s.add_joint(&format!("{side}Leg"), Some(up), Vec3::new(0.0, -0.45, 0.0), Vec3::ZERO);
        s.add_joint(&format!("{side}Foot"), Some(leg), Vec3::new(0.0, -0.42, 0.0), Vec3::ZERO);
    }

    s
}

// ============================================================================
// LEVEL LAYOUT
// ============================================================================

const BEACH_CENTER_X: f32 = -40.5;
const BEACH_WIDTH: f32 = 10.0;
const LEVEL_DEPTH: f32 = 200.0;
const FOREST_EDGE_X: f32 = -45.0;
const FOREST_WIDTH: f32 = 200.0;
const GROUND_SURFACE: f32 = 0.1;
/// Walkable top of trunks, bushes and boulders.
const PROP_SURFACE: f32 = 0.5;
const TREE_TRUNK_RADIUS: f32 = 1.0;
const TREE_MIN_SPACING: f32 = 4.0;
const TREE_PLACEMENT_ATTEMPTS: usize = 50;
/// No props closer than this to the spawn point.
const SPAWN_CLEARANCE: f32 = 6.0;

/// Stepping stones from the beach to the ship: (x, z).
const FLOATING_ROCKS: [(f32, f32); 7] = [(-30.0, 0.0), (-19.0, 5.0), (-9.0, -3.0), (5.0, 2.0), (15.0, -4.0), (25.0, 1.0), (35.0, -2.0)];
/// Logs bridging the widest gaps: (x, z).
const SINKING_LOGS: [(f32, f32); 2] = [(-2.0, 0.0), (30.0, -0.5)];
const LOG_HALF_LENGTH: f32 = 2.0;
const LOG_HALF_WIDTH: f32 = 0.75;
const LOG_REST_Y: f32 = -0.6;
const LOG_SUNK_Y: f32 = -3.0;
/// Crab patrols: (x, z, initial direction).
const CRABS: [(f32, f32, f32); 4] = [(-15.0, 5.0, 1.0), (15.0, -4.0, -1.0), (-25.0, 2.0, 1.0), (25.0, -6.0, -1.0)];
const SHIP_POSITION: Vec3 = Vec3::new(48.0, -1.5, 0.0);
const SHIP_DECK_HALF: (f32, f32) = (7.0, 3.0);

/// Populate a registry with the whole level, seeded from the world config.
pub fn build_world(config: &GameConfig) -> WorldRegistry {
    let physics = &config.physics;
    let world_cfg = &config.world;
    let mut rng = StdRng::seed_from_u64(world_cfg.seed.wrapping_add(1));
    let mut world = WorldRegistry::new(physics.water_level);

    let half_depth = LEVEL_DEPTH * 0.5;
    world.add_platform(Platform::new(
        Appearance::Sand,
        Bounds::new(BEACH_CENTER_X - BEACH_WIDTH * 0.5, BEACH_CENTER_X + BEACH_WIDTH * 0.5, -half_depth, half_depth, GROUND_SURFACE),
        PlatformKind::Static,
    ));
    world.add_platform(Platform::new(
        Appearance::Grass,
        Bounds::new(FOREST_EDGE_X - FOREST_WIDTH, FOREST_EDGE_X, -half_depth, half_depth, GROUND_SURFACE),
        PlatformKind::Static,
    ));

    let spawn = Vec3::from_array(physics.spawn_position);
    add_forest(&mut world, &mut rng, world_cfg.tree_count as usize, spawn);

    let rock_rest = physics.water_level + 0.3;
    for (x, z) in FLOATING_ROCKS {
        let size = 3.0 + rng.gen_range(0.0..1.0_f32) * 1.5;
        let params = FloatingParams {
            rest_y: rock_rest,
            surface_offset: 0.5,
            amplitude: 0.1 + rng.gen_range(0.0..1.0_f32) * 0.1,
            frequency: 0.8 + rng.gen_range(0.0..1.0_f32) * 0.4,
            phase: rng.gen_range(0.0..1.0_f32) * std::f32::consts::TAU,
            tilt_amplitude: 0.02 + rng.gen_range(0.0..1.0_f32) * 0.07,
            tilt: glam::Vec2::ZERO,
        };
        world.add_platform(Platform::new(
            Appearance::Rock,
            Bounds::square(x, z, size, rock_rest + params.surface_offset),
            PlatformKind::Floating(params),
        ));
    }

    for (x, z) in SINKING_LOGS {
        world.add_platform(Platform::new(
            Appearance::Log,
            Bounds::new(x - LOG_HALF_LENGTH, x + LOG_HALF_LENGTH, z - LOG_HALF_WIDTH, z + LOG_HALF_WIDTH, LOG_REST_Y),
            PlatformKind::SinkingLog(SinkingParams::new(LOG_REST_Y, LOG_SUNK_Y, world_cfg.log_trigger_delay, world_cfg.log_sink_duration)),
        ));
    }

    let ship = ShipParams::new(SHIP_POSITION.y);
    world.add_platform(Platform::new(
        Appearance::Deck,
        Bounds::new(
            SHIP_POSITION.x - SHIP_DECK_HALF.0,
            SHIP_POSITION.x + SHIP_DECK_HALF.0,
            SHIP_POSITION.z - SHIP_DECK_HALF.1,
            SHIP_POSITION.z + SHIP_DECK_HALF.1,
            SHIP_POSITION.y + ship.deck_offset,
        ),
        PlatformKind::Ship(ship),
    ));

    for (x, z, direction) in CRABS {
        let speed = 0.008 + rng.gen_range(0.0..1.0_f32) * 0.004;
        let range = 3.0 + rng.gen_range(0.0..1.0_f32) * 2.0;
        let phase = rng.gen_range(0.0..1.0_f32) * std::f32::consts::TAU;
        let mut crab = Obstacle::new(Vec3::new(x, 1.0, z), Vec3::Z, speed, range, phase);
        crab.direction = direction;
        crab.bob_amount = 0.1 + rng.gen_range(0.0..1.0_f32) * 0.05;
        crab.heading = rng.gen_range(0.0..1.0_f32) * std::f32::consts::TAU;
        world.add_obstacle(crab);
    }

    log::info!("Built level: {} platforms, {} obstacles", world.platform_count(), world.obstacles.len());
    world
}

fn random_forest_point(rng: &mut StdRng) -> (f32, f32) {
    let x = FOREST_EDGE_X - FOREST_WIDTH + rng.gen_range(0.0..1.0_f32) * FOREST_WIDTH;
    let z = (rng.gen_range(0.0..1.0_f32) - 0.5) * LEVEL_DEPTH;
    (x, z)
}

fn near_spawn(x: f32, z: f32, spawn: Vec3) -> bool {
    let dx = x - spawn.x;
    let dz = z - spawn.z;
    dx * dx + dz * dz < SPAWN_CLEARANCE * SPAWN_CLEARANCE
}

/// Trees with a minimum spacing (best effort), then bushes and boulders.
fn add_forest(world: &mut WorldRegistry, rng: &mut StdRng, tree_count: usize, spawn: Vec3) {
    let mut trees: Vec<(f32, f32)> = Vec::with_capacity(tree_count);
    for _ in 0..tree_count {
        let mut candidate = random_forest_point(rng);
        for _ in 0..TREE_PLACEMENT_ATTEMPTS {
            let (x, z) = candidate;
            let spaced = trees.iter().all(|&(tx, tz)| {
                let (dx, dz) = (x - tx, z - tz);
                dx * dx + dz * dz >= TREE_MIN_SPACING * TREE_MIN_SPACING
            });
            if spaced && !near_spawn(x, z, spawn) {
                break;
            }
            candidate = random_forest_point(rng);
        }
        let (x, z) = candidate;
        if near_spawn(x, z, spawn) {
            continue;
        }
        trees.push(candidate);
        world.add_platform(Platform::solid(Appearance::Tree, Bounds::square(x, z, TREE_TRUNK_RADIUS, PROP_SURFACE)));
    }

    for _ in 0..tree_count / 2 {
        let (x, z) = random_forest_point(rng);
        let radius = 0.5 + rng.gen_range(0.0..1.0_f32) * 0.5;
        if !near_spawn(x, z, spawn) {
            world.add_platform(Platform::solid(Appearance::Bush, Bounds::square(x, z, radius, PROP_SURFACE)));
        }
    }

    for _ in 0..tree_count * 9 / 10 {
        let (x, z) = random_forest_point(rng);
        let size = 0.8 + rng.gen_range(0.0..1.0_f32) * 1.2;
        if !near_spawn(x, z, spawn) {
            world.add_platform(Platform::solid(Appearance::Boulder, Bounds::square(x, z, size, PROP_SURFACE)));
        }
    }
}

// ============================================================================
// BACKGROUND LOADER
// ============================================================================

pub enum LoadStatus {
    Pending,
    Ready(LoadedAssets),
    Failed(GameError),
}

/// Runs a provider on a worker thread; the host polls it once per frame.
pub struct AssetLoader {
    rx: Option<mpsc::Receiver<Result<LoadedAssets, GameError>>>,
    started: Instant,
    timeout: Duration,
    provider: String,
}

impl AssetLoader {
    pub fn spawn<P: AssetProvider>(provider: P, timeout: Duration) -> Result<Self, GameError> {
        let (tx, rx) = mpsc::channel();
        let name = provider.name().to_string();
        thread::Builder::new()
            .name(format!("assets-{}", name))
            .spawn(move || {
                // The receiver may already be gone after a timeout; nothing to do then.
                let _ = tx.send(provider.load());
            })?;
        log::info!("Loading assets from '{}' (timeout {:.1}s)", name, timeout.as_secs_f32());
        Ok(Self { rx: Some(rx), started: Instant::now(), timeout, provider: name })
    }

    /// Non-blocking check. Ready and Failed are returned once; afterwards the loader is spent
    /// and reports Failed.
    pub fn poll(&mut self) -> LoadStatus {
        let Some(rx) = &self.rx else {
            return LoadStatus::Failed(GameError::AssetUnavailable(format!("'{}' already consumed", self.provider)));
        };
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                match self.finish(result) {
                    Ok(assets) => LoadStatus::Ready(assets),
                    Err(err) => LoadStatus::Failed(err),
                }
            }
            Err(mpsc::TryRecvError::Empty) => {
                if self.started.elapsed() >= self.timeout {
                    self.rx = None;
                    LoadStatus::Failed(self.timed_out())
                } else {
                    LoadStatus::Pending
                }
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                self.rx = None;
                LoadStatus::Failed(GameError::AssetUnavailable(format!("'{}' worker exited without a result", self.provider)))
            }
        }
    }

    /// Block until the provider answers or the timeout runs out.
    pub fn wait(mut self) -> Result<LoadedAssets, GameError> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| GameError::AssetUnavailable(format!("'{}' already consumed", self.provider)))?;
        let remaining = self.timeout.saturating_sub(self.started.elapsed());
        match rx.recv_timeout(remaining) {
            Ok(result) => self.finish(result),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(GameError::AssetUnavailable(format!("'{}' worker exited without a result", self.provider)))
            }
        }
    }

    fn finish(&self, result: Result<LoadedAssets, GameError>) -> Result<LoadedAssets, GameError> {
        match result {
            Ok(assets) => {
                log::info!(
                    "Assets ready in {:.2}s: {} joints, {} platforms",
                    self.started.elapsed().as_secs_f32(),
                    assets.skeleton.len(),
                    assets.world.platform_count()
                );
                Ok(assets)
            }
            Err(err) => {
                log::error!("Asset provider '{}' failed: {}", self.provider, err);
                Err(err)
            }
        }
    }

    fn timed_out(&self) -> GameError {
        log::error!("Asset provider '{}' timed out", self.provider);
        GameError::AssetUnavailable(format!("'{}' did not finish within {:.1}s", self.provider, self.timeout.as_secs_f32()))
    }
}

// World geometry registry: every surface the player can stand on or bump into.
//
// Platforms are a flat list of axis-aligned XZ rectangles with a surface height.
// Behaviour lives in the `PlatformKind` variant, so a floating rock carries only
// floating parameters and a sinking log only its sink state machine.
// Obstacles are kept alongside but are never ground; they are only queried for
// proximity.

use glam::{Vec2, Vec3};

/// Surface height reported by a fully submerged log.
/// Far below the water line, so no ground snap can ever reach it.
pub const SUBMERGED_SURFACE_Y: f32 = -1000.0;

// ============================================================================
// BOUNDS
// ============================================================================

/// Axis-aligned XZ footprint plus the walkable surface height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    pub surface_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32, surface_y: f32) -> Self {
        Self { min_x, max_x, min_z, max_z, surface_y }
    }

    /// Square footprint of half-size `half` centered on `(x, z)`.
    pub fn square(x: f32, z: f32, half: f32, surface_y: f32) -> Self {
        Self::new(x - half, x + half, z - half, z + half, surface_y)
    }

    /// Strict containment: points on the edge are outside.
    pub fn contains_xz(&self, p: Vec3) -> bool {
        p.x > self.min_x && p.x < self.max_x && p.z > self.min_z && p.z < self.max_z
    }

    /// Containment of a circle of radius `r` against the footprint (edges excluded).
    pub fn overlaps_circle_xz(&self, p: Vec3, r: f32) -> bool {
        p.x + r > self.min_x && p.x - r < self.max_x && p.z + r > self.min_z && p.z - r < self.max_z
    }

    pub fn center_xz(&self) -> Vec2 {
        Vec2::new((self.min_x + self.max_x) * 0.5, (self.min_z + self.max_z) * 0.5)
    }

    /// Radius of the circle used for solid push-out (larger half-extent).
    pub fn radius_xz(&self) -> f32 {
        ((self.max_x - self.min_x) * 0.5).max((self.max_z - self.min_z) * 0.5)
    }

    pub fn size_xz(&self) -> Vec2 {
        Vec2::new(self.max_x - self.min_x, self.max_z - self.min_z)
    }
}

// ============================================================================
// PLATFORM BEHAVIOUR
// ============================================================================

/// Bobbing parameters for a rock floating on the sea.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingParams {
    /// Height of the rock body at rest; the walkable surface sits `surface_offset` above.
    pub rest_y: f32,
    pub surface_offset: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
    pub tilt_amplitude: f32,
    /// Cosmetic rocking (x, z) in radians, rewritten every tick.
    pub tilt: Vec2,
}

/// Bobbing parameters for the pirate ship deck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipParams {
    pub rest_y: f32,
    pub deck_offset: f32,
    pub bob_amplitude: f32,
    pub bob_speed: f32,
    pub rock_amplitude: f32,
    pub rock_speed: f32,
    pub tilt: Vec2,
}

impl ShipParams {
    pub fn new(rest_y: f32) -> Self {
        Self {
            rest_y,
            deck_offset: 1.0,
            bob_amplitude: 0.3,
            bob_speed: 1.2,
            rock_amplitude: 0.05,
            rock_speed: 0.8,
            tilt: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Idle,
    /// Someone is standing on it; the trigger delay is running.
    PlayerPresent,
    Sinking,
    Submerged,
}

/// State machine for a log that gives way after being stood on too long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkingParams {
    pub state: SinkState,
    /// Game time at which the current uninterrupted stay began.
    pub presence_start: Option<f32>,
    pub sink_start: Option<f32>,
    pub trigger_delay: f32,
    pub sink_duration: f32,
    pub rest_y: f32,
    pub target_y: f32,
    /// Game time of the last splash burst while sinking.
    pub last_burst: Option<f32>,
}

impl SinkingParams {
    pub fn new(rest_y: f32, target_y: f32, trigger_delay: f32, sink_duration: f32) -> Self {
        Self {
            state: SinkState::Idle,
            presence_start: None,
            sink_start: None,
            trigger_delay,
            sink_duration,
            rest_y,
            target_y,
            last_burst: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == SinkState::Idle
            && self.presence_start.is_none()
            && self.sink_start.is_none()
            && self.last_burst.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformKind {
    Static,
    Floating(FloatingParams),
    SinkingLog(SinkingParams),
    Ship(ShipParams),
}

/// What a platform looks like. Chosen by the world builder, read by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Sand,
    Grass,
    Rock,
    Log,
    Deck,
    Tree,
    Bush,
    Boulder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub appearance: Appearance,
    pub bounds: Bounds,
    pub kind: PlatformKind,
    /// Trunks, bushes and boulders: pushes the player out instead of only holding them up.
    pub solid: bool,
}

impl Platform {
    pub fn new(appearance: Appearance, bounds: Bounds, kind: PlatformKind) -> Self {
        Self { appearance, bounds, kind, solid: false }
    }

    pub fn solid(appearance: Appearance, bounds: Bounds) -> Self {
        Self { appearance, bounds, kind: PlatformKind::Static, solid: true }
    }

    pub fn is_ship(&self) -> bool {
        matches!(self.kind, PlatformKind::Ship(_))
    }

    /// Whether ground snapping considers this platform at all.
    pub fn supports_ground(&self) -> bool {
        match &self.kind {
            PlatformKind::SinkingLog(log) => log.state != SinkState::Submerged,
            _ => true,
        }
    }
}

// ============================================================================
// OBSTACLES
// ============================================================================

/// A crab scuttling back and forth along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub position: Vec3,
    /// Patrol anchor; the patrol offset is measured from here along `axis`.
    pub origin: Vec3,
    /// Unit patrol direction.
    pub axis: Vec3,
    pub speed: f32,
    /// +1 or -1 along `axis`.
    pub direction: f32,
    pub range: f32,
    /// Walk cycle phase in radians; advances every tick.
    pub phase: f32,
    pub bob_amount: f32,
    /// Cosmetic heading for the renderer, flips with the direction.
    pub heading: f32,
}

impl Obstacle {
    pub fn new(origin: Vec3, axis: Vec3, speed: f32, range: f32, phase: f32) -> Self {
        Self {
            position: origin,
            origin,
            axis: axis.normalize_or_zero(),
            speed,
            direction: 1.0,
            range,
            phase,
            bob_amount: 0.1,
            heading: 0.0,
        }
    }

    /// Signed distance travelled from the anchor along the patrol axis.
    pub fn patrol_offset(&self) -> f32 {
        (self.position - self.origin).dot(self.axis)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub struct WorldRegistry {
    pub platforms: Vec<Platform>,
    pub obstacles: Vec<Obstacle>,
    pub water_level: f32,
}

impl WorldRegistry {
    pub fn new(water_level: f32) -> Self {
        Self { platforms: Vec::new(), obstacles: Vec::new(), water_level }
    }

    /// Add a platform and return its index.
    pub fn add_platform(&mut self, platform: Platform) -> usize {
        let idx = self.platforms.len();
        self.platforms.push(platform);
        idx
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> usize {
        let idx = self.obstacles.len();
        self.obstacles.push(obstacle);
        idx
    }

    /// The ship deck, if the world has one.
    pub fn ship(&self) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.is_ship())
    }

    pub fn sinking_logs(&self) -> impl Iterator<Item = (&Bounds, &SinkingParams)> {
        self.platforms.iter().filter_map(|p| match &p.kind {
            PlatformKind::SinkingLog(log) => Some((&p.bounds, log)),
            _ => None,
        })
    }

    /// Return every sinking log to Idle at its rest height with cleared timers.
    pub fn reset_sinking_logs(&mut self) {
        for platform in &mut self.platforms {
            if let PlatformKind::SinkingLog(log) = &mut platform.kind {
                *log = SinkingParams::new(log.rest_y, log.target_y, log.trigger_delay, log.sink_duration);
                platform.bounds.surface_y = log.rest_y;
            }
        }
    }

    pub fn platform_count(&self) -> usize {
        self.platforms.len()
    }
}

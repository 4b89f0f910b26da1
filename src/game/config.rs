// Tunable constants for the simulation, grouped per component.
//
// Defaults are tuned for a fixed 60 Hz tick: gravity, move speed and the
// sink/settle rates are per-tick quantities, not per-second ones.
// A RON file can override any subset of fields; missing fields keep the default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::GameError;

/// Environment variable that points at an alternate config file.
pub const CONFIG_ENV_VAR: &str = "PIRATE_ESCAPE_CONFIG";
/// Config file looked up in the working directory when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "pirate_escape.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds of simulated time per tick.
    pub tick_seconds: f32,
    /// Upper bound on ticks run for a single rendered frame (spiral-of-death guard).
    pub max_ticks_per_frame: u32,
    /// How long the host waits for the asset provider before giving up.
    pub asset_timeout_secs: f32,
    pub physics: PhysicsConfig,
    pub session: SessionConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub world: WorldConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 60.0,
            max_ticks_per_frame: 5,
            asset_timeout_secs: 10.0,
            physics: PhysicsConfig::default(),
            session: SessionConfig::default(),
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text. Unspecified fields fall back to defaults.
    pub fn from_ron(text: &str) -> Result<Self, GameError> {
        let config: GameConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron(&text)
    }

    /// Load from `$PIRATE_ESCAPE_CONFIG`, then `./pirate_escape.ron`, else defaults.
    /// A file that exists but fails to parse is an error, not a silent fallback.
    pub fn load_or_default() -> Result<Self, GameError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            log::info!("Loading config from {}", path);
            return Self::load(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Loading config from {}", local.display());
            return Self::load(local);
        }
        log::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), GameError> {
        if self.tick_seconds.is_nan() || self.tick_seconds <= 0.0 {
            return Err(GameError::Config("tick_seconds must be positive".into()));
        }
        if self.camera.min_distance > self.camera.max_distance {
            return Err(GameError::Config("camera.min_distance exceeds max_distance".into()));
        }
        if self.camera.min_polar > self.camera.max_polar {
            return Err(GameError::Config("camera.min_polar exceeds max_polar".into()));
        }
        if self.session.lives == 0 {
            return Err(GameError::Config("session.lives must be at least 1".into()));
        }
        Ok(())
    }
}

// ============================================================================
// PLAYER PHYSICS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Added to velocity.y every airborne tick.
    pub gravity: f32,
    pub jump_force: f32,
    /// Horizontal displacement per tick while walking.
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    /// Facing change per tick while a rotate key is held.
    pub rotation_speed: f32,
    pub max_jumps: u8,
    /// Half-height of the band around a surface that counts as landing.
    pub ground_tolerance: f32,
    pub player_radius: f32,
    /// Extra gap kept between the player and a solid after push-out.
    pub solid_buffer: f32,
    /// Solids block the player while below `surface_y + solid_clearance`.
    pub solid_clearance: f32,
    pub obstacle_contact_distance: f32,
    pub water_level: f32,
    /// Downward drift per tick while drowning.
    pub drown_sink_speed: f32,
    /// Vertical half-band around a sinking log's surface that counts as standing on it.
    pub log_presence_band: f32,
    /// Horizontal slack around the ship deck for the on-ship predicate.
    pub ship_reach_tolerance: f32,
    /// Spawn point used at start and after every lost life.
    pub spawn_position: [f32; 3],
    pub spawn_facing: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -0.015,
            jump_force: 0.3,
            move_speed: 0.12,
            sprint_multiplier: 2.0,
            rotation_speed: 0.04,
            max_jumps: 2,
            ground_tolerance: 0.5,
            player_radius: 0.5,
            solid_buffer: 0.1,
            solid_clearance: 2.0,
            obstacle_contact_distance: 1.5,
            water_level: -1.0,
            drown_sink_speed: 0.02,
            log_presence_band: 1.0,
            ship_reach_tolerance: 3.0,
            spawn_position: [-60.0, 1.0, 0.0],
            spawn_facing: std::f32::consts::FRAC_PI_2,
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lives: u32,
    pub drowning_duration: f32,
    /// Continuous seconds on the ship deck needed to win.
    pub win_dwell: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lives: 3,
            drowning_duration: 3.0,
            win_dwell: 3.0,
        }
    }
}

// ============================================================================
// CAMERA
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Orbit distance after the intro.
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Height of the eye above the player before the polar contribution.
    pub height: f32,
    /// Polar angle (radians) after setup.
    pub polar: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    /// Radians of orbit per pixel of drag.
    pub drag_sensitivity: f32,
    /// World units of pan per pixel of horizontal drag.
    pub pan_sensitivity: f32,
    /// Multiplier applied to the pan offset every idle tick.
    pub pan_decay: f32,
    /// Pan offsets shorter than this snap to zero.
    pub pan_epsilon: f32,
    /// Distance change per unit of wheel delta.
    pub zoom_speed: f32,
    /// Fraction of the remaining distance covered per tick.
    pub follow_factor: f32,
    pub intro_duration: f32,
    pub intro_start: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 14.0,
            min_distance: 5.0,
            max_distance: 25.0,
            height: 6.0,
            polar: -0.05,
            min_polar: -std::f32::consts::FRAC_PI_3,
            max_polar: std::f32::consts::FRAC_PI_6,
            drag_sensitivity: 0.005,
            pan_sensitivity: 0.02,
            pan_decay: 0.9,
            pan_epsilon: 0.1,
            zoom_speed: 0.01,
            follow_factor: 0.15,
            intro_duration: 4.0,
            intro_start: [0.0, 40.0, 0.0],
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

// ============================================================================
// ANIMATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub transition_duration: f32,
    /// Peak blend factor reached at the end of a transition window.
    pub transition_blend: f32,
    /// Blend factor once the transition window has closed.
    pub settle_blend: f32,
    /// Horizontal speed per tick above which the player counts as moving.
    pub moving_threshold: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            transition_duration: 0.3,
            transition_blend: 0.3,
            settle_blend: 0.1,
            moving_threshold: 0.01,
        }
    }
}

// ============================================================================
// WORLD
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub sea_center_x: f32,
    pub sea_size: f32,
    /// Segments per side of the wave mesh; vertices = (segments + 1)^2.
    pub sea_segments: u32,
    pub tree_count: u32,
    /// Sinking logs: how long the player may stand before it gives way.
    pub log_trigger_delay: f32,
    pub log_sink_duration: f32,
    /// Per-tick easing factor toward the sunk height.
    pub log_sink_blend: f32,
    /// Seconds between splash bursts while a log is sinking.
    pub log_burst_interval: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EA5_1DE,
            sea_center_x: 60.0,
            sea_size: 200.0,
            sea_segments: 100,
            tree_count: 80,
            log_trigger_delay: 3.5,
            log_sink_duration: 2.0,
            log_sink_blend: 0.05,
            log_burst_interval: 0.4,
        }
    }
}

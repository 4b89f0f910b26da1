// Simulation core - everything that advances the game state each tick.
// The host (main.rs + engine/) feeds input intent in and reads state back out;
// the tick itself never touches windows, GPUs or wall-clock time.

pub mod animation;
pub mod assets;
pub mod camera;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod player;
pub mod session;
pub mod simulation;
pub mod world;

pub use config::GameConfig;
pub use error::GameError;
pub use simulation::Simulation;

/// Slack for comparing accumulated tick time against a duration.
/// Sixty additions of 1/60 in f32 land a hair short of 1.0.
const TIME_EPSILON: f32 = 1e-4;

/// True once `elapsed` seconds have covered `duration`.
pub(crate) fn timer_elapsed(elapsed: f32, duration: f32) -> bool {
    elapsed + TIME_EPSILON >= duration
}

// Error taxonomy for the simulation core.
// Transient input noise is resolved inside engine::input and never shows up here.

/// Errors surfaced by the simulation core and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Skeleton or world geometry could not be produced in time.
    /// Fatal for entering the Playing state.
    #[error("asset unavailable: {0}")]
    AssetUnavailable(String),

    /// Something the blender or registry relies on is missing.
    /// Logged by the caller and the affected update is skipped.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ron::error::SpannedError> for GameError {
    fn from(err: ron::error::SpannedError) -> Self {
        GameError::Config(err.to_string())
    }
}

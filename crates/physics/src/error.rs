use compute::{BackendKind, ComputeError, BLOCK_SIZE};
use thiserror::Error;

/// Rejected configuration. Always detected before the frame loop starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("particle count must be positive")]
    ZeroParticles,
    #[error("particle count {count} is not a multiple of {}", BLOCK_SIZE)]
    NotBlockAligned { count: usize },
    #[error("at least one particle group is required")]
    NoGroups,
    #[error("{groups} groups cannot share {count} particles")]
    TooManyGroups { count: usize, groups: usize },
    #[error("group {group} has invalid spread {spread}")]
    InvalidSpread { group: usize, spread: f32 },
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("frame depth must be 2 or 3, got {0}")]
    InvalidFrameDepth(usize),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("backend error: {0}")]
    Backend(#[from] ComputeError),
    #[error("backend {0} is not loaded")]
    BackendNotLoaded(BackendKind),
    #[error("write set is still referenced by a reader")]
    WriteSetInUse,
    #[error("read set is still referenced by a reader")]
    ReadSetInUse,
    #[error("device returned {actual} particles, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

use compute::ComputeError;
use physics::PhysicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("{name} timeline failed: {message}")]
    Timeline { name: &'static str, message: String },
    #[error("{0} timeline is closed")]
    TimelineClosed(&'static str),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
}

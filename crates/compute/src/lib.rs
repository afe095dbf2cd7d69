#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
//! # Compute Backends
//!
//! Execution strategies for one step of the all-pairs gravity simulation.
//!
//! Every backend implements [`SimulationBackend`]: given the current read set
//! of particles it fills the write set with the next state and never touches
//! the read set. Three strategies are available:
//!
//! -   [`BackendKind::ScalarCpu`]: a plain Rust kernel run over static
//!     contiguous partitions on a dedicated thread pool.
//! -   [`BackendKind::VectorCpu`]: the same partitioning, with an inner loop
//!     that accumulates eight interactions per lane block.
//! -   [`BackendKind::Gpu`]: a single WGSL compute dispatch through `wgpu`
//!     (requires the `gpu` feature).
//!
//! CPU backends finish the step before returning. The GPU backend only
//! submits it and hands back a [`DeviceStep`] through [`StepOutcome`]; the
//! command order it records is planned by [`plan_step`], which needs no
//! device.

use thiserror::Error;

pub mod backend;
pub mod cpu_backend;
pub mod kernels;
pub mod layout;
pub mod resource_state;
pub mod types;

#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::{BackendKind, DeviceStep, SimulationBackend, StepBuffers, StepOutcome};
pub use cpu_backend::{hardware_threads, CpuBackend};
pub use layout::{partition, BLOCK_SIZE, WORKGROUP_SIZE};
pub use resource_state::{plan_step, BufferState, BufferStates, StepCommand};
pub use types::{KernelParams, Particle};

#[cfg(feature = "gpu")]
pub use wgpu_backend::{WgpuBackend, WgpuStep};

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("backend not available: {0}")]
    BackendUnavailable(BackendKind),
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error("device buffer {index} is {actual}, expected {expected}")]
    ResourceState {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("device error: {0}")]
    Device(String),
}

/// Returns `true` if support for `kind` was compiled into this build.
///
/// A compiled-in GPU backend can still fail to initialise when no adapter is
/// present; [`create_backend`] reports that case.
#[must_use]
pub const fn is_compiled(kind: BackendKind) -> bool {
    match kind {
        BackendKind::ScalarCpu | BackendKind::VectorCpu => true,
        BackendKind::Gpu => cfg!(feature = "gpu"),
    }
}

/// Creates the backend for `kind`.
///
/// `threads` sizes the CPU worker pool and is ignored by the GPU backend;
/// `particle_count` sizes the device buffers and is ignored by CPU backends.
///
/// # Errors
///
/// Returns [`ComputeError::BackendUnavailable`] if the GPU backend was not
/// compiled in or no adapter could be found, and [`ComputeError::ThreadPool`]
/// if the CPU worker pool cannot be spawned.
pub fn create_backend(
    kind: BackendKind,
    threads: usize,
    particle_count: usize,
    params: KernelParams,
) -> Result<Box<dyn SimulationBackend>, ComputeError> {
    match kind {
        BackendKind::ScalarCpu => Ok(Box::new(CpuBackend::scalar(threads, params)?)),
        BackendKind::VectorCpu => Ok(Box::new(CpuBackend::vector(threads, params)?)),
        BackendKind::Gpu => create_gpu_backend(particle_count, params),
    }
}

#[cfg(feature = "gpu")]
fn create_gpu_backend(
    particle_count: usize,
    params: KernelParams,
) -> Result<Box<dyn SimulationBackend>, ComputeError> {
    Ok(Box::new(WgpuBackend::new(particle_count, params)?))
}

#[cfg(not(feature = "gpu"))]
#[allow(clippy::unnecessary_wraps)]
fn create_gpu_backend(
    _particle_count: usize,
    _params: KernelParams,
) -> Result<Box<dyn SimulationBackend>, ComputeError> {
    tracing::warn!("GPU backend requested but the `gpu` feature is disabled");
    Err(ComputeError::BackendUnavailable(BackendKind::Gpu))
}

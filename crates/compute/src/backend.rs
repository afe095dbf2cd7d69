use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{layout::BLOCK_SIZE, ComputeError, Particle};

/// The three interchangeable execution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    ScalarCpu,
    #[default]
    VectorCpu,
    Gpu,
}

impl BackendKind {
    /// Cycling order used by the runtime "change compute type" control.
    pub const ALL: [BackendKind; 3] = [Self::ScalarCpu, Self::VectorCpu, Self::Gpu];

    /// The next kind in round-robin order.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::ScalarCpu => Self::VectorCpu,
            Self::VectorCpu => Self::Gpu,
            Self::Gpu => Self::ScalarCpu,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScalarCpu => "scalar-cpu",
            Self::VectorCpu => "vector-cpu",
            Self::Gpu => "gpu",
        }
    }

    /// Human readable label used in the telemetry title.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ScalarCpu => "CPU Scalar Kernel",
            Self::VectorCpu => "CPU Vector Kernel",
            Self::Gpu => "GPU Compute",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "scalar-cpu" | "scalar" => Ok(Self::ScalarCpu),
            "vector-cpu" | "vector" | "simd" => Ok(Self::VectorCpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(format!(
                "unknown backend `{other}` (expected scalar-cpu, vector-cpu or gpu)"
            )),
        }
    }
}

/// The two halves of the double buffer handed to a backend for one step.
pub struct StepBuffers<'a> {
    /// Which physical buffer (0 or 1) `read` is. Device backends keep their
    /// own copies of both buffers and use this to pick the matching pair.
    pub read_index: usize,
    pub read: &'a [Particle],
    pub write: &'a mut [Particle],
}

impl StepBuffers<'_> {
    /// Validates the shape invariants every backend relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] if the sets differ in length,
    /// are empty, or are not a multiple of [`BLOCK_SIZE`].
    pub fn check(&self) -> Result<(), ComputeError> {
        if self.read.len() != self.write.len() {
            return Err(ComputeError::ShapeMismatch(
                "read and write sets differ in length",
            ));
        }
        if self.read.is_empty() {
            return Err(ComputeError::ShapeMismatch("particle sets are empty"));
        }
        if self.read.len() % BLOCK_SIZE != 0 {
            return Err(ComputeError::ShapeMismatch(
                "particle count is not a multiple of the kernel block size",
            ));
        }
        if self.read_index > 1 {
            return Err(ComputeError::ShapeMismatch("read index must be 0 or 1"));
        }
        Ok(())
    }
}

/// A step submitted to a device whose result is still in device memory.
///
/// Handles are shared between the frame thread and the timelines, so every
/// method takes `&self`.
pub trait DeviceStep: Send + Sync {
    /// Blocks until the device has finished the step.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Device`] if the device is lost.
    fn wait(&self) -> Result<(), ComputeError>;

    /// Copies the step's result out of device memory, waiting for the step
    /// first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Device`] if the result cannot be mapped.
    fn read(&self) -> Result<Vec<Particle>, ComputeError>;
}

/// Where the result of a [`SimulationBackend::step`] lives.
#[derive(Clone)]
pub enum StepOutcome {
    /// The write set holds the new state.
    Host,
    /// The new state is on the device; the host write set was not touched.
    Device(Arc<dyn DeviceStep>),
}

impl StepOutcome {
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    #[must_use]
    pub fn device(&self) -> Option<&Arc<dyn DeviceStep>> {
        match self {
            Self::Host => None,
            Self::Device(step) => Some(step),
        }
    }
}

impl fmt::Debug for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("Host"),
            Self::Device(_) => f.write_str("Device(..)"),
        }
    }
}

pub trait SimulationBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Worker threads used per step, for CPU backends.
    fn threads(&self) -> Option<usize> {
        None
    }

    /// Loads a freshly seeded particle set into any backend-private storage.
    ///
    /// Called whenever the double buffer is reseeded, before the first
    /// [`step`](Self::step) under this backend. Both halves of the double
    /// buffer hold `seed` afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`ComputeError`] if the backend storage cannot be updated.
    fn reset(&mut self, seed: &[Particle]) -> Result<(), ComputeError> {
        let _ = seed;
        Ok(())
    }

    /// Advances the simulation by one step.
    ///
    /// `buffers.read` is never modified. CPU backends block until every entry
    /// of `buffers.write` has been written exactly once and return
    /// [`StepOutcome::Host`]. Device backends only submit the step and return
    /// [`StepOutcome::Device`] without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ShapeMismatch`] for invalid buffers and
    /// backend-specific errors for device failures.
    fn step(&mut self, buffers: StepBuffers<'_>) -> Result<StepOutcome, ComputeError>;
}

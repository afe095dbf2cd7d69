use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One simulated body, laid out exactly as the WGSL `Particle` struct.
///
/// `position.w` carries the body's weight in the force law and `velocity.w`
/// receives the magnitude of the last acceleration (diagnostic only).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 4],
    pub velocity: [f32; 4],
}

impl Particle {
    #[must_use]
    pub const fn new(position: [f32; 4], velocity: [f32; 4]) -> Self {
        Self { position, velocity }
    }

    #[must_use]
    pub fn xyz(&self) -> [f32; 3] {
        [self.position[0], self.position[1], self.position[2]]
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.position[3]
    }
}

/// Numerical parameters of the softened inverse-cube force law.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelParams {
    /// Integration time step.
    pub dt: f32,
    /// Added to every squared separation so coincident bodies stay finite.
    pub softening_squared: f32,
    /// Scales `position.w` of the attracting body into its mass.
    pub gravitational_constant: f32,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            dt: 0.1,
            softening_squared: 0.000_001_562_5,
            gravitational_constant: 6.673e-11 * 10_000.0,
        }
    }
}

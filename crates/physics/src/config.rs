use std::path::Path;

use compute::{hardware_threads, BackendKind, KernelParams, BLOCK_SIZE};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_PARTICLE_COUNT: usize = 10_000;
/// Radius of each default cluster; the two centres sit half of it either
/// side of the origin.
pub const PARTICLE_SPREAD: f32 = 400.0;
pub const DEFAULT_PARTICLE_WEIGHT: f32 = 10_000.0 * 10_000.0;
pub const DEFAULT_VELOCITY_W: f32 = 1.0 / 100_000_000.0;

/// One seeded cluster of particles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub center: [f32; 3],
    /// Bulk velocity given to every particle of the group.
    pub velocity: [f32; 3],
    /// Radius of the sphere particles are placed in.
    pub spread: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub particle_count: usize,
    pub seed: u64,
    pub groups: Vec<GroupConfig>,
    pub kernel: KernelParams,
    /// Stored in `position.w` of every particle.
    pub particle_weight: f32,
    /// Initial `velocity.w` of every particle.
    pub velocity_w: f32,
    /// CPU worker count; detected from the host when unset.
    pub threads: Option<usize>,
    pub backend: BackendKind,
    /// Frames the CPU may run ahead of the render timeline.
    pub frame_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        let center = PARTICLE_SPREAD * 0.5;
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            seed: 0,
            groups: vec![
                GroupConfig {
                    center: [center, 0.0, 0.0],
                    velocity: [0.0, 0.0, -20.0],
                    spread: PARTICLE_SPREAD,
                },
                GroupConfig {
                    center: [-center, 0.0, 0.0],
                    velocity: [0.0, 0.0, 20.0],
                    spread: PARTICLE_SPREAD,
                },
            ],
            kernel: KernelParams::default(),
            particle_weight: DEFAULT_PARTICLE_WEIGHT,
            velocity_w: DEFAULT_VELOCITY_W,
            threads: None,
            backend: BackendKind::default(),
            frame_depth: 2,
        }
    }
}

impl SimConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] for malformed JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks every constraint the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.particle_count;
        if count == 0 {
            return Err(ConfigError::ZeroParticles);
        }
        if count % BLOCK_SIZE != 0 {
            return Err(ConfigError::NotBlockAligned { count });
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        if self.groups.len() > count {
            return Err(ConfigError::TooManyGroups {
                count,
                groups: self.groups.len(),
            });
        }
        for (group, g) in self.groups.iter().enumerate() {
            // The rejection test compares against spread², which must not overflow.
            if !(g.spread > 0.0 && (g.spread * g.spread).is_finite()) {
                return Err(ConfigError::InvalidSpread {
                    group,
                    spread: g.spread,
                });
            }
        }
        let dt = self.kernel.dt;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep(dt));
        }
        if !(2..=3).contains(&self.frame_depth) {
            return Err(ConfigError::InvalidFrameDepth(self.frame_depth));
        }
        Ok(())
    }

    /// Particles per group: an equal share each, the remainder going to the
    /// last group.
    #[must_use]
    pub fn group_sizes(&self) -> Vec<usize> {
        let groups = self.groups.len();
        if groups == 0 {
            return Vec::new();
        }
        let share = self.particle_count / groups;
        let mut sizes = vec![share; groups];
        sizes[groups - 1] += self.particle_count % groups;
        sizes
    }

    /// Resolved CPU worker count.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        hardware_threads(self.threads.unwrap_or(0))
    }
}

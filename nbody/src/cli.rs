//! Command-line options and how they override the configuration file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use compute::BackendKind;
use physics::SimConfig;

/// Frames run when `--frames` is not given.
pub const DEFAULT_FRAMES: u64 = 600;

/// Runs the n-body gravity simulation headless for a fixed number of frames.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "nbody", version, about)]
pub struct Cli {
    /// JSON configuration file; command-line options override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of particles (must be a multiple of 8).
    #[arg(short = 'n', long)]
    pub particles: Option<usize>,

    /// Initial backend: scalar-cpu, vector-cpu or gpu.
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// CPU worker threads.
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Frames to run before exiting.
    #[arg(short, long, default_value_t = DEFAULT_FRAMES)]
    pub frames: u64,

    /// Seed for the initial particle layout.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Request a switch to the next backend every N frames.
    #[arg(long, value_name = "N")]
    pub cycle_every: Option<u64>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            particles: None,
            backend: None,
            threads: None,
            frames: DEFAULT_FRAMES,
            seed: None,
            cycle_every: None,
        }
    }
}

impl Cli {
    /// Loads the configuration file, if any, and applies the overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SimConfig::default(),
        };

        if let Some(particles) = self.particles {
            config.particle_count = particles;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate().context("invalid simulation config")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_options() {
        let cli = Cli::try_parse_from([
            "nbody",
            "--particles",
            "256",
            "--backend",
            "scalar",
            "--threads",
            "3",
            "--frames",
            "10",
            "--seed",
            "9",
            "--cycle-every",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.particles, Some(256));
        assert_eq!(cli.backend, Some(BackendKind::ScalarCpu));
        assert_eq!(cli.frames, 10);
        assert_eq!(cli.cycle_every, Some(4));

        let config = cli.load_config().unwrap();
        assert_eq!(config.particle_count, 256);
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.seed, 9);
        assert_eq!(config.backend, BackendKind::ScalarCpu);
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["nbody"]).unwrap();
        assert_eq!(cli.frames, DEFAULT_FRAMES);
        assert_eq!(cli, Cli::default());
        assert_eq!(cli.load_config().unwrap(), SimConfig::default());
    }

    #[test]
    fn unaligned_particle_count_is_rejected() {
        let cli = Cli::try_parse_from(["nbody", "-n", "1001"]).unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(format!("{err:#}").contains("multiple"), "{err:#}");
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        assert!(Cli::try_parse_from(["nbody", "--backend", "metal"]).is_err());
    }
}

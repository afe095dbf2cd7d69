//! # Headless Frame Loop
//!
//! Builds the simulation from the command line, drives it through the frame
//! driver with a [`HeadlessPresenter`] and reports what was presented.

use anyhow::{Context, Result};
use compute::BackendKind;
use physics::{diagnostics, Simulation};
use runtime::{FrameDriver, HeadlessPresenter, SystemClock};

use crate::Cli;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub frames_presented: u64,
    pub backend_switches: u64,
    pub final_backend: BackendKind,
    pub last_title: Option<String>,
}

/// Runs the frame loop for `cli.frames` frames.
///
/// # Errors
///
/// Returns any configuration, backend or timeline error. All of them end the
/// run.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    let config = cli.load_config()?;
    tracing::info!(
        particles = config.particle_count,
        backend = %config.backend,
        frames = cli.frames,
        "starting simulation"
    );

    let sim = Simulation::new(config).context("failed to initialise simulation")?;
    let presenter = HeadlessPresenter::new();
    let stats = presenter.stats();
    let mut driver = FrameDriver::new(sim, Box::new(presenter), Box::new(SystemClock::new()))
        .context("failed to start frame driver")?;

    let mut backend_switches = 0;
    for frame in 0..cli.frames {
        if let Some(every) = cli.cycle_every.filter(|n| *n > 0) {
            if frame > 0 && frame % every == 0 {
                driver.request_backend_cycle();
            }
        }
        let report = driver
            .run_frame()
            .with_context(|| format!("frame {frame} failed"))?;
        if report.reset {
            backend_switches += 1;
        }
    }

    driver
        .sync_host()
        .context("failed to read back the final particles")?;
    let final_backend = driver.simulation().backend_kind();
    let particles = driver.simulation().read();
    tracing::info!(
        centroid = ?diagnostics::centroid(particles),
        momentum = ?diagnostics::total_momentum(particles),
        "final state"
    );
    driver.finish().context("render timeline failed")?;

    let stats = stats.lock();
    tracing::info!(
        frames = cli.frames,
        presented = stats.frames_presented,
        "simulation finished"
    );
    Ok(RunSummary {
        frames: cli.frames,
        frames_presented: stats.frames_presented,
        backend_switches,
        final_backend,
        last_title: stats.last_title.clone(),
    })
}

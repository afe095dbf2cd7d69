//! # Frame Driver
//!
//! Sequences one displayed frame through
//! `Idle → Updating → Simulating → AwaitingCompute → Rendering → Presenting →
//! AdvancingFrame → Idle`.
//!
//! A CPU step runs on the calling thread, fanned out to the backend's pool,
//! and is complete when `step()` returns. A device step is only submitted: a
//! job on the compute timeline waits for the device before the compute value
//! of that step is signalled, so the calling thread never blocks on it. Draw
//! and present run as jobs on the render timeline, behind a queue-side wait
//! for the compute value of the step they show; a device result is read back
//! inside the draw job.

use std::sync::Arc;
use std::time::Duration;

use compute::{BackendKind, DeviceStep, Particle, StepOutcome};
use parking_lot::Mutex;
use physics::Simulation;

use crate::{
    BackendSelector, Camera, CameraInput, Clock, FrameStats, Presenter, RenderFrame,
    RuntimeError, StepTimer, Synchronizer,
};

/// Bound on the wait for the presenter at the top of each frame.
pub const PRESENT_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Updating,
    Simulating,
    AwaitingCompute,
    Rendering,
    Presenting,
    AdvancingFrame,
}

/// What happened during one call to [`FrameDriver::run_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_number: u64,
    pub backend: BackendKind,
    /// The frame reseeded the particles instead of stepping them.
    pub reset: bool,
    pub compute_fence: u64,
    pub render_fence: u64,
}

type SharedPresenter = Arc<Mutex<Box<dyn Presenter>>>;

enum Stepped {
    Reset,
    Host,
    Device(Arc<dyn DeviceStep>),
}

/// Where the draw job takes its particles from.
enum Source {
    Host(Arc<[Particle]>),
    Device(Arc<dyn DeviceStep>),
}

pub struct FrameDriver {
    sim: Simulation,
    sync: Synchronizer,
    selector: BackendSelector,
    presenter: SharedPresenter,
    timer: StepTimer,
    stats: FrameStats,
    camera: Camera,
    input: CameraInput,
    state: FrameState,
    frame_number: u64,
    finished: bool,
}

impl FrameDriver {
    /// Starts the timelines and prepares the first frame.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeline`] if a timeline cannot start.
    pub fn new(
        sim: Simulation,
        presenter: Box<dyn Presenter>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, RuntimeError> {
        let sync = Synchronizer::new(sim.config().frame_depth)?;
        let selector = BackendSelector::new(sim.backend_kind(), sim.available());
        tracing::info!(depth = sync.depth(), "frame driver ready");
        Ok(Self {
            sim,
            sync,
            selector,
            presenter: Arc::new(Mutex::new(presenter)),
            timer: StepTimer::new(clock),
            stats: FrameStats::new(),
            camera: Camera::default(),
            input: CameraInput::default(),
            state: FrameState::Idle,
            frame_number: 0,
            finished: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    #[must_use]
    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    #[must_use]
    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn set_input(&mut self, input: CameraInput) {
        self.input = input;
    }

    /// Requests a switch to the next available backend. Takes effect at the
    /// start of the next frame's simulation and resets the particles.
    pub fn request_backend_cycle(&mut self) -> BackendKind {
        let next = self.selector.cycle();
        tracing::info!(backend = %next, "backend switch requested");
        next
    }

    fn transition(&mut self, next: FrameState) {
        tracing::trace!(from = ?self.state, to = ?next, frame = self.frame_number);
        self.state = next;
    }

    /// Runs one full frame.
    ///
    /// # Errors
    ///
    /// Any error is fatal: a failed step, a failed render job (reported one
    /// frame later) or a closed timeline.
    pub fn run_frame(&mut self) -> Result<FrameReport, RuntimeError> {
        self.transition(FrameState::Updating);
        self.update()?;

        self.transition(FrameState::Simulating);
        let stepped = self.simulate()?;
        let reset = matches!(stepped, Stepped::Reset);

        self.transition(FrameState::AwaitingCompute);
        if let Stepped::Device(device) = &stepped {
            let device = Arc::clone(device);
            self.sync.submit_compute(move || Ok(device.wait()?))?;
        }
        let compute_fence = self.sync.signal_compute()?;
        self.sync.render_waits_for_compute(compute_fence)?;

        self.transition(FrameState::Rendering);
        self.sim.flip();
        let read_buffer = self.sim.store().read_index();
        let frame_number = self.frame_number;
        let slot = self.sync.frame_index();
        let camera = self.camera.transforms();
        let backend = self.sim.backend_kind();
        let source = match stepped {
            Stepped::Device(device) => Source::Device(device),
            Stepped::Reset | Stepped::Host => Source::Host(self.sim.read_shared()),
        };
        let presenter = Arc::clone(&self.presenter);
        self.sync.submit_render(move || {
            let particles = match source {
                Source::Host(particles) => particles,
                Source::Device(device) => device.read()?.into(),
            };
            let frame = RenderFrame { frame_number, slot, particles, camera, backend };
            presenter.lock().draw(&frame)
        })?;

        self.transition(FrameState::Presenting);
        let presenter = Arc::clone(&self.presenter);
        self.sync.submit_render(move || presenter.lock().present())?;

        self.transition(FrameState::AdvancingFrame);
        let render_fence = self.sync.advance_frame()?;
        self.sync.note_buffer_read(read_buffer, render_fence);

        let report = FrameReport {
            frame_number: self.frame_number,
            backend: self.sim.backend_kind(),
            reset,
            compute_fence,
            render_fence,
        };
        self.frame_number += 1;
        self.transition(FrameState::Idle);
        Ok(report)
    }

    fn update(&mut self) -> Result<(), RuntimeError> {
        if !self.sync.wait_for_present(PRESENT_WAIT) {
            tracing::debug!(frame = self.frame_number, "present wait expired");
        }
        self.sync.check()?;

        let delta = self.timer.tick();
        let sample = self.stats.record(
            delta,
            self.timer.total_seconds(),
            self.sim.backend_kind(),
            self.sim.threads(),
        );
        if let Some(sample) = sample {
            tracing::info!("{}", sample.title());
            let presenter = Arc::clone(&self.presenter);
            self.sync.submit_render(move || {
                presenter.lock().show_telemetry(&sample);
                Ok(())
            })?;
        }

        self.camera.update(&self.input, delta as f32);
        Ok(())
    }

    /// Steps the simulation, or performs a pending backend switch.
    fn simulate(&mut self) -> Result<Stepped, RuntimeError> {
        if let Some(kind) = self.selector.take_pending() {
            // Nothing may still read either buffer while both are reseeded.
            self.sync.wait_for_render_idle()?;
            self.sim.select(kind)?;
            self.sim.reset()?;
            tracing::info!(backend = %kind, threads = ?self.sim.threads(), "switched backend");
            return Ok(Stepped::Reset);
        }

        self.sync
            .wait_for_buffer_release(self.sim.store().write_index());
        Ok(match self.sim.step()? {
            StepOutcome::Host => Stepped::Host,
            StepOutcome::Device(device) => Stepped::Device(device),
        })
    }

    /// Brings the host copy of the particles up to date with the last step,
    /// reading it back from the device if needed.
    ///
    /// # Errors
    ///
    /// Returns a timeline error if rendering failed, or the simulation's error
    /// if the readback fails.
    pub fn sync_host(&mut self) -> Result<(), RuntimeError> {
        if self.sim.is_host_current() {
            return Ok(());
        }
        self.sync.wait_for_render_idle()?;
        self.sim.sync_host()?;
        Ok(())
    }

    /// Drains the render timeline and reports any late failure.
    ///
    /// # Errors
    ///
    /// Returns the first failure of a render job, if any.
    pub fn finish(mut self) -> Result<(), RuntimeError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), RuntimeError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.sync.wait_for_render_idle()?;
        tracing::info!(frames = self.frame_number, "frame loop stopped");
        self.sync.check()
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "frame driver shut down with an error");
        }
    }
}

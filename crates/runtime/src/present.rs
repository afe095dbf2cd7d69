//! The boundary to the render/display collaborator.

use std::sync::Arc;

use compute::{BackendKind, Particle};
use parking_lot::Mutex;

use crate::{CameraTransforms, TelemetrySample};

/// Everything the renderer receives for one frame.
///
/// `particles` is the read set of the frame. Implementations must not keep
/// it beyond [`Presenter::draw`].
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub frame_number: u64,
    /// Per-frame resource slot.
    pub slot: usize,
    pub particles: Arc<[Particle]>,
    pub camera: CameraTransforms,
    pub backend: BackendKind,
}

/// Render and present target, driven from the render timeline.
pub trait Presenter: Send + 'static {
    /// Records the draw of `frame`.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the frame loop.
    fn draw(&mut self, frame: &RenderFrame) -> anyhow::Result<()>;

    /// Hands the drawn frame to the display.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the frame loop.
    fn present(&mut self) -> anyhow::Result<()>;

    /// Receives the once-per-second statistics.
    fn show_telemetry(&mut self, sample: &TelemetrySample) {
        let _ = sample;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenterStats {
    pub frames_drawn: u64,
    pub frames_presented: u64,
    pub last_frame_number: Option<u64>,
    pub last_particle_count: usize,
    pub last_bounds: Option<([f32; 3], [f32; 3])>,
    pub last_centroid: Option<[f64; 3]>,
    pub last_title: Option<String>,
}

/// Presenter that draws nothing but measures what it was given.
#[derive(Debug, Default, Clone)]
pub struct HeadlessPresenter {
    stats: Arc<Mutex<PresenterStats>>,
}

impl HeadlessPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the statistics, readable while the presenter is in use.
    #[must_use]
    pub fn stats(&self) -> Arc<Mutex<PresenterStats>> {
        Arc::clone(&self.stats)
    }
}

impl Presenter for HeadlessPresenter {
    fn draw(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        let particles = &frame.particles;
        let mut stats = self.stats.lock();
        stats.frames_drawn += 1;
        stats.last_frame_number = Some(frame.frame_number);
        stats.last_particle_count = particles.len();
        stats.last_bounds = physics::diagnostics::bounds(particles);
        stats.last_centroid = physics::diagnostics::centroid(particles);
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.stats.lock().frames_presented += 1;
        Ok(())
    }

    fn show_telemetry(&mut self, sample: &TelemetrySample) {
        self.stats.lock().last_title = Some(sample.title());
    }
}

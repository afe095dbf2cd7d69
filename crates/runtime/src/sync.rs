//! # Cross-Timeline Synchronizer
//!
//! Owns the compute and render timelines and the per-frame fence values that
//! keep them overlapped without data races:
//!
//! -   the render timeline waits, queue-side, for the compute value of the
//!     current step before running any render job for it;
//! -   the CPU waits for the render value recorded for a frame slot before it
//!     reuses that slot, which bounds how far it can run ahead;
//! -   before a particle buffer is written again, the CPU waits for the render
//!     value of the last frame that read it.

use std::time::Duration;

use crate::{RuntimeError, Timeline};

pub const MIN_FRAME_DEPTH: usize = 2;
pub const MAX_FRAME_DEPTH: usize = 3;

pub struct Synchronizer {
    compute: Timeline,
    render: Timeline,
    /// Render value that must complete before each slot is reused.
    frame_fences: Vec<u64>,
    frame_index: usize,
    /// Render value after which each particle buffer is no longer read.
    buffer_release: [u64; 2],
}

impl Synchronizer {
    /// Starts both timelines with `depth` per-frame slots.
    ///
    /// `depth` is clamped to `MIN_FRAME_DEPTH..=MAX_FRAME_DEPTH`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeline`] if a worker thread cannot start.
    pub fn new(depth: usize) -> Result<Self, RuntimeError> {
        let depth = depth.clamp(MIN_FRAME_DEPTH, MAX_FRAME_DEPTH);
        Ok(Self {
            compute: Timeline::spawn("compute")?,
            render: Timeline::spawn("render")?,
            frame_fences: vec![0; depth],
            frame_index: 0,
            buffer_release: [0; 2],
        })
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frame_fences.len()
    }

    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    #[must_use]
    pub fn compute(&self) -> &Timeline {
        &self.compute
    }

    #[must_use]
    pub fn render(&self) -> &Timeline {
        &self.render
    }

    /// Marks the step just finished as complete on the compute timeline.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the compute worker is gone.
    pub fn signal_compute(&mut self) -> Result<u64, RuntimeError> {
        self.compute.signal()
    }

    /// Enqueues a job on the compute timeline. Jobs run before any later
    /// compute signal completes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the compute worker is gone.
    pub fn submit_compute<F>(&self, job: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.compute.submit(job)
    }

    /// Makes the render queue wait for compute value `value`. The caller is
    /// not blocked.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the render worker is gone.
    pub fn render_waits_for_compute(&self, value: u64) -> Result<(), RuntimeError> {
        self.render.wait_for(self.compute.fence(), value)
    }

    /// Enqueues a job on the render timeline.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the render worker is gone.
    pub fn submit_render<F>(&self, job: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.render.submit(job)
    }

    /// Signals the render fence for the current slot, moves to the next slot
    /// and blocks until that slot's previous frame has completed.
    ///
    /// Returns the render value signalled for the frame just submitted.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the render worker is gone.
    pub fn advance_frame(&mut self) -> Result<u64, RuntimeError> {
        let value = self.render.signal()?;
        self.frame_fences[self.frame_index] = value;
        self.frame_index = (self.frame_index + 1) % self.depth();
        self.render.wait_until(self.frame_fences[self.frame_index]);
        Ok(value)
    }

    /// Records that `buffer` is read by render work up to `render_value`.
    pub fn note_buffer_read(&mut self, buffer: usize, render_value: u64) {
        self.buffer_release[buffer] = self.buffer_release[buffer].max(render_value);
    }

    /// Blocks until no render work still reads `buffer`.
    ///
    /// With two frame slots this never blocks: the slot wait in
    /// [`advance_frame`](Self::advance_frame) already covers the frame that
    /// last read the buffer.
    pub fn wait_for_buffer_release(&self, buffer: usize) {
        self.render.wait_until(self.buffer_release[buffer]);
    }

    /// Waits up to `timeout` until at most `depth - 1` submitted frames are
    /// still being presented. Returns `false` if the wait expired.
    pub fn wait_for_present(&self, timeout: Duration) -> bool {
        let target = self
            .render
            .last_signaled()
            .saturating_sub(self.depth() as u64 - 1);
        self.render.fence().wait_until_timeout(target, timeout)
    }

    /// Blocks until every submitted render job has run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the render worker is gone.
    pub fn wait_for_render_idle(&mut self) -> Result<(), RuntimeError> {
        self.render.wait_idle()
    }

    /// Surfaces a job failure on either timeline.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeline`] once any job has failed.
    pub fn check(&self) -> Result<(), RuntimeError> {
        self.compute.check()?;
        self.render.check()
    }
}

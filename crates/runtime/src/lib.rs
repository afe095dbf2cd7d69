#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
//! # Frame Runtime
//!
//! Runs the simulation and its presentation as two overlapped timelines.
//!
//! -   [`Fence`] is a monotonic completion counter with blocking waits.
//! -   [`Timeline`] is an in-order job queue on its own thread that owns a
//!     fence and can wait on another timeline's fence without blocking the
//!     submitter.
//! -   [`Synchronizer`] holds the compute and render timelines and the
//!     per-frame fence values.
//! -   [`FrameDriver`] is the per-frame state machine, including the backend
//!     switch and reset.
//!
//! Rendering is reached only through the [`Presenter`] trait;
//! [`HeadlessPresenter`] measures frames without a window.

pub mod camera;
pub mod clock;
pub mod driver;
pub mod error;
pub mod fence;
pub mod present;
pub mod selector;
pub mod sync;
pub mod telemetry;
pub mod timeline;

pub use camera::{Camera, CameraInput, CameraTransforms};
pub use clock::{Clock, ManualClock, StepTimer, SystemClock};
pub use driver::{FrameDriver, FrameReport, FrameState, PRESENT_WAIT};
pub use error::RuntimeError;
pub use fence::Fence;
pub use present::{HeadlessPresenter, Presenter, PresenterStats, RenderFrame};
pub use selector::BackendSelector;
pub use sync::Synchronizer;
pub use telemetry::{FrameStats, TelemetrySample};
pub use timeline::Timeline;

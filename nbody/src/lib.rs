//! # N-Body
//!
//! Real-time all-pairs gravity simulation with interchangeable compute
//! backends.
//!
//! ## Crates
//!
//! -   **[`compute`]:** the step kernels. A scalar and an eight-lane CPU
//!     kernel run on a dedicated thread pool; a WGSL compute shader runs
//!     through `wgpu` when the `gpu` feature is on.
//! -   **[`physics`]:** configuration, deterministic seeding, the
//!     double-buffered particle store and the [`physics::Simulation`] that
//!     ties them to the loaded backends.
//! -   **[`runtime`]:** compute and render timelines with monotonic fences,
//!     the cross-timeline synchronizer and the per-frame state machine.
//!
//! This crate wires them into a headless binary:
//!
//! ```text
//! nbody --particles 4096 --backend vector-cpu --frames 300 --cycle-every 100
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change the filter.

pub mod app;
pub mod cli;

pub use app::{run, RunSummary};
pub use cli::Cli;

pub use compute;
pub use physics;
pub use runtime;

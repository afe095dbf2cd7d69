#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
//! # N-Body Particle State
//!
//! Owns the particle population of the gravity simulation and the machinery
//! that advances it.
//!
//! ## Key Components
//!
//! -   **Configuration:** [`SimConfig`] describes the particle count, the
//!     seeded groups, the force-law parameters and the initial backend. It is
//!     validated once, before anything is allocated.
//! -   **Seeding:** the [`seeding`] module places each group's particles
//!     uniformly inside a sphere by rejection sampling. Seeding is fully
//!     deterministic for a given seed.
//! -   **Double buffer:** [`ParticleStore`] holds exactly two particle sets and
//!     a read index. One set is read by the step and by rendering; the other
//!     is written by the step. [`ParticleStore::flip`] swaps the roles.
//! -   **Simulation:** [`Simulation`] ties the store to the loaded backends
//!     and exposes `step`, `flip`, `select` and `reset`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use physics::{SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default())?;
//! for _ in 0..10 {
//!     sim.advance()?;
//! }
//! # Ok::<(), physics::PhysicsError>(())
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod seeding;
pub mod simulation;
pub mod store;

pub use config::{GroupConfig, SimConfig};
pub use error::{ConfigError, PhysicsError};
pub use simulation::Simulation;
pub use store::ParticleStore;

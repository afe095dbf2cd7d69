//! # Simulation Core
//!
//! Couples the double-buffered particle store with the set of backends that
//! can step it. All backends that initialise successfully are created once at
//! startup; switching between them is a reassignment of the active index
//! followed by a mandatory [`reset`](Simulation::reset).
//!
//! A device backend leaves its result on the device. After such a step the
//! host read set is stale until [`sync_host`](Simulation::sync_host) copies
//! the result back; [`is_host_current`](Simulation::is_host_current) tells
//! the two cases apart.

use std::sync::Arc;

use compute::{BackendKind, DeviceStep, Particle, SimulationBackend, StepOutcome};

use crate::{seeding::seed_particles, ParticleStore, PhysicsError, SimConfig};

pub struct Simulation {
    config: SimConfig,
    store: ParticleStore,
    backends: Vec<Box<dyn SimulationBackend>>,
    active: usize,
    /// Device result of the last step, not yet flipped.
    pending: Option<Arc<dyn DeviceStep>>,
    /// Device result that belongs in the current read set.
    device_read: Option<Arc<dyn DeviceStep>>,
}

impl Simulation {
    /// Validates `config`, seeds the particle store and loads every backend
    /// this build and host support.
    ///
    /// Backends other than the configured one that fail to initialise are
    /// logged and left out of the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] for an invalid configuration and
    /// [`PhysicsError::BackendNotLoaded`] if the configured backend is not
    /// available.
    pub fn new(config: SimConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        let threads = config.thread_count();

        let mut backends = Vec::new();
        for kind in BackendKind::ALL {
            match compute::create_backend(kind, threads, config.particle_count, config.kernel) {
                Ok(backend) => backends.push(backend),
                Err(e) => tracing::warn!(backend = %kind, error = %e, "backend not loaded"),
            }
        }

        Self::with_backends(config, backends)
    }

    /// Like [`new`](Self::new), but with an explicit set of backends.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] for an invalid configuration and
    /// [`PhysicsError::BackendNotLoaded`] if no backend of the configured
    /// kind is in `backends`.
    pub fn with_backends(
        config: SimConfig,
        backends: Vec<Box<dyn SimulationBackend>>,
    ) -> Result<Self, PhysicsError> {
        config.validate()?;
        let active = backends
            .iter()
            .position(|b| b.kind() == config.backend)
            .ok_or(PhysicsError::BackendNotLoaded(config.backend))?;

        let store = ParticleStore::new(seed_particles(&config));
        let mut sim = Self {
            config,
            store,
            backends,
            active,
            pending: None,
            device_read: None,
        };
        sim.backends[active].reset(sim.store.initial())?;

        tracing::info!(
            backend = %sim.backend_kind(),
            threads = ?sim.threads(),
            particles = sim.store.len(),
            available = ?sim.available(),
            "simulation ready"
        );
        Ok(sim)
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backends[self.active].kind()
    }

    /// Worker threads of the active backend, if it is a CPU backend.
    #[must_use]
    pub fn threads(&self) -> Option<usize> {
        self.backends[self.active].threads()
    }

    /// Loaded backends in cycling order.
    #[must_use]
    pub fn available(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }

    #[must_use]
    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.backends.iter().any(|b| b.kind() == kind)
    }

    /// Makes `kind` the active backend. The caller must [`reset`](Self::reset)
    /// before the next step.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::BackendNotLoaded`] if `kind` is unavailable.
    pub fn select(&mut self, kind: BackendKind) -> Result<(), PhysicsError> {
        self.active = self
            .backends
            .iter()
            .position(|b| b.kind() == kind)
            .ok_or(PhysicsError::BackendNotLoaded(kind))?;
        Ok(())
    }

    /// Restores the seed layout into both sets and the active backend.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::WriteSetInUse`] if a reader still holds either
    /// set, or the backend's error if it cannot reload the seed.
    pub fn reset(&mut self) -> Result<(), PhysicsError> {
        self.store.reset()?;
        self.pending = None;
        self.device_read = None;
        self.backends[self.active].reset(self.store.initial())?;
        tracing::info!(backend = %self.backend_kind(), "particles reset");
        Ok(())
    }

    /// Computes the next state into the write set, or submits it to the
    /// device. Does not flip.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::WriteSetInUse`] if a reader still holds the
    /// write set, or the backend's error.
    pub fn step(&mut self) -> Result<StepOutcome, PhysicsError> {
        let buffers = self.store.split()?;
        let outcome = self.backends[self.active].step(buffers)?;
        self.pending = outcome.device().cloned();
        Ok(outcome)
    }

    /// Publishes the last step's result as the read set.
    pub fn flip(&mut self) {
        self.store.flip();
        self.device_read = self.pending.take();
    }

    /// `false` while the read set's contents are still on the device.
    #[must_use]
    pub fn is_host_current(&self) -> bool {
        self.device_read.is_none()
    }

    /// Copies a device result into the host read set. Waits for the device
    /// if the step has not finished. Does nothing if the host is current.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::ReadSetInUse`] if a reader still holds the read
    /// set and the backend's error if the readback fails. The device result
    /// is kept on error.
    pub fn sync_host(&mut self) -> Result<(), PhysicsError> {
        let Some(device) = self.device_read.take() else {
            return Ok(());
        };
        let result = self.copy_to_read_set(device.as_ref());
        if result.is_err() {
            self.device_read = Some(device);
        }
        result
    }

    fn copy_to_read_set(&mut self, device: &dyn DeviceStep) -> Result<(), PhysicsError> {
        let read = self.store.read_mut()?;
        let particles = device.read()?;
        if particles.len() != read.len() {
            return Err(PhysicsError::ShapeMismatch {
                expected: read.len(),
                actual: particles.len(),
            });
        }
        read.copy_from_slice(&particles);
        Ok(())
    }

    /// [`step`](Self::step) followed by [`flip`](Self::flip), with the host
    /// read set brought up to date afterwards.
    ///
    /// # Errors
    ///
    /// See [`step`](Self::step) and [`sync_host`](Self::sync_host).
    pub fn advance(&mut self) -> Result<(), PhysicsError> {
        self.step()?;
        self.flip();
        self.sync_host()
    }

    #[must_use]
    pub fn read(&self) -> &[Particle] {
        self.store.read()
    }

    #[must_use]
    pub fn read_shared(&self) -> Arc<[Particle]> {
        self.store.read_shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::{ComputeError, CpuBackend, KernelParams, StepBuffers};

    fn small() -> SimConfig {
        SimConfig {
            particle_count: 64,
            threads: Some(2),
            ..SimConfig::default()
        }
    }

    fn cpu_only() -> Vec<Box<dyn SimulationBackend>> {
        vec![
            Box::new(CpuBackend::scalar(2, KernelParams::default()).unwrap()),
            Box::new(CpuBackend::vector(2, KernelParams::default()).unwrap()),
        ]
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig { particle_count: 12, ..small() };
        assert!(matches!(
            Simulation::with_backends(config, cpu_only()),
            Err(PhysicsError::Config(_))
        ));
    }

    #[test]
    fn missing_initial_backend_is_a_startup_error() {
        let config = SimConfig { backend: BackendKind::Gpu, ..small() };
        assert!(matches!(
            Simulation::with_backends(config, cpu_only()),
            Err(PhysicsError::BackendNotLoaded(BackendKind::Gpu))
        ));
    }

    #[test]
    fn advance_flips_and_moves_particles() {
        let mut sim = Simulation::with_backends(small(), cpu_only()).unwrap();
        let before = sim.read().to_vec();
        sim.advance().unwrap();
        assert_eq!(sim.store().read_index(), 1);
        assert_ne!(sim.read(), &before[..]);
    }

    #[test]
    fn step_without_flip_keeps_read_set() {
        let mut sim = Simulation::with_backends(small(), cpu_only()).unwrap();
        let before = sim.read().to_vec();
        assert!(sim.step().unwrap().is_host());
        assert_eq!(sim.read(), &before[..]);
        assert!(sim.is_host_current());
    }

    #[test]
    fn select_and_reset_restore_seed() {
        let mut sim = Simulation::with_backends(small(), cpu_only()).unwrap();
        let seed = sim.read().to_vec();
        sim.advance().unwrap();
        sim.advance().unwrap();
        sim.advance().unwrap();

        sim.select(BackendKind::ScalarCpu).unwrap();
        sim.reset().unwrap();
        assert_eq!(sim.backend_kind(), BackendKind::ScalarCpu);
        assert_eq!(sim.read(), &seed[..]);
        assert_eq!(sim.store().read_index(), 0);

        assert!(matches!(
            sim.select(BackendKind::Gpu),
            Err(PhysicsError::BackendNotLoaded(BackendKind::Gpu))
        ));
        assert_eq!(sim.available(), vec![BackendKind::ScalarCpu, BackendKind::VectorCpu]);
    }

    #[test]
    fn held_read_view_blocks_step_after_flip() {
        let mut sim = Simulation::with_backends(small(), cpu_only()).unwrap();
        let view = sim.read_shared();
        sim.advance().unwrap();
        assert!(matches!(sim.step(), Err(PhysicsError::WriteSetInUse)));
        drop(view);
        sim.step().unwrap();
    }

    /// Keeps its own state and hands results out through a device handle,
    /// shifting every particle by one unit per step.
    struct ShiftingDevice {
        state: Vec<Particle>,
    }

    struct Finished(Vec<Particle>);

    impl DeviceStep for Finished {
        fn wait(&self) -> Result<(), ComputeError> {
            Ok(())
        }

        fn read(&self) -> Result<Vec<Particle>, ComputeError> {
            Ok(self.0.clone())
        }
    }

    impl SimulationBackend for ShiftingDevice {
        fn kind(&self) -> BackendKind {
            BackendKind::Gpu
        }

        fn reset(&mut self, seed: &[Particle]) -> Result<(), ComputeError> {
            self.state = seed.to_vec();
            Ok(())
        }

        fn step(&mut self, buffers: StepBuffers<'_>) -> Result<StepOutcome, ComputeError> {
            buffers.check()?;
            for p in &mut self.state {
                p.position[0] += 1.0;
            }
            Ok(StepOutcome::Device(Arc::new(Finished(self.state.clone()))))
        }
    }

    fn device_sim() -> Simulation {
        let config = SimConfig { backend: BackendKind::Gpu, ..small() };
        let backends: Vec<Box<dyn SimulationBackend>> =
            vec![Box::new(ShiftingDevice { state: Vec::new() })];
        Simulation::with_backends(config, backends).unwrap()
    }

    #[test]
    fn device_result_reaches_host_only_on_sync() {
        let mut sim = device_sim();
        let seed = sim.read().to_vec();

        assert!(sim.step().unwrap().device().is_some());
        assert!(sim.is_host_current());
        sim.flip();
        assert!(!sim.is_host_current());
        // The host set was never written by the device step.
        assert_eq!(sim.read(), &seed[..]);

        sim.sync_host().unwrap();
        assert!(sim.is_host_current());
        for (now, then) in sim.read().iter().zip(&seed) {
            assert_eq!(now.position[0], then.position[0] + 1.0);
        }
    }

    #[test]
    fn advance_syncs_device_results() {
        let mut sim = device_sim();
        let seed = sim.read().to_vec();
        sim.advance().unwrap();
        sim.advance().unwrap();
        assert!(sim.is_host_current());
        assert_eq!(sim.read()[5].position[0], seed[5].position[0] + 2.0);
    }

    #[test]
    fn held_read_set_keeps_device_result_pending() {
        let mut sim = device_sim();
        sim.step().unwrap();
        sim.flip();

        let view = sim.read_shared();
        assert!(matches!(sim.sync_host(), Err(PhysicsError::ReadSetInUse)));
        assert!(!sim.is_host_current());
        drop(view);
        sim.sync_host().unwrap();
        assert!(sim.is_host_current());
    }

    #[test]
    fn reset_drops_device_result() {
        let mut sim = device_sim();
        let seed = sim.read().to_vec();
        sim.step().unwrap();
        sim.flip();
        sim.reset().unwrap();
        assert!(sim.is_host_current());
        sim.sync_host().unwrap();
        assert_eq!(sim.read(), &seed[..]);
    }
}

use std::sync::Arc;
use std::time::Duration;

use compute::{
    BackendKind, ComputeError, CpuBackend, DeviceStep, KernelParams, Particle,
    SimulationBackend, StepBuffers, StepOutcome,
};
use parking_lot::Mutex;
use physics::{PhysicsError, SimConfig, Simulation};
use runtime::{
    Fence, FrameDriver, FrameState, HeadlessPresenter, ManualClock, Presenter, RenderFrame,
    RuntimeError,
};

fn config(backend: BackendKind) -> SimConfig {
    SimConfig {
        particle_count: 128,
        threads: Some(2),
        backend,
        ..SimConfig::default()
    }
}

fn cpu_backends() -> Vec<Box<dyn SimulationBackend>> {
    let params = KernelParams::default();
    vec![
        Box::new(CpuBackend::scalar(2, params).unwrap()),
        Box::new(CpuBackend::vector(2, params).unwrap()),
    ]
}

fn driver_with(
    config: SimConfig,
    backends: Vec<Box<dyn SimulationBackend>>,
    presenter: Box<dyn Presenter>,
    clock: ManualClock,
) -> FrameDriver {
    let sim = Simulation::with_backends(config, backends).unwrap();
    FrameDriver::new(sim, presenter, Box::new(clock)).unwrap()
}

#[test]
fn frames_advance_both_timelines() {
    let presenter = HeadlessPresenter::new();
    let stats = presenter.stats();
    let clock = ManualClock::new();
    let mut driver = driver_with(
        config(BackendKind::VectorCpu),
        cpu_backends(),
        Box::new(presenter),
        clock.clone(),
    );

    for i in 0..10u64 {
        clock.advance(Duration::from_millis(16));
        let report = driver.run_frame().unwrap();
        assert_eq!(report.frame_number, i);
        assert_eq!(report.compute_fence, i + 1);
        assert_eq!(report.render_fence, i + 1);
        assert!(!report.reset);
        assert_eq!(driver.state(), FrameState::Idle);
        // Never more than one frame in flight beyond the current slot.
        assert!(driver.synchronizer().render().fence().completed() + 1 >= report.render_fence);
    }
    driver.finish().unwrap();

    let stats = stats.lock();
    assert_eq!(stats.frames_drawn, 10);
    assert_eq!(stats.frames_presented, 10);
    assert_eq!(stats.last_frame_number, Some(9));
    assert_eq!(stats.last_particle_count, 128);
}

#[test]
fn backend_cycle_resets_particles() {
    let clock = ManualClock::new();
    let mut driver = driver_with(
        config(BackendKind::VectorCpu),
        cpu_backends(),
        Box::new(HeadlessPresenter::new()),
        clock.clone(),
    );
    let seed = driver.simulation().store().initial().to_vec();

    for _ in 0..3 {
        clock.advance(Duration::from_millis(16));
        driver.run_frame().unwrap();
    }
    assert_ne!(driver.simulation().read(), &seed[..]);

    // Only the two CPU backends are loaded, so the cycle skips the GPU.
    assert_eq!(driver.request_backend_cycle(), BackendKind::ScalarCpu);
    let report = driver.run_frame().unwrap();
    assert!(report.reset);
    assert_eq!(report.backend, BackendKind::ScalarCpu);
    assert_eq!(driver.simulation().read(), &seed[..]);

    let report = driver.run_frame().unwrap();
    assert!(!report.reset);
    assert_ne!(driver.simulation().read(), &seed[..]);

    assert_eq!(driver.request_backend_cycle(), BackendKind::VectorCpu);
    assert!(driver.run_frame().unwrap().reset);
    assert_eq!(driver.simulation().backend_kind(), BackendKind::VectorCpu);
    driver.finish().unwrap();
}

#[test]
fn telemetry_reaches_the_presenter() {
    let presenter = HeadlessPresenter::new();
    let stats = presenter.stats();
    let clock = ManualClock::new();
    let mut driver = driver_with(
        config(BackendKind::VectorCpu),
        cpu_backends(),
        Box::new(presenter),
        clock.clone(),
    );

    for _ in 0..8 {
        clock.advance(Duration::from_millis(250));
        driver.run_frame().unwrap();
    }
    driver.finish().unwrap();

    let title = stats.lock().last_title.clone().unwrap();
    assert!(title.starts_with("(CPU Vector Kernel, 2 threads) : "), "{title}");
    assert!(title.contains("250.000 ms, 4.0 fps."), "{title}");
}

#[test]
fn deeper_pipeline_runs_ahead_safely() {
    let presenter = HeadlessPresenter::new();
    let stats = presenter.stats();
    let mut driver = driver_with(
        SimConfig { frame_depth: 3, ..config(BackendKind::ScalarCpu) },
        cpu_backends(),
        Box::new(presenter),
        ManualClock::new(),
    );
    assert_eq!(driver.synchronizer().depth(), 3);
    for _ in 0..12 {
        driver.run_frame().unwrap();
    }
    driver.finish().unwrap();
    assert_eq!(stats.lock().frames_presented, 12);
}

struct FailingPresenter {
    fail_at: u64,
}

impl Presenter for FailingPresenter {
    fn draw(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        if frame.frame_number == self.fail_at {
            anyhow::bail!("device removed while drawing frame {}", frame.frame_number);
        }
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn render_failure_is_fatal() {
    let mut driver = driver_with(
        config(BackendKind::VectorCpu),
        cpu_backends(),
        Box::new(FailingPresenter { fail_at: 2 }),
        ManualClock::new(),
    );

    let mut failure = None;
    for _ in 0..10 {
        if let Err(e) = driver.run_frame() {
            failure = Some(e);
            break;
        }
    }
    match failure {
        Some(RuntimeError::Timeline { name, message }) => {
            assert_eq!(name, "render");
            assert!(message.contains("device removed"), "{message}");
        }
        other => panic!("expected a render timeline failure, got {other:?}"),
    }
    assert!(driver.frame_number() <= 5);
}

struct BrokenBackend;

impl SimulationBackend for BrokenBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn step(&mut self, _buffers: StepBuffers<'_>) -> Result<StepOutcome, ComputeError> {
        Err(ComputeError::Device("lost".into()))
    }
}

#[test]
fn step_failure_is_fatal() {
    let mut backends = cpu_backends();
    backends.push(Box::new(BrokenBackend));
    let mut driver = driver_with(
        config(BackendKind::Gpu),
        backends,
        Box::new(HeadlessPresenter::new()),
        ManualClock::new(),
    );

    let err = driver.run_frame().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Physics(PhysicsError::Backend(ComputeError::Device(_)))
    ));
    assert_eq!(driver.state(), FrameState::Simulating);
}

struct HoldingPresenter {
    held: Arc<Mutex<Vec<Arc<[Particle]>>>>,
}

impl Presenter for HoldingPresenter {
    fn draw(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        self.held.lock().push(Arc::clone(&frame.particles));
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn retained_read_view_is_reported_not_overwritten() {
    let held = Arc::new(Mutex::new(Vec::new()));
    let mut driver = driver_with(
        config(BackendKind::ScalarCpu),
        cpu_backends(),
        Box::new(HoldingPresenter { held: Arc::clone(&held) }),
        ManualClock::new(),
    );

    // Frame 0 reads set 1 and frame 1 reads set 0; frame 2 would write set 1.
    driver.run_frame().unwrap();
    driver.run_frame().unwrap();
    let err = driver.run_frame().unwrap_err();
    assert!(matches!(err, RuntimeError::Physics(PhysicsError::WriteSetInUse)));
    assert!(!held.lock().is_empty());
}

/// Device step that cannot finish until `gate` is signalled.
struct GatedStep {
    gate: Arc<Fence>,
    result: Vec<Particle>,
}

impl DeviceStep for GatedStep {
    fn wait(&self) -> Result<(), ComputeError> {
        self.gate.wait_until(1);
        Ok(())
    }

    fn read(&self) -> Result<Vec<Particle>, ComputeError> {
        self.wait()?;
        Ok(self.result.clone())
    }
}

/// Keeps particles in its own memory and moves them one unit along x per
/// step, like a device backend that never touches the host sets.
struct GatedBackend {
    gate: Arc<Fence>,
    state: Vec<Particle>,
}

impl SimulationBackend for GatedBackend {
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
        Ok(StepOutcome::Device(Arc::new(GatedStep {
            gate: Arc::clone(&self.gate),
            result: self.state.clone(),
        })))
    }
}

struct FirstParticlePresenter {
    xs: Arc<Mutex<Vec<f32>>>,
}

impl Presenter for FirstParticlePresenter {
    fn draw(&mut self, frame: &RenderFrame) -> anyhow::Result<()> {
        self.xs.lock().push(frame.particles[0].position[0]);
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn device_step_does_not_block_the_frame() {
    let gate = Arc::new(Fence::new("gate"));
    let xs = Arc::new(Mutex::new(Vec::new()));
    let mut backends = cpu_backends();
    backends.push(Box::new(GatedBackend { gate: Arc::clone(&gate), state: Vec::new() }));
    let mut driver = driver_with(
        config(BackendKind::Gpu),
        backends,
        Box::new(FirstParticlePresenter { xs: Arc::clone(&xs) }),
        ManualClock::new(),
    );
    let seed = driver.simulation().read()[0].position[0];

    // The device has not finished, yet the frame is fully submitted.
    let report = driver.run_frame().unwrap();
    assert_eq!(report.compute_fence, 1);
    assert_eq!(driver.state(), FrameState::Idle);
    std::thread::sleep(Duration::from_millis(20));
    assert!(!driver.synchronizer().compute().fence().is_complete(1));
    assert!(xs.lock().is_empty());
    assert!(!driver.simulation().is_host_current());

    gate.signal(1);
    driver.run_frame().unwrap();
    driver.run_frame().unwrap();

    // The host sets still hold the seed; frames showed the device data.
    assert_eq!(driver.simulation().read()[0].position[0], seed);
    driver.sync_host().unwrap();
    assert!(driver.simulation().is_host_current());

    let mut expected = Vec::new();
    let mut x = seed;
    for _ in 0..3 {
        x += 1.0;
        expected.push(x);
    }
    assert_eq!(driver.simulation().read()[0].position[0], x);
    driver.finish().unwrap();
    assert_eq!(*xs.lock(), expected);
}

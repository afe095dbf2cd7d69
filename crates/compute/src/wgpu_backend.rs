//! GPU implementation of [`SimulationBackend`] built on [`wgpu`].
//!
//! The backend owns a device-side copy of both halves of the double buffer and
//! a bind group for each direction. One step is a single dispatch of
//! `nbody.wgsl` from the read buffer into the write buffer, followed by a copy
//! of the write buffer into a staging buffer owned by that step. The step is
//! submitted and returned as a [`WgpuStep`] without waiting; the caller waits
//! for it and maps the staging buffer on whichever thread needs the result.
//!
//! Initialization fails with [`ComputeError::BackendUnavailable`] if no
//! compatible adapter is found.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::resource_state::{plan_step, BufferState, BufferStates, StepCommand};
use crate::{
    BackendKind, ComputeError, DeviceStep, KernelParams, Particle, SimulationBackend,
    StepBuffers, StepOutcome,
};

const SHADER_SOURCE: &str = include_str!("../../../shaders/nbody.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuParams {
    dt: f32,
    softening_squared: f32,
    gravitational_constant: f32,
    particle_count: u32,
}

impl GpuParams {
    fn new(params: &KernelParams, particle_count: usize) -> Self {
        Self {
            dt: params.dt,
            softening_squared: params.softening_squared,
            gravitational_constant: params.gravitational_constant,
            particle_count: particle_count as u32,
        }
    }
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    particles: [wgpu::Buffer; 2],
    /// `bind_groups[i]` reads buffer `i` and writes buffer `1 - i`.
    bind_groups: [wgpu::BindGroup; 2],
    states: BufferStates,
    particle_count: usize,
}

impl WgpuBackend {
    /// Opens the default high-performance adapter, or a software fallback
    /// adapter if there is none, and allocates device buffers for
    /// `particle_count` particles.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::BackendUnavailable`] if no adapter is found and
    /// [`ComputeError::Device`] if the device cannot be created.
    pub fn new(particle_count: usize, params: KernelParams) -> Result<Self, ComputeError> {
        let instance = wgpu::Instance::default();
        let request = |force_fallback_adapter| {
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter,
                compatible_surface: None,
            }))
        };
        let adapter = request(false)
            .or_else(|| request(true))
            .ok_or(ComputeError::BackendUnavailable(BackendKind::Gpu))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("nbody device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|e| ComputeError::Device(e.to_string()))?;

        tracing::info!(adapter = ?adapter.get_info().name, particle_count, "gpu backend ready");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("nbody.wgsl"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let zeroed = vec![Particle::default(); particle_count];
        let particles = [0, 1].map(|i| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("particles {i}")),
                contents: bytemuck::cast_slice(&zeroed),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            })
        });

        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("nbody params"),
            contents: bytemuck::bytes_of(&GpuParams::new(&params, particle_count)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nbody layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_groups = [0usize, 1].map(|read| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("nbody read {read}")),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: particles[read].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: particles[1 - read].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("nbody pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("nbody pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        Ok(Self {
            device: Arc::new(device),
            queue,
            pipeline,
            particles,
            bind_groups,
            states: BufferStates::new(),
            particle_count,
        })
    }

    #[must_use]
    pub fn buffer_state(&self, index: usize) -> BufferState {
        self.states.get(index)
    }

    fn check_count(&self, len: usize) -> Result<(), ComputeError> {
        if len == self.particle_count {
            Ok(())
        } else {
            Err(ComputeError::ShapeMismatch(
                "particle count differs from the device buffers",
            ))
        }
    }
}

fn buffer_size(particle_count: usize) -> u64 {
    (particle_count * std::mem::size_of::<Particle>()) as u64
}

impl SimulationBackend for WgpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn reset(&mut self, seed: &[Particle]) -> Result<(), ComputeError> {
        self.check_count(seed.len())?;
        for buffer in &self.particles {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(seed));
        }
        self.queue.submit(None);
        self.states = BufferStates::new();
        Ok(())
    }

    fn step(&mut self, buffers: StepBuffers<'_>) -> Result<StepOutcome, ComputeError> {
        buffers.check()?;
        self.check_count(buffers.read.len())?;
        let commands = plan_step(&mut self.states, buffers.read_index, self.particle_count)?;

        let size = buffer_size(self.particle_count);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("nbody step") });
        for command in commands {
            match command {
                // wgpu inserts the barrier from the binding usage of each pass.
                StepCommand::Transition { .. } => {}
                StepCommand::Dispatch { read, workgroups, .. } => {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("nbody"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, &self.bind_groups[read], &[]);
                    pass.dispatch_workgroups(workgroups, 1, 1);
                }
                StepCommand::CopyOut { index } => {
                    encoder.copy_buffer_to_buffer(&self.particles[index], 0, &staging, 0, size);
                }
            }
        }
        let submission = self.queue.submit(Some(encoder.finish()));

        Ok(StepOutcome::Device(Arc::new(WgpuStep {
            device: Arc::clone(&self.device),
            staging: Mutex::new(staging),
            submission,
            particle_count: self.particle_count,
        })))
    }
}

/// One submitted device step and the staging buffer holding its result.
pub struct WgpuStep {
    device: Arc<wgpu::Device>,
    /// Locked for the whole map, copy and unmap sequence.
    staging: Mutex<wgpu::Buffer>,
    submission: wgpu::SubmissionIndex,
    particle_count: usize,
}

impl DeviceStep for WgpuStep {
    fn wait(&self) -> Result<(), ComputeError> {
        self.device.poll(wgpu::Maintain::wait_for(self.submission.clone()));
        Ok(())
    }

    fn read(&self) -> Result<Vec<Particle>, ComputeError> {
        let staging = self.staging.lock();
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::wait_for(self.submission.clone()));
        let mapped = match rx.try_recv() {
            Ok(result) => result,
            Err(_) => {
                self.device.poll(wgpu::Maintain::Wait);
                rx.recv().map_err(|e| ComputeError::Device(e.to_string()))?
            }
        };
        mapped.map_err(|e| ComputeError::Device(e.to_string()))?;

        let particles = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, Particle>(&data).to_vec()
        };
        staging.unmap();
        if particles.len() == self.particle_count {
            Ok(particles)
        } else {
            Err(ComputeError::ShapeMismatch("staging buffer size differs from the step"))
        }
    }
}

use crate::kernels::{scalar_op, vector_op, vector_op::PositionLanes};
use crate::{
    layout::partition, BackendKind, ComputeError, KernelParams, SimulationBackend, StepBuffers,
    StepOutcome,
};

/// Worker count to use when the caller passes `hint`.
///
/// A non-zero hint is taken as is. Otherwise the host's available parallelism
/// is used, falling back to 4 if it cannot be queried.
#[must_use]
pub fn hardware_threads(hint: usize) -> usize {
    if hint > 0 {
        return hint;
    }
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Scalar,
    Vector,
}

/// Multi-threaded CPU backend.
///
/// Each step splits the write set into one contiguous range per worker and
/// runs the kernel for all ranges concurrently on a private rayon pool. The
/// call returns once every range is done.
pub struct CpuBackend {
    variant: Variant,
    threads: usize,
    params: KernelParams,
    pool: rayon::ThreadPool,
    lanes: PositionLanes,
}

impl CpuBackend {
    /// Scalar kernel on `threads` workers (0 means one per hardware thread).
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ThreadPool`] if the workers cannot be spawned.
    pub fn scalar(threads: usize, params: KernelParams) -> Result<Self, ComputeError> {
        Self::with_variant(Variant::Scalar, threads, params)
    }

    /// Eight-wide vector kernel on `threads` workers (0 means one per
    /// hardware thread).
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ThreadPool`] if the workers cannot be spawned.
    pub fn vector(threads: usize, params: KernelParams) -> Result<Self, ComputeError> {
        Self::with_variant(Variant::Vector, threads, params)
    }

    fn with_variant(
        variant: Variant,
        threads: usize,
        params: KernelParams,
    ) -> Result<Self, ComputeError> {
        let threads = hardware_threads(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("nbody-cpu-{i}"))
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        tracing::debug!(?variant, threads, "cpu backend ready");
        Ok(Self {
            variant,
            threads,
            params,
            pool,
            lanes: PositionLanes::default(),
        })
    }

    #[must_use]
    pub fn params(&self) -> &KernelParams {
        &self.params
    }
}

impl SimulationBackend for CpuBackend {
    fn kind(&self) -> BackendKind {
        match self.variant {
            Variant::Scalar => BackendKind::ScalarCpu,
            Variant::Vector => BackendKind::VectorCpu,
        }
    }

    fn threads(&self) -> Option<usize> {
        Some(self.threads)
    }

    fn step(&mut self, buffers: StepBuffers<'_>) -> Result<StepOutcome, ComputeError> {
        buffers.check()?;
        let StepBuffers { read, write, .. } = buffers;

        if self.variant == Variant::Vector {
            self.lanes.load(read);
        }

        let variant = self.variant;
        let params = &self.params;
        let lanes = &self.lanes;
        let ranges = partition(read.len(), self.threads);

        self.pool.scope(|s| {
            let mut rest = write;
            for range in ranges {
                let (out, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                let start = range.start;
                s.spawn(move |_| match variant {
                    Variant::Scalar => scalar_op::process_particles(read, out, start, params),
                    Variant::Vector => {
                        vector_op::process_particles(lanes, read, out, start, params);
                    }
                });
            }
        });

        Ok(StepOutcome::Host)
    }
}

use super::{assert_range, fast_rsqrt, integrate};
use crate::{layout::BLOCK_SIZE, KernelParams, Particle};

/// Lane width of the inner accumulation loop.
pub const LANES: usize = BLOCK_SIZE;

/// Structure-of-arrays copy of the read-set positions.
///
/// Built once per step and shared read-only by every worker so the inner loop
/// streams contiguous `f32` lanes instead of strided particle records.
#[derive(Debug, Default, Clone)]
pub struct PositionLanes {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    w: Vec<f32>,
}

impl PositionLanes {
    /// Refills the lanes from `read`, reusing the existing allocations.
    ///
    /// # Panics
    ///
    /// Panics if `read.len()` is not a multiple of [`LANES`].
    pub fn load(&mut self, read: &[Particle]) {
        assert!(
            read.len() % LANES == 0,
            "particle count {} is not a multiple of {LANES}",
            read.len()
        );
        for lane in [&mut self.x, &mut self.y, &mut self.z, &mut self.w] {
            lane.clear();
            lane.reserve(read.len());
        }
        for p in read {
            self.x.push(p.position[0]);
            self.y.push(p.position[1]);
            self.z.push(p.position[2]);
            self.w.push(p.position[3]);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[inline]
fn accumulate_block(
    acc: &mut [[f32; LANES]; 3],
    this: [f32; 4],
    xs: &[f32],
    ys: &[f32],
    zs: &[f32],
    ws: &[f32],
    params: &KernelParams,
) {
    for lane in 0..LANES {
        let rx = xs[lane] - this[0];
        let ry = ys[lane] - this[1];
        let rz = zs[lane] - this[2];

        let dist_sqr = (rx * rx) + (ry * ry) + (rz * rz) + params.softening_squared;

        let inv_dist = fast_rsqrt(dist_sqr);
        let inv_dist_cube = inv_dist * inv_dist * inv_dist;

        let s = params.gravitational_constant * ws[lane] * inv_dist_cube;

        acc[0][lane] += rx * s;
        acc[1][lane] += ry * s;
        acc[2][lane] += rz * s;
    }
}

/// Steps particles `start..start + write.len()` with eight-wide lane
/// accumulators over the read set.
///
/// `lanes` must have been loaded from `read`. Results match
/// [`scalar_op::process_particles`](super::scalar_op::process_particles) up to
/// summation order.
///
/// # Panics
///
/// Panics if the range does not fit inside `read` or `lanes` was loaded from
/// a set of a different length.
pub fn process_particles(
    lanes: &PositionLanes,
    read: &[Particle],
    write: &mut [Particle],
    start: usize,
    params: &KernelParams,
) {
    assert_range(read, write, start);
    assert_eq!(lanes.len(), read.len(), "position lanes are stale");

    for (offset, out) in write.iter_mut().enumerate() {
        let current = &read[start + offset];
        let this = current.position;

        let mut acc = [[0.0f32; LANES]; 3];
        for (((xs, ys), zs), ws) in lanes
            .x
            .chunks_exact(LANES)
            .zip(lanes.y.chunks_exact(LANES))
            .zip(lanes.z.chunks_exact(LANES))
            .zip(lanes.w.chunks_exact(LANES))
        {
            accumulate_block(&mut acc, this, xs, ys, zs, ws, params);
        }

        let accel = [
            acc[0].iter().sum::<f32>(),
            acc[1].iter().sum::<f32>(),
            acc[2].iter().sum::<f32>(),
        ];
        *out = integrate(current, accel, params);
    }
}

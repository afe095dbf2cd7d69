//! Force/integration kernels shared by the CPU backends.
//!
//! Each kernel computes one integration step for a contiguous range of
//! particles: the softened all-pairs acceleration is accumulated against the
//! whole read set, then velocity and position are advanced. Only the slice of
//! the write set that corresponds to the range is touched, so disjoint ranges
//! can run concurrently against a shared read set.

pub mod rsqrt_op;
pub use rsqrt_op::fast_rsqrt;
pub mod scalar_op;
pub mod vector_op;

use crate::{KernelParams, Particle};

/// Semi-implicit Euler update for one particle.
///
/// The velocity is advanced first with the acceleration computed from the
/// read-set positions, then the position is advanced with the new velocity.
/// `velocity.w` receives the acceleration magnitude.
#[inline]
pub(crate) fn integrate(current: &Particle, accel: [f32; 3], params: &KernelParams) -> Particle {
    let dt = params.dt;
    let mut vel = current.velocity;
    vel[0] += accel[0] * dt;
    vel[1] += accel[1] * dt;
    vel[2] += accel[2] * dt;
    vel[3] = 1.0 / fast_rsqrt(accel[0] * accel[0] + accel[1] * accel[1] + accel[2] * accel[2]);

    let mut pos = current.position;
    pos[0] += vel[0] * dt;
    pos[1] += vel[1] * dt;
    pos[2] += vel[2] * dt;

    Particle::new(pos, vel)
}

/// Panics unless `start..start + write.len()` lies inside the read set.
#[inline]
pub(crate) fn assert_range(read: &[Particle], write: &[Particle], start: usize) {
    assert!(
        start + write.len() <= read.len(),
        "kernel range {}..{} exceeds particle count {}",
        start,
        start + write.len(),
        read.len()
    );
}

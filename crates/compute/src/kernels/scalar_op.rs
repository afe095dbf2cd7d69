use super::{assert_range, fast_rsqrt, integrate};
use crate::{KernelParams, Particle};

#[inline]
fn body_body_interaction(
    accel: &mut [f32; 3],
    that_pos: [f32; 4],
    this_pos: [f32; 4],
    params: &KernelParams,
) {
    let r = [
        that_pos[0] - this_pos[0],
        that_pos[1] - this_pos[1],
        that_pos[2] - this_pos[2],
    ];

    let dist_sqr = (r[0] * r[0]) + (r[1] * r[1]) + (r[2] * r[2]) + params.softening_squared;

    let inv_dist = fast_rsqrt(dist_sqr);
    let inv_dist_cube = inv_dist * inv_dist * inv_dist;

    let s = params.gravitational_constant * that_pos[3] * inv_dist_cube;

    accel[0] += r[0] * s;
    accel[1] += r[1] * s;
    accel[2] += r[2] * s;
}

/// Steps particles `start..start + write.len()` one body at a time.
///
/// `write` is the slice of the write set for that range; `read` is the whole
/// read set.
///
/// # Panics
///
/// Panics if the range does not fit inside `read`.
pub fn process_particles(
    read: &[Particle],
    write: &mut [Particle],
    start: usize,
    params: &KernelParams,
) {
    assert_range(read, write, start);

    for (offset, out) in write.iter_mut().enumerate() {
        let current = &read[start + offset];
        let pos = current.position;

        let mut accel = [0.0f32; 3];
        for other in read {
            body_body_interaction(&mut accel, other.position, pos, params);
        }

        *out = integrate(current, accel, params);
    }
}

//! Deterministic placement of particle groups.
//!
//! Every group restarts the generator from the configured seed, so groups of
//! equal size share the same offset pattern around their own centre.

use compute::Particle;

use crate::{GroupConfig, SimConfig};

/// A uniformly quantised value in `[-1, 1)`.
pub fn random_percent(rng: &mut fastrand::Rng) -> f32 {
    let r = (rng.u32(..) % 10_000) as f32 - 5_000.0;
    r / 5_000.0
}

/// Fills `out` with particles uniformly placed inside the group's sphere.
///
/// Offsets are drawn from the cube `[-spread, spread]^3` and redrawn while
/// they fall outside the sphere.
pub fn seed_group(
    out: &mut [Particle],
    group: &GroupConfig,
    seed: u64,
    weight: f32,
    velocity_w: f32,
) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let spread = group.spread;
    let [vx, vy, vz] = group.velocity;

    for particle in out {
        let delta = loop {
            let candidate = [
                random_percent(&mut rng) * spread,
                random_percent(&mut rng) * spread,
                random_percent(&mut rng) * spread,
            ];
            if length_squared(candidate) <= spread * spread {
                break candidate;
            }
        };

        let c = group.center;
        *particle = Particle::new(
            [c[0] + delta[0], c[1] + delta[1], c[2] + delta[2], weight],
            [vx, vy, vz, velocity_w],
        );
    }
}

/// Seeds the full particle set for `config`, group after group.
#[must_use]
pub fn seed_particles(config: &SimConfig) -> Vec<Particle> {
    let mut particles = vec![Particle::default(); config.particle_count];
    let mut rest = particles.as_mut_slice();
    for (group, size) in config.groups.iter().zip(config.group_sizes()) {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(size);
        seed_group(head, group, config.seed, config.particle_weight, config.velocity_w);
        rest = tail;
    }
    particles
}

fn length_squared(v: [f32; 3]) -> f32 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

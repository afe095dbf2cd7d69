//! Whole-set measurements used by tests and debug logging.
//!
//! Sums are accumulated in `f64` so they stay meaningful for large sets.

use compute::Particle;

/// Sum of `weight * velocity` over all particles.
#[must_use]
pub fn total_momentum(particles: &[Particle]) -> [f64; 3] {
    let mut p = [0.0f64; 3];
    for particle in particles {
        let w = f64::from(particle.weight());
        for (k, axis) in p.iter_mut().enumerate() {
            *axis += w * f64::from(particle.velocity[k]);
        }
    }
    p
}

/// Sum of `weight * |velocity|`, the scale against which momentum drift is
/// judged.
#[must_use]
pub fn momentum_scale(particles: &[Particle]) -> f64 {
    particles
        .iter()
        .map(|p| {
            let v = p.velocity;
            f64::from(p.weight()) * f64::from(v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
        })
        .sum()
}

/// Unweighted mean position, or `None` for an empty set.
#[must_use]
pub fn centroid(particles: &[Particle]) -> Option<[f64; 3]> {
    if particles.is_empty() {
        return None;
    }
    let mut c = [0.0f64; 3];
    for p in particles {
        for (k, axis) in c.iter_mut().enumerate() {
            *axis += f64::from(p.position[k]);
        }
    }
    let n = particles.len() as f64;
    Some(c.map(|axis| axis / n))
}

/// Axis-aligned bounds of all positions, or `None` for an empty set.
#[must_use]
pub fn bounds(particles: &[Particle]) -> Option<([f32; 3], [f32; 3])> {
    let first = particles.first()?.xyz();
    Some(particles.iter().fold((first, first), |(mut lo, mut hi), p| {
        for (k, v) in p.xyz().into_iter().enumerate() {
            lo[k] = lo[k].min(v);
            hi[k] = hi[k].max(v);
        }
        (lo, hi)
    }))
}

/// Largest per-coordinate change in position between two snapshots of the
/// same set.
///
/// # Panics
///
/// Panics if the snapshots differ in length.
#[must_use]
pub fn max_displacement(before: &[Particle], after: &[Particle]) -> f32 {
    assert_eq!(before.len(), after.len(), "snapshots differ in length");
    before
        .iter()
        .zip(after)
        .flat_map(|(a, b)| (0..3).map(move |k| (b.position[k] - a.position[k]).abs()))
        .fold(0.0, f32::max)
}

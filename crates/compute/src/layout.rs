use std::ops::Range;

/// Particle counts must be a multiple of this; the vector kernel consumes
/// the read set in blocks of this many bodies.
pub const BLOCK_SIZE: usize = 8;

/// Invocations per workgroup in `nbody.wgsl`.
pub const WORKGROUP_SIZE: u32 = 128;

const _: () = assert!(WORKGROUP_SIZE as usize % BLOCK_SIZE == 0);

/// Splits `0..count` into at most `parts` contiguous ranges of equal length,
/// the last one possibly shorter.
///
/// Ranges never overlap and together cover every index exactly once. Fewer
/// than `parts` ranges come back when `count` is too small to give every part
/// at least one index.
#[must_use]
pub fn partition(count: usize, parts: usize) -> Vec<Range<usize>> {
    if count == 0 {
        return Vec::new();
    }
    let chunk = count.div_ceil(parts.max(1));
    (0..count)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(count))
        .collect()
}

/// Number of workgroups needed to give each particle one invocation.
#[must_use]
pub fn workgroup_count(particle_count: usize) -> u32 {
    (particle_count as u32).div_ceil(WORKGROUP_SIZE).max(1)
}

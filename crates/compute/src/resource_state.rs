//! Usage-state bookkeeping for the two device particle buffers and the
//! command order of one device step.
//!
//! [`plan_step`] is the device step with the device taken out: it checks and
//! updates the buffer states in recording order and returns the commands the
//! GPU backend encodes. `wgpu` derives the actual pipeline barriers from how
//! each buffer is bound, so a transition here does not emit a barrier of its
//! own. What it guards is the order: the write buffer is made writable before
//! the dispatch, made readable again after it, and only then copied out.

use crate::{layout::workgroup_count, ComputeError};

/// Usage state of one device particle buffer.
///
/// A buffer is `Readable` while it may be bound as the shader input or copied
/// out, and `Writable` only for the dispatch that fills it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Readable,
    Writable,
}

impl BufferState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Readable => "readable",
            Self::Writable => "writable",
        }
    }
}

/// Recorded state of both device particle buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStates([BufferState; 2]);

impl Default for BufferStates {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferStates {
    /// Both buffers readable, as after an upload.
    #[must_use]
    pub const fn new() -> Self {
        Self([BufferState::Readable; 2])
    }

    #[must_use]
    pub fn get(&self, index: usize) -> BufferState {
        self.0[index]
    }

    fn require(&self, index: usize, expected: BufferState) -> Result<(), ComputeError> {
        let actual = self.0[index];
        if actual == expected {
            Ok(())
        } else {
            Err(ComputeError::ResourceState {
                index,
                expected: expected.name(),
                actual: actual.name(),
            })
        }
    }

    /// Moves buffer `index` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ResourceState`] if the buffer is not in `from`.
    pub fn transition(
        &mut self,
        index: usize,
        from: BufferState,
        to: BufferState,
    ) -> Result<(), ComputeError> {
        self.require(index, from)?;
        self.0[index] = to;
        Ok(())
    }
}

/// One recorded command of a device step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    Transition {
        index: usize,
        from: BufferState,
        to: BufferState,
    },
    Dispatch {
        read: usize,
        write: usize,
        workgroups: u32,
    },
    /// Copy of the given buffer into the step's staging buffer.
    CopyOut { index: usize },
}

/// Records one step reading buffer `read_index` and returns its commands in
/// encoding order.
///
/// On error nothing has been recorded and `states` is unchanged.
///
/// # Errors
///
/// Returns [`ComputeError::ShapeMismatch`] for a read index other than 0 or 1
/// and [`ComputeError::ResourceState`] if either buffer is not readable.
pub fn plan_step(
    states: &mut BufferStates,
    read_index: usize,
    particle_count: usize,
) -> Result<[StepCommand; 4], ComputeError> {
    if read_index > 1 {
        return Err(ComputeError::ShapeMismatch("read index must be 0 or 1"));
    }
    let write_index = 1 - read_index;
    states.require(read_index, BufferState::Readable)?;

    let mut recorded = *states;
    recorded.transition(write_index, BufferState::Readable, BufferState::Writable)?;
    recorded.transition(write_index, BufferState::Writable, BufferState::Readable)?;
    *states = recorded;

    Ok([
        StepCommand::Transition {
            index: write_index,
            from: BufferState::Readable,
            to: BufferState::Writable,
        },
        StepCommand::Dispatch {
            read: read_index,
            write: write_index,
            workgroups: workgroup_count(particle_count),
        },
        StepCommand::Transition {
            index: write_index,
            from: BufferState::Writable,
            to: BufferState::Readable,
        },
        StepCommand::CopyOut { index: write_index },
    ])
}

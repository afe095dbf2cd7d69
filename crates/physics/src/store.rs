use std::sync::Arc;

use compute::{Particle, StepBuffers};

use crate::PhysicsError;

/// Two fixed particle arenas and the index of the one currently read.
///
/// The read set may be shared with any number of readers through
/// [`read_shared`](Self::read_shared). The write set is handed out mutably
/// only while nobody else holds a reference to it; the frame protocol makes
/// that true by waiting for the render timeline before the buffer is reused,
/// so no lock guards the arenas themselves.
pub struct ParticleStore {
    sets: [Arc<[Particle]>; 2],
    read_index: usize,
    initial: Arc<[Particle]>,
}

impl ParticleStore {
    /// Creates a store with both sets holding `seed` and set 0 as the read
    /// set.
    #[must_use]
    pub fn new(seed: Vec<Particle>) -> Self {
        let initial: Arc<[Particle]> = seed.into();
        Self {
            sets: [Arc::from(&*initial), Arc::from(&*initial)],
            read_index: 0,
            initial,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    #[must_use]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    #[must_use]
    pub fn write_index(&self) -> usize {
        1 - self.read_index
    }

    /// The current read set.
    #[must_use]
    pub fn read(&self) -> &[Particle] {
        &self.sets[self.read_index]
    }

    /// A shared handle to the current read set, for consumers on another
    /// timeline. Must be dropped before this set becomes the write set again.
    #[must_use]
    pub fn read_shared(&self) -> Arc<[Particle]> {
        Arc::clone(&self.sets[self.read_index])
    }

    /// The seed layout restored by [`reset`](Self::reset).
    #[must_use]
    pub fn initial(&self) -> &[Particle] {
        &self.initial
    }

    /// The current write set.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::WriteSetInUse`] if a reader still holds it.
    pub fn write(&mut self) -> Result<&mut [Particle], PhysicsError> {
        let index = self.write_index();
        Arc::get_mut(&mut self.sets[index]).ok_or(PhysicsError::WriteSetInUse)
    }

    /// The current read set, for replacing it with a result computed
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::ReadSetInUse`] if a reader still holds it.
    pub fn read_mut(&mut self) -> Result<&mut [Particle], PhysicsError> {
        Arc::get_mut(&mut self.sets[self.read_index]).ok_or(PhysicsError::ReadSetInUse)
    }

    /// Borrows the read set and the write set together for one step.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::WriteSetInUse`] if a reader still holds the
    /// write set.
    pub fn split(&mut self) -> Result<StepBuffers<'_>, PhysicsError> {
        let read_index = self.read_index;
        let [a, b] = &mut self.sets;
        let (read, write) = if read_index == 0 { (a, b) } else { (b, a) };
        let write = Arc::get_mut(write).ok_or(PhysicsError::WriteSetInUse)?;
        Ok(StepBuffers {
            read_index,
            read: &**read,
            write,
        })
    }

    /// Makes the write set the read set and vice versa.
    pub fn flip(&mut self) {
        self.read_index = 1 - self.read_index;
    }

    /// Restores the seed layout into both sets and makes set 0 the read set.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::WriteSetInUse`] if a reader still holds either
    /// set.
    pub fn reset(&mut self) -> Result<(), PhysicsError> {
        for set in &mut self.sets {
            Arc::get_mut(set)
                .ok_or(PhysicsError::WriteSetInUse)?
                .copy_from_slice(&self.initial);
        }
        self.read_index = 0;
        Ok(())
    }
}

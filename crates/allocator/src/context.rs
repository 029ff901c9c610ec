//! The process-wide permanent/temporary arena pair.

use crate::{Arena, ArenaConfig, config::MemoryConfig, error::ArenaError};

/// A permanent arena living until shutdown plus a temporary arena reset at
/// every frame boundary.
///
/// [`begin_frame`](Self::begin_frame) takes `&mut self`, so no borrow of the
/// temporary arena can outlive the frame it was made in.
///
/// ```
/// use allocator::{ArenaConfig, MemoryConfig, MemoryContext};
///
/// let config = MemoryConfig {
///     permanent: ArenaConfig::new(1 << 20),
///     temporary: ArenaConfig::new(1 << 20),
/// };
/// let mut memory = MemoryContext::create(&config).unwrap();
/// memory.temporary().allocate_value([0_u8; 128]).unwrap();
/// assert_eq!(memory.temporary().used(), 128);
///
/// memory.begin_frame();
/// assert_eq!(memory.temporary().used(), 0);
/// assert_eq!(memory.frame_index(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryContext {
    permanent: Arena,
    temporary: Arena,
    frame: u64,
}

impl MemoryContext {
    pub fn create(config: &MemoryConfig) -> Result<Self, ArenaError> {
        let permanent = Arena::create(&config.permanent)?;
        let temporary = Arena::create(&config.temporary)?;
        log::info!(
            "memory context: {} bytes permanent, {} bytes temporary",
            permanent.reserved(),
            temporary.reserved()
        );
        Ok(Self {
            permanent,
            temporary,
            frame: 0,
        })
    }

    /// Convenience constructor taking both reservation sizes.
    pub fn with_sizes(permanent: usize, temporary: usize) -> Result<Self, ArenaError> {
        Self::create(&MemoryConfig {
            permanent: ArenaConfig::new(permanent),
            temporary: ArenaConfig::new(temporary),
        })
    }

    #[must_use]
    pub fn permanent(&self) -> &Arena {
        &self.permanent
    }

    #[must_use]
    pub fn temporary(&self) -> &Arena {
        &self.temporary
    }

    /// Resets the temporary arena and advances the frame counter.
    pub fn begin_frame(&mut self) {
        self.split().1.begin_frame();
    }

    /// Number of completed frames.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Borrows the permanent arena and the per-frame half separately.
    ///
    /// Containers built on the returned `&Arena` may live across frame
    /// boundaries while [`Frames::begin_frame`] keeps resetting the
    /// temporary arena.
    ///
    /// ```
    /// use allocator::MemoryContext;
    ///
    /// let mut memory = MemoryContext::with_sizes(1 << 20, 1 << 20).unwrap();
    /// let (permanent, mut frames) = memory.split();
    /// let score = permanent.allocate_value(0_u32).unwrap();
    /// for _ in 0..3 {
    ///     frames.temporary().allocate_value([0_u8; 64]).unwrap();
    ///     *score += 1;
    ///     frames.begin_frame();
    /// }
    /// assert_eq!(*score, 3);
    /// ```
    pub fn split(&mut self) -> (&Arena, Frames<'_>) {
        let frames = Frames {
            temporary: &mut self.temporary,
            frame: &mut self.frame,
        };
        (&self.permanent, frames)
    }
}

/// The temporary arena and frame counter of a [`MemoryContext`].
#[derive(Debug)]
pub struct Frames<'a> {
    temporary: &'a mut Arena,
    frame: &'a mut u64,
}

impl Frames<'_> {
    /// The per-frame scratch arena. Everything allocated from it is
    /// discarded by the next [`begin_frame`](Self::begin_frame).
    #[must_use]
    pub fn temporary(&self) -> &Arena {
        self.temporary
    }

    /// Resets the temporary arena and advances the frame counter.
    pub fn begin_frame(&mut self) {
        log::trace!(
            "frame {} used {} temporary bytes",
            self.frame,
            self.temporary.used()
        );
        self.temporary.reset();
        *self.frame += 1;
    }

    #[must_use]
    pub fn frame_index(&self) -> u64 {
        *self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_keeps_permanent() {
        let mut memory = MemoryContext::with_sizes(1 << 16, 1 << 16).unwrap();
        let kept = memory.permanent().allocate_value(7_u32).unwrap();
        *kept += 1;
        memory.temporary().allocate_unaligned(100).unwrap();

        memory.begin_frame();
        assert_eq!(memory.permanent().used(), 4);
        assert_eq!(memory.temporary().used(), 0);
    }

    #[test]
    fn test_temporary_high_water_mark() {
        let mut memory = MemoryContext::with_sizes(1 << 16, 1 << 20).unwrap();
        for _ in 0..10 {
            memory.temporary().allocate_unaligned(200_000).unwrap();
            memory.begin_frame();
        }
        assert_eq!(memory.frame_index(), 10);
        let commits = memory.temporary().commit_count();
        memory.temporary().allocate_unaligned(200_000).unwrap();
        assert_eq!(memory.temporary().commit_count(), commits);
    }

    #[test]
    fn test_split_keeps_permanent_borrow_across_frames() {
        let mut memory = MemoryContext::with_sizes(1 << 16, 1 << 16).unwrap();
        let (permanent, mut frames) = memory.split();
        let kept = permanent.allocate_slice_copy(&[1_u8, 2, 3]).unwrap();
        frames.temporary().allocate_unaligned(10).unwrap();
        frames.begin_frame();
        assert_eq!(frames.frame_index(), 1);
        assert_eq!(frames.temporary().used(), 0);
        assert_eq!(kept, &[1, 2, 3]);
        assert_eq!(memory.frame_index(), 1);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            MemoryContext::with_sizes(0, 1),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }
}

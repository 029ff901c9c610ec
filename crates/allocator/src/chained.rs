//! Block-chained bump arena.
//!
//! For targets without a reserve/commit primitive. Memory is obtained from
//! the OS in discrete blocks; each block starts with a header holding the
//! address of the previously allocated block, so the blocks form a singly
//! linked list from the newest to the oldest.
//!
//! ```text
//!  current ──► ┌──────────┬───────────────┐
//!              │ prev ────┼─┐ allocations │
//!              └──────────┴─┼─────────────┘
//!                           ▼
//!              ┌──────────┬───────────────┐
//!              │ prev: ∅  │ allocations   │
//!              └──────────┴───────────────┘
//! ```
//!
//! [`ChainedArena::reset`] only rewinds the cursor inside the current
//! block. Earlier blocks stay allocated but unused until the arena is
//! dropped, which walks the chain and unmaps every block exactly once.

use core::{alloc::Layout, cell::Cell, fmt, ptr, ptr::NonNull};

use snafu::{OptionExt as _, ensure};

use crate::{
    config::ChainedArenaConfig,
    contract::{self, Allocator},
    error::{ArenaError, arena_error},
    os,
};

/// Header stored at offset 0 of every block.
#[repr(C)]
struct BlockHeader {
    prev: *mut Self,
    size: usize,
}

const HEADER_SIZE: usize = size_of::<BlockHeader>();
const NO_ALLOCATION: usize = usize::MAX;

/// Bump allocator growing by chaining OS blocks.
///
/// ```
/// use core::alloc::Layout;
///
/// use allocator::{ChainedArena, ChainedArenaConfig};
///
/// let arena = ChainedArena::create(&ChainedArenaConfig::new(4096)).unwrap();
/// assert_eq!(arena.block_count(), 0);
/// arena.allocate(Layout::new::<u64>()).unwrap();
/// assert_eq!(arena.block_count(), 1);
/// ```
pub struct ChainedArena {
    block_size: usize,
    current: Cell<*mut BlockHeader>,
    cursor: Cell<usize>,
    last: Cell<usize>,
    blocks: Cell<usize>,
}

unsafe impl Send for ChainedArena {}

impl fmt::Debug for ChainedArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedArena")
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks.get())
            .field("used_in_current", &self.used_in_current())
            .finish_non_exhaustive()
    }
}

impl ChainedArena {
    /// Creates an empty arena. No block is obtained until the first
    /// allocation.
    pub fn create(config: &ChainedArenaConfig) -> Result<Self, ArenaError> {
        ensure!(
            config.block_size > 0,
            arena_error::InvalidConfigSnafu {
                reason: "block size must be non-zero"
            }
        );
        let block_size = config
            .block_size
            .checked_next_multiple_of(os::page_size())
            .context(arena_error::InvalidConfigSnafu {
                reason: "block size overflows",
            })?;
        Ok(Self {
            block_size,
            current: Cell::new(ptr::null_mut()),
            cursor: Cell::new(0),
            last: Cell::new(NO_ALLOCATION),
            blocks: Cell::new(0),
        })
    }

    /// Number of blocks in the chain.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.get()
    }

    /// Bytes used in the current block, header included.
    #[must_use]
    pub fn used_in_current(&self) -> usize {
        self.cursor.get()
    }

    /// Total size of the current block, or 0 before the first allocation.
    #[must_use]
    pub fn current_capacity(&self) -> usize {
        let current = self.current.get();
        if current.is_null() {
            return 0;
        }
        unsafe { (*current).size }
    }

    /// Bumps `size` bytes without alignment.
    pub fn allocate_unaligned(&self, size: usize) -> Option<NonNull<u8>> {
        self.allocate(Layout::from_size_align(size, 1).ok()?)
    }

    /// Allocates memory for `layout`, chaining a new block if the current
    /// one has no room.
    pub fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if let Some(ptr) = self.bump_current(layout) {
            return Some(ptr);
        }
        self.push_block(layout)?;
        let ptr = self.bump_current(layout);
        debug_assert!(ptr.is_some());
        ptr
    }

    /// Rewinds the cursor to the start of the current block.
    ///
    /// Blocks chained before the current one are not reused; they are only
    /// returned to the OS when the arena is dropped.
    pub fn reset(&mut self) {
        if !self.current.get().is_null() {
            self.cursor.set(HEADER_SIZE);
        }
        self.last.set(NO_ALLOCATION);
        log::trace!(
            "chained arena reset: {} earlier blocks left in the chain",
            self.blocks.get().saturating_sub(1)
        );
    }

    fn block_base(&self) -> Option<NonNull<u8>> {
        NonNull::new(self.current.get().cast::<u8>())
    }

    fn aligned_start(&self, base: NonNull<u8>, align: usize) -> Option<usize> {
        let addr = base.addr().get().checked_add(self.cursor.get())?;
        let aligned = addr.checked_next_multiple_of(align)?;
        Some(self.cursor.get() + (aligned - addr))
    }

    fn bump_current(&self, layout: Layout) -> Option<NonNull<u8>> {
        let base = self.block_base()?;
        let start = self.aligned_start(base, layout.align())?;
        let end = start.checked_add(layout.size())?;
        if end > self.current_capacity() {
            return None;
        }
        self.cursor.set(end);
        self.last.set(start);
        Some(unsafe { base.add(start) })
    }

    fn push_block(&self, layout: Layout) -> Option<()> {
        let size = HEADER_SIZE
            .checked_add(layout.align() - 1)?
            .checked_add(layout.size())?
            .checked_next_multiple_of(os::page_size())?
            .max(self.block_size);
        let block = match os::map(size) {
            Ok(block) => block,
            Err(err) => {
                log::warn!("chained arena failed to obtain a {size} byte block: {err}");
                return None;
            }
        };

        #[expect(clippy::cast_ptr_alignment)]
        let header = block.as_ptr().cast::<BlockHeader>();
        unsafe {
            header.write(BlockHeader {
                prev: self.current.get(),
                size,
            });
        }
        self.current.set(header);
        self.cursor.set(HEADER_SIZE);
        self.blocks.set(self.blocks.get() + 1);
        log::debug!(
            "chained arena block #{} of {size} bytes at {block:p}",
            self.blocks.get()
        );
        Some(())
    }

    fn last_allocation(&self, ptr: NonNull<u8>, size: usize) -> Option<usize> {
        let base = self.block_base()?;
        let offset = ptr.addr().get().checked_sub(base.addr().get())?;
        (offset == self.last.get() && offset.checked_add(size) == Some(self.cursor.get()))
            .then_some(offset)
    }
}

unsafe impl Allocator for ChainedArena {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        Self::allocate(self, layout)
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout) {
        let Some(ptr) = ptr else {
            return;
        };
        if let Some(offset) = self.last_allocation(ptr, layout.size()) {
            self.cursor.set(offset);
            self.last.set(NO_ALLOCATION);
        }
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if new_size > 0
            && let Some(old_ptr) = ptr
            && let Some(offset) = self.last_allocation(old_ptr, old_layout.size())
            && let Some(end) = offset.checked_add(new_size)
            && end <= self.current_capacity()
        {
            self.cursor.set(end);
            return Some(old_ptr);
        }
        unsafe { contract::relocate(self, ptr, old_layout, new_size) }
    }
}

impl ChainedArena {
    /// Walks the chain from the current block back to the first, returning
    /// each block to the OS.
    ///
    /// # Returns
    ///
    /// The number of blocks visited. The arena is empty afterwards.
    fn release_blocks(&mut self) -> usize {
        let mut released = 0;
        let mut block = self.current.replace(ptr::null_mut());
        while let Some(header) = NonNull::new(block) {
            let BlockHeader { prev, size } = unsafe { header.as_ptr().read() };
            if let Err(err) = unsafe { os::release(header.cast(), size) } {
                log::warn!("failed to release chained arena block: {err}");
            }
            released += 1;
            block = prev;
        }
        self.blocks.set(0);
        self.cursor.set(0);
        self.last.set(NO_ALLOCATION);
        released
    }
}

impl Drop for ChainedArena {
    fn drop(&mut self) {
        let released = self.release_blocks();
        log::trace!("chained arena dropped: {released} blocks released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> usize {
        os::page_size()
    }

    fn arena() -> ChainedArena {
        ChainedArena::create(&ChainedArenaConfig::new(page())).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ChainedArena::create(&ChainedArenaConfig::new(0)),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_first_allocation_creates_block() {
        let arena = arena();
        assert_eq!(arena.current_capacity(), 0);
        let ptr = arena.allocate_unaligned(10).unwrap();
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.used_in_current(), HEADER_SIZE + 10);
        unsafe { ptr.as_ptr().write_bytes(0x33, 10) };
    }

    #[test]
    fn test_chains_new_block_when_full() {
        let arena = arena();
        arena.allocate_unaligned(page() - HEADER_SIZE).unwrap();
        assert_eq!(arena.block_count(), 1);
        arena.allocate_unaligned(1).unwrap();
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena.used_in_current(), HEADER_SIZE + 1);
    }

    #[test]
    fn test_oversized_request_gets_dedicated_block() {
        let arena = arena();
        let size = page() * 3;
        let ptr = arena.allocate_unaligned(size).unwrap();
        unsafe { ptr.as_ptr().write_bytes(0x55, size) };
        assert!(arena.current_capacity() >= size + HEADER_SIZE);
    }

    #[test]
    fn test_alignment() {
        let arena = arena();
        arena.allocate_unaligned(1).unwrap();
        let ptr = arena
            .allocate(Layout::from_size_align(8, 128).unwrap())
            .unwrap();
        assert_eq!(ptr.addr().get() % 128, 0);
    }

    #[test]
    fn test_reset_rewinds_current_block_only() {
        let mut arena = arena();
        arena.allocate_unaligned(page() - HEADER_SIZE).unwrap();
        arena.allocate_unaligned(100).unwrap();
        assert_eq!(arena.block_count(), 2);
        arena.reset();
        assert_eq!(arena.used_in_current(), HEADER_SIZE);
        assert_eq!(arena.block_count(), 2);
        arena.allocate_unaligned(100).unwrap();
        assert_eq!(arena.block_count(), 2);
    }

    #[test]
    fn test_reallocate_in_place_then_relocate() {
        let arena = arena();
        let layout = Layout::from_size_align(16, 8).unwrap();
        let ptr = Allocator::allocate(&arena, layout).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0x33, 16);
            let grown = arena.reallocate(Some(ptr), layout, 32).unwrap();
            assert_eq!(grown, ptr);
            let grown_layout = Layout::from_size_align(32, 8).unwrap();
            let moved = arena.reallocate(Some(grown), grown_layout, page()).unwrap();
            assert_ne!(moved, grown);
            assert_eq!(arena.block_count(), 2);
            for i in 0..16 {
                assert_eq!(moved.as_ptr().add(i).read(), 0x33);
            }
        }
    }

    #[test]
    fn test_drop_walks_chain() {
        let mut arena = arena();
        for _ in 0..5 {
            arena.allocate_unaligned(page()).unwrap();
        }
        assert_eq!(arena.block_count(), 5);
        assert_eq!(arena.release_blocks(), 5);
        assert_eq!(arena.block_count(), 0);
        assert_eq!(arena.current_capacity(), 0);
        assert_eq!(arena.release_blocks(), 0);
    }

    #[test]
    fn test_release_after_reset_visits_every_block() {
        let mut arena = arena();
        for _ in 0..3 {
            arena.allocate_unaligned(page()).unwrap();
        }
        arena.reset();
        for _ in 0..2 {
            arena.allocate_unaligned(page()).unwrap();
        }
        let blocks = arena.block_count();
        assert!(blocks >= 4);
        assert_eq!(arena.release_blocks(), blocks);

        arena.allocate_unaligned(16).unwrap();
        assert_eq!(arena.block_count(), 1);
    }
}

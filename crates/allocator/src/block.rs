//! Fixed-size block allocator.
//!
//! A single backing region is carved into `block_count` blocks of
//! `block_size` bytes. Free blocks are threaded into an intrusive singly
//! linked list whose node lives at the start of each free block, so both
//! allocation and release are O(1).
//!
//! ```text
//! region:  ┌────────┬────────┬────────┬────────┐
//!          │ used   │ free ──┼──────► │ free ─►│ null
//!          └────────┴────────┴────────┴────────┘
//!   free_head ───────┘
//! ```
//!
//! An allocation can never grow past one block: [`reallocate`] succeeds in
//! place when the new size still fits and fails otherwise.
//!
//! [`reallocate`]: crate::Allocator::reallocate

use alloc::alloc as heap;
use core::{
    alloc::Layout,
    cell::Cell,
    ptr::{self, NonNull},
};

use diagnostic::Violation;
use snafu::{OptionExt as _, ensure};

use crate::{
    config::BlockAllocatorConfig,
    contract::Allocator,
    error::{BlockAllocatorError, block_allocator_error},
};

/// Header written into every free block.
#[repr(align(16))]
struct FreeNode {
    next: *mut Self,
}

/// Alignment of every block, and the granularity of the block size.
pub const BLOCK_ALIGN: usize = align_of::<FreeNode>();
const _: () = assert!(size_of::<FreeNode>() <= BLOCK_ALIGN);

/// A pool of same-sized blocks.
///
/// ```
/// use core::alloc::Layout;
///
/// use allocator::{Allocator, BlockAllocator, BlockAllocatorConfig};
///
/// let pool = BlockAllocator::create(BlockAllocatorConfig::new(64, 4)).unwrap();
/// let layout = Layout::from_size_align(48, 8).unwrap();
/// let ptr = pool.allocate(layout).unwrap();
/// assert_eq!(pool.free_blocks(), 3);
/// unsafe { pool.release(Some(ptr), layout) };
/// assert_eq!(pool.free_blocks(), 4);
/// ```
#[derive(Debug)]
pub struct BlockAllocator {
    region: NonNull<u8>,
    region_layout: Layout,
    block_size: usize,
    block_count: usize,
    free_head: Cell<*mut FreeNode>,
    free_blocks: Cell<usize>,
}

unsafe impl Send for BlockAllocator {}

impl BlockAllocator {
    /// Obtains the backing region and links every block into the free list.
    pub fn create(config: BlockAllocatorConfig) -> Result<Self, BlockAllocatorError> {
        ensure!(
            config.block_size > 0,
            block_allocator_error::InvalidConfigSnafu {
                reason: "block size must be non-zero"
            }
        );
        ensure!(
            config.block_count > 0,
            block_allocator_error::InvalidConfigSnafu {
                reason: "block count must be non-zero"
            }
        );

        let block_size = config
            .block_size
            .checked_next_multiple_of(BLOCK_ALIGN)
            .context(block_allocator_error::InvalidConfigSnafu {
                reason: "block size overflows",
            })?;
        let region_layout = block_size
            .checked_mul(config.block_count)
            .and_then(|size| Layout::from_size_align(size, BLOCK_ALIGN).ok())
            .context(block_allocator_error::InvalidConfigSnafu {
                reason: "total size overflows",
            })?;
        let region = NonNull::new(unsafe { heap::alloc(region_layout) }).context(
            block_allocator_error::BackingSnafu {
                size: region_layout.size(),
            },
        )?;

        let this = Self {
            region,
            region_layout,
            block_size,
            block_count: config.block_count,
            free_head: Cell::new(ptr::null_mut()),
            free_blocks: Cell::new(0),
        };
        for index in (0..this.block_count).rev() {
            unsafe { this.push_free(this.block_ptr(index)) };
        }
        log::debug!(
            "block allocator created: {} blocks of {} bytes",
            this.block_count,
            this.block_size
        );
        Ok(this)
    }

    /// Bytes per block after rounding.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks in the region, free or in use.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of blocks currently on the free list.
    #[must_use]
    pub fn free_blocks(&self) -> usize {
        self.free_blocks.get()
    }

    fn block_ptr(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.block_count);
        unsafe { self.region.as_ptr().add(index * self.block_size) }
    }

    /// Returns whether `ptr` is the start of one of this pool's blocks.
    fn owns(&self, ptr: NonNull<u8>) -> bool {
        let start = self.region.addr().get();
        let addr = ptr.addr().get();
        addr >= start
            && addr - start < self.region_layout.size()
            && (addr - start).is_multiple_of(self.block_size)
    }

    #[track_caller]
    fn fits(&self, size: usize, align: usize) -> bool {
        diagnostic::check(
            size <= self.block_size && align <= BLOCK_ALIGN,
            Violation::InvalidLayout {
                size,
                align,
                limit: self.block_size,
            },
        )
    }

    unsafe fn push_free(&self, block: *mut u8) {
        #[expect(clippy::cast_ptr_alignment)]
        let node = block.cast::<FreeNode>();
        assert!(node.is_aligned(), "Block must be aligned to BLOCK_ALIGN");
        unsafe {
            (*node).next = self.free_head.get();
        }
        self.free_head.set(node);
        self.free_blocks.set(self.free_blocks.get() + 1);
    }

    fn pop_free(&self) -> Option<NonNull<u8>> {
        let node = NonNull::new(self.free_head.get())?;
        unsafe {
            self.free_head.set((*node.as_ptr()).next);
        }
        self.free_blocks.set(self.free_blocks.get() - 1);
        Some(node.cast())
    }
}

unsafe impl Allocator for BlockAllocator {
    #[track_caller]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.fits(layout.size(), layout.align()) {
            return None;
        }
        let ptr = self.pop_free();
        if ptr.is_none() {
            log::warn!(
                "block allocator exhausted: {} blocks of {} bytes in use",
                self.block_count,
                self.block_size
            );
        }
        ptr
    }

    #[track_caller]
    unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout) {
        let Some(ptr) = ptr else {
            return;
        };
        if !diagnostic::check(
            self.owns(ptr),
            Violation::ForeignPointer {
                addr: ptr.addr().get(),
            },
        ) {
            return;
        }
        if !self.fits(layout.size(), layout.align()) {
            return;
        }
        unsafe { self.push_free(ptr.as_ptr()) }
    }

    #[track_caller]
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        let Some(ptr) = ptr else {
            let new_layout = Layout::from_size_align(new_size, old_layout.align()).ok()?;
            return self.allocate(new_layout);
        };
        if new_size == 0 {
            unsafe { self.release(Some(ptr), old_layout) };
            return None;
        }
        if new_size > self.block_size {
            log::warn!(
                "block allocator cannot grow an allocation to {new_size} bytes (block size {})",
                self.block_size
            );
            return None;
        }
        Some(ptr)
    }
}

impl Drop for BlockAllocator {
    fn drop(&mut self) {
        unsafe { heap::dealloc(self.region.as_ptr(), self.region_layout) }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {

    use alloc::vec::Vec;

    use diagnostic::Policy;
    use snafu_utils::Located as _;

    use super::*;

    struct TestAllocator {
        allocator: BlockAllocator,
    }

    impl TestAllocator {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            let ptr = self.allocator.allocate(layout)?;
            unsafe {
                ptr.as_ptr().write_bytes(0x33, layout.size());
            }
            Some(ptr)
        }

        unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
            unsafe {
                for i in 0..layout.size() {
                    assert_eq!(ptr.as_ptr().add(i).read(), 0x33);
                }
                ptr.as_ptr().write_bytes(0x55, layout.size());
                self.allocator.release(Some(ptr), layout);
            }
        }
    }

    fn with_test_allocator<F>(block_size: usize, block_count: usize, test_fn: F)
    where
        F: FnOnce(&TestAllocator),
    {
        let allocator =
            BlockAllocator::create(BlockAllocatorConfig::new(block_size, block_count)).unwrap();
        test_fn(&TestAllocator { allocator });
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            BlockAllocator::create(BlockAllocatorConfig::new(0, 4)),
            Err(BlockAllocatorError::InvalidConfig { .. })
        ));
        assert!(matches!(
            BlockAllocator::create(BlockAllocatorConfig::new(64, 0)),
            Err(BlockAllocatorError::InvalidConfig { .. })
        ));
        assert!(matches!(
            BlockAllocator::create(BlockAllocatorConfig::new(64, usize::MAX)),
            Err(BlockAllocatorError::InvalidConfig { .. })
        ));
        assert!(matches!(
            BlockAllocator::create(BlockAllocatorConfig::new(usize::MAX, 1)),
            Err(BlockAllocatorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_error_location() {
        let err = BlockAllocator::create(BlockAllocatorConfig::new(0, 1)).unwrap_err();
        assert!(err.location().file().ends_with("block.rs"));
    }

    #[test]
    fn test_block_size_rounding() {
        with_test_allocator(20, 2, |allocator| {
            assert_eq!(allocator.allocator.block_size(), 32);
            assert_eq!(allocator.allocator.block_count(), 2);
        });
    }

    #[test]
    fn test_multiple_allocations() {
        with_test_allocator(64, 4, |allocator| unsafe {
            let layout = Layout::from_size_align(64, 8).unwrap();
            let ptr1 = allocator.allocate(layout).unwrap();
            let ptr2 = allocator.allocate(layout).unwrap();
            let ptr3 = allocator.allocate(layout).unwrap();

            assert_ne!(ptr1, ptr2);
            assert_ne!(ptr2, ptr3);
            assert_ne!(ptr1, ptr3);
            assert_eq!(ptr1.addr().get() % BLOCK_ALIGN, 0);
            assert_eq!(allocator.allocator.free_blocks(), 1);

            allocator.release(ptr1, layout);
            allocator.release(ptr2, layout);
            allocator.release(ptr3, layout);
            assert_eq!(allocator.allocator.free_blocks(), 4);
        });
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        with_test_allocator(32, 3, |allocator| unsafe {
            let layout = Layout::from_size_align(32, 1).unwrap();
            let mut ptrs = Vec::new();
            while let Some(ptr) = allocator.allocate(layout) {
                ptrs.push(ptr);
            }
            assert_eq!(ptrs.len(), 3);

            let last = ptrs.pop().unwrap();
            allocator.release(last, layout);
            let again = allocator.allocate(layout).unwrap();
            assert_eq!(again, last);

            allocator.release(again, layout);
            for ptr in ptrs {
                allocator.release(ptr, layout);
            }
        });
    }

    #[test]
    fn test_oversized_request_rejected() {
        diagnostic::set_policy(Policy::Log);
        with_test_allocator(32, 2, |allocator| {
            let layout = Layout::from_size_align(33, 1).unwrap();
            assert!(allocator.allocate(layout).is_none());
            let layout = Layout::from_size_align(8, 32).unwrap();
            assert!(allocator.allocate(layout).is_none());
            assert_eq!(allocator.allocator.free_blocks(), 2);
        });
    }

    #[test]
    fn test_foreign_pointer_ignored() {
        diagnostic::set_policy(Policy::Log);
        with_test_allocator(32, 2, |allocator| unsafe {
            let layout = Layout::from_size_align(16, 1).unwrap();
            let ptr = allocator.allocate(layout).unwrap();
            let inner = ptr.add(8);
            allocator.allocator.release(Some(inner), layout);
            assert_eq!(allocator.allocator.free_blocks(), 1);
            allocator.release(ptr, layout);
            assert_eq!(allocator.allocator.free_blocks(), 2);
        });
    }

    #[test]
    fn test_reallocate_within_block() {
        with_test_allocator(64, 2, |allocator| unsafe {
            let layout = Layout::from_size_align(16, 8).unwrap();
            let ptr = allocator.allocate(layout).unwrap();
            let same = allocator
                .allocator
                .reallocate(Some(ptr), layout, 64)
                .unwrap();
            assert_eq!(ptr, same);
            assert!(allocator.allocator.reallocate(Some(ptr), layout, 65).is_none());
            allocator.release(ptr, layout);
        });
    }

    #[test]
    fn test_reallocate_to_zero_releases() {
        with_test_allocator(64, 1, |allocator| unsafe {
            let layout = Layout::from_size_align(16, 8).unwrap();
            let ptr = allocator.allocate(layout).unwrap();
            assert_eq!(allocator.allocator.free_blocks(), 0);
            assert!(allocator.allocator.reallocate(Some(ptr), layout, 0).is_none());
            assert_eq!(allocator.allocator.free_blocks(), 1);
        });
    }
}

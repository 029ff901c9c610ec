//! Commit-on-demand bump arena.
//!
//! One contiguous range of address space is reserved when the arena is
//! created. Physical pages are committed lazily, in batches of at least
//! [`ArenaConfig::commit_granularity`] bytes, as the bump cursor crosses the
//! committed boundary.
//!
//! ```text
//! base          cursor        committed                   reserved
//!  │ allocations  │  committed,  │      reserved, not         │
//!  │              │  unused      │      committed             │
//!  ▼──────────────▼──────────────▼────────────────────────────▼
//! ```
//!
//! `base <= cursor <= committed <= reserved` holds at all times. The cursor
//! only moves forward, except through [`Arena::reset`], [`Arena::rewind`]
//! and the release of the most recent allocation. Resetting never
//! decommits, so an arena reused every frame stops committing once it has
//! reached its high-water mark.

use core::{
    alloc::Layout,
    cell::Cell,
    fmt,
    mem::ManuallyDrop,
    ptr::{self, NonNull},
    slice,
};

use diagnostic::Violation;
use snafu::{OptionExt as _, ResultExt as _, ensure};

use crate::{
    config::ArenaConfig,
    contract::{self, Allocator},
    error::{ArenaError, arena_error},
    os::{self, OsError},
};

const NO_ALLOCATION: usize = usize::MAX;

/// A saved cursor position, see [`Arena::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArenaMark(usize);

/// Bump allocator over a reserved, lazily committed address range.
///
/// Allocation borrows the arena immutably, so any number of containers may
/// share it. [`reset`](Self::reset) and [`rewind`](Self::rewind) need a
/// mutable borrow, which guarantees nothing allocated before them is still
/// referenced.
///
/// ```
/// use core::alloc::Layout;
///
/// use allocator::{Arena, ArenaConfig};
///
/// let mut arena = Arena::create(&ArenaConfig::new(1 << 20)).unwrap();
/// let value = arena.allocate_value(42_u64).unwrap();
/// assert_eq!(*value, 42);
/// assert_eq!(arena.used(), 8);
///
/// arena.reset();
/// assert_eq!(arena.used(), 0);
/// ```
pub struct Arena {
    base: NonNull<u8>,
    reserved: usize,
    granularity: usize,
    committed: Cell<usize>,
    cursor: Cell<usize>,
    last: Cell<usize>,
    commits: Cell<usize>,
}

unsafe impl Send for Arena {}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("base", &self.base)
            .field("used", &self.used())
            .field("committed", &self.committed())
            .field("reserved", &self.reserved)
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// Reserves the address range described by `config`.
    pub fn create(config: &ArenaConfig) -> Result<Self, ArenaError> {
        ensure!(
            config.reserve_size > 0,
            arena_error::InvalidConfigSnafu {
                reason: "reserve size must be non-zero"
            }
        );
        let page = os::page_size();
        let reserved = config
            .reserve_size
            .checked_next_multiple_of(page)
            .context(arena_error::InvalidConfigSnafu {
                reason: "reserve size overflows",
            })?;
        let granularity = config
            .commit_granularity
            .max(1)
            .checked_next_multiple_of(page)
            .context(arena_error::InvalidConfigSnafu {
                reason: "commit granularity overflows",
            })?;

        let base = os::reserve(reserved).context(arena_error::ReserveSnafu { size: reserved })?;
        log::debug!("arena reserved {reserved} bytes at {base:p}");

        Ok(Self {
            base,
            reserved,
            granularity,
            committed: Cell::new(0),
            cursor: Cell::new(0),
            last: Cell::new(NO_ALLOCATION),
            commits: Cell::new(0),
        })
    }

    /// Releases the whole reserved range, reporting an OS failure.
    ///
    /// Dropping the arena does the same but can only log the failure.
    pub fn destroy(self) -> Result<(), OsError> {
        let this = ManuallyDrop::new(self);
        unsafe { os::release(this.base, this.reserved) }
    }

    /// Bytes handed out since the last reset, alignment padding included.
    #[must_use]
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes currently backed by committed pages.
    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed.get()
    }

    /// Hard capacity in bytes.
    #[must_use]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Number of commit calls issued since creation.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }

    /// Bumps the cursor by `size` bytes without any alignment.
    ///
    /// Commits more pages first if the request crosses the committed
    /// boundary. Returns `None` if the reservation is exhausted or the OS
    /// denies the commit; the arena is unchanged in that case.
    pub fn allocate_unaligned(&self, size: usize) -> Option<NonNull<u8>> {
        self.bump(self.cursor.get(), size)
    }

    /// Advances the cursor to the next multiple of `alignment`.
    ///
    /// `alignment` must be a power of two. Aligning never commits: if the
    /// aligned position lies beyond the committed boundary the cursor is left
    /// unchanged and `false` is returned. [`allocate`](Self::allocate)
    /// handles any alignment.
    #[track_caller]
    pub fn align(&self, alignment: usize) -> bool {
        if !diagnostic::check(
            alignment.is_power_of_two(),
            Violation::NotPowerOfTwo { align: alignment },
        ) {
            return false;
        }
        let Some(aligned) = self.aligned_offset(self.cursor.get(), alignment) else {
            return false;
        };
        if aligned > self.committed.get() {
            return false;
        }
        self.cursor.set(aligned);
        true
    }

    /// Allocates memory for `layout`.
    ///
    /// On failure the cursor is left where it was before the call.
    pub fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let Some(start) = self.aligned_offset(self.cursor.get(), layout.align()) else {
            log::warn!("arena exhausted: cannot align to {}", layout.align());
            return None;
        };
        self.bump(start, layout.size())
    }

    /// Moves `value` into the arena.
    ///
    /// The value is never dropped; the arena only reclaims its bytes.
    #[expect(clippy::mut_from_ref)]
    pub fn allocate_value<T>(&self, value: T) -> Option<&mut T> {
        let ptr = self.allocate(Layout::new::<T>())?.cast::<T>();
        unsafe {
            ptr.as_ptr().write(value);
            Some(&mut *ptr.as_ptr())
        }
    }

    /// Copies `values` into the arena.
    #[expect(clippy::mut_from_ref)]
    pub fn allocate_slice_copy<T>(&self, values: &[T]) -> Option<&mut [T]>
    where
        T: Copy,
    {
        let layout = Layout::array::<T>(values.len()).ok()?;
        let ptr = self.allocate(layout)?.cast::<T>();
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), ptr.as_ptr(), values.len());
            Some(slice::from_raw_parts_mut(ptr.as_ptr(), values.len()))
        }
    }

    /// Rewinds the cursor to the start of the arena.
    ///
    /// Committed pages stay committed and are reused by later allocations.
    pub fn reset(&mut self) {
        log::trace!("arena reset: {} bytes released", self.cursor.get());
        self.cursor.set(0);
        self.last.set(NO_ALLOCATION);
    }

    /// Returns the current cursor position for a later [`rewind`](Self::rewind).
    #[must_use]
    pub fn mark(&self) -> ArenaMark {
        ArenaMark(self.cursor.get())
    }

    /// Rewinds the cursor to `mark`, releasing everything allocated since.
    ///
    /// A mark beyond the current cursor (taken before a reset or an earlier
    /// rewind) is a precondition violation and leaves the arena unchanged.
    #[track_caller]
    pub fn rewind(&mut self, mark: ArenaMark) {
        let cursor = self.cursor.get();
        if !diagnostic::check(
            mark.0 <= cursor,
            Violation::IndexOutOfRange {
                index: mark.0,
                len: cursor,
            },
        ) {
            return;
        }
        self.cursor.set(mark.0);
        self.last.set(NO_ALLOCATION);
    }

    fn aligned_offset(&self, offset: usize, align: usize) -> Option<usize> {
        let addr = self.base.addr().get().checked_add(offset)?;
        let aligned = addr.checked_next_multiple_of(align)?;
        offset.checked_add(aligned - addr)
    }

    fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        ptr.addr()
            .get()
            .checked_sub(self.base.addr().get())
            .filter(|offset| *offset <= self.reserved)
    }

    fn bump(&self, start: usize, size: usize) -> Option<NonNull<u8>> {
        let Some(end) = start.checked_add(size) else {
            log::warn!("arena exhausted: {size} bytes requested");
            return None;
        };
        if end > self.committed.get() && !self.commit_to(end) {
            return None;
        }
        self.cursor.set(end);
        self.last.set(start);
        debug_assert!(self.cursor.get() <= self.committed.get());
        Some(unsafe { self.base.add(start) })
    }

    /// Commits pages until `end` bytes from the base are usable.
    fn commit_to(&self, end: usize) -> bool {
        let committed = self.committed.get();
        if end > self.reserved {
            log::warn!(
                "arena exhausted: {} bytes needed, {} reserved",
                end,
                self.reserved
            );
            return false;
        }

        let amount = (end - committed)
            .next_multiple_of(self.granularity)
            .min(self.reserved - committed);
        let start = unsafe { self.base.add(committed) };
        if let Err(err) = unsafe { os::commit(start, amount) } {
            log::warn!("arena commit of {amount} bytes failed: {err}");
            return false;
        }
        self.committed.set(committed + amount);
        self.commits.set(self.commits.get() + 1);
        log::trace!(
            "arena committed {amount} bytes ({} of {} total)",
            committed + amount,
            self.reserved
        );
        true
    }

    /// Returns the offset of `ptr` if it is the most recent allocation and
    /// `size` bytes long.
    fn last_allocation(&self, ptr: NonNull<u8>, size: usize) -> Option<usize> {
        let offset = self.offset_of(ptr)?;
        (offset == self.last.get() && offset.checked_add(size) == Some(self.cursor.get()))
            .then_some(offset)
    }
}

unsafe impl Allocator for Arena {
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
        {
            let end = offset.checked_add(new_size)?;
            if end > self.committed.get() && !self.commit_to(end) {
                return None;
            }
            self.cursor.set(end);
            return Some(old_ptr);
        }
        unsafe { contract::relocate(self, ptr, old_layout, new_size) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(err) = unsafe { os::release(self.base, self.reserved) } {
            log::warn!("failed to release arena: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use diagnostic::Policy;

    use super::*;

    fn page() -> usize {
        os::page_size()
    }

    fn small_arena(pages: usize) -> Arena {
        let config = ArenaConfig::new(page() * pages).with_commit_granularity(page());
        Arena::create(&config).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Arena::create(&ArenaConfig::new(0)),
            Err(ArenaError::InvalidConfig { .. })
        ));
        assert!(matches!(
            Arena::create(&ArenaConfig::new(usize::MAX)),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_reserve_rounds_to_page() {
        let arena = Arena::create(&ArenaConfig::new(1)).unwrap();
        assert_eq!(arena.reserved(), page());
        assert_eq!(arena.committed(), 0);
        assert_eq!(arena.commit_count(), 0);
    }

    #[test]
    fn test_allocate_unaligned_bumps() {
        let arena = small_arena(4);
        let a = arena.allocate_unaligned(3).unwrap();
        let b = arena.allocate_unaligned(5).unwrap();
        assert_eq!(b.addr().get() - a.addr().get(), 3);
        assert_eq!(arena.used(), 8);
        assert_eq!(arena.committed(), page());
        assert_eq!(arena.commit_count(), 1);
    }

    #[test]
    fn test_commit_on_demand() {
        let arena = small_arena(4);
        arena.allocate_unaligned(page() - 1).unwrap();
        assert_eq!(arena.commit_count(), 1);
        arena.allocate_unaligned(2).unwrap();
        assert_eq!(arena.commit_count(), 2);
        assert_eq!(arena.committed(), page() * 2);
        let ptr = arena.allocate_unaligned(page()).unwrap();
        unsafe { ptr.as_ptr().write_bytes(0x33, page()) };
        assert_eq!(arena.committed(), page() * 3);
    }

    #[test]
    fn test_exhaustion_leaves_arena_unchanged() {
        let arena = small_arena(2);
        arena.allocate_unaligned(page()).unwrap();
        let used = arena.used();
        assert!(arena.allocate_unaligned(page() + 1).is_none());
        assert_eq!(arena.used(), used);
        assert!(arena.allocate_unaligned(page()).is_some());
        assert!(arena.allocate_unaligned(1).is_none());
    }

    #[test]
    fn test_align() {
        let arena = small_arena(2);
        arena.allocate_unaligned(3).unwrap();
        assert!(arena.align(16));
        assert_eq!(arena.used(), 16);
        let ptr = arena.allocate_unaligned(1).unwrap();
        assert_eq!(ptr.addr().get() % 16, 0);
    }

    #[test]
    fn test_align_rejects_non_power_of_two() {
        diagnostic::set_policy(Policy::Log);
        let arena = small_arena(1);
        arena.allocate_unaligned(3).unwrap();
        assert!(!arena.align(12));
        assert_eq!(arena.used(), 3);
    }

    #[test]
    fn test_allocate_layout_aligns() {
        let arena = small_arena(2);
        arena.allocate_unaligned(1).unwrap();
        let ptr = arena.allocate(Layout::from_size_align(8, 64).unwrap()).unwrap();
        assert_eq!(ptr.addr().get() % 64, 0);
        assert_eq!(arena.used(), 72);
    }

    #[test]
    fn test_reset_reuses_committed_pages() {
        let mut arena = small_arena(8);
        for _ in 0..3 {
            arena.allocate_unaligned(page() * 2 + 17).unwrap();
        }
        let commits = arena.commit_count();
        let committed = arena.committed();
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.committed(), committed);
        for _ in 0..3 {
            arena.allocate_unaligned(page() * 2 + 17).unwrap();
        }
        assert_eq!(arena.commit_count(), commits);
    }

    #[test]
    fn test_mark_and_rewind() {
        let mut arena = small_arena(1);
        arena.allocate_unaligned(10).unwrap();
        let mark = arena.mark();
        arena.allocate_unaligned(20).unwrap();
        arena.rewind(mark);
        assert_eq!(arena.used(), 10);
    }

    #[test]
    fn test_rewind_past_cursor_ignored() {
        diagnostic::set_policy(Policy::Log);
        let mut arena = small_arena(1);
        arena.allocate_unaligned(10).unwrap();
        let mark = arena.mark();
        arena.reset();
        arena.rewind(mark);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_typed_helpers() {
        let arena = small_arena(1);
        let value = arena.allocate_value([1_u32, 2, 3]).unwrap();
        value[1] = 20;
        assert_eq!(*value, [1, 20, 3]);
        let copied = arena.allocate_slice_copy(&[7_u16, 8, 9]).unwrap();
        assert_eq!(copied, &[7, 8, 9]);
        assert_eq!(copied.as_ptr().addr() % align_of::<u16>(), 0);
    }

    #[test]
    fn test_reallocate_last_in_place() {
        let arena = small_arena(2);
        let layout = Layout::from_size_align(16, 8).unwrap();
        let ptr = Allocator::allocate(&arena, layout).unwrap();
        unsafe {
            let grown = arena.reallocate(Some(ptr), layout, 64).unwrap();
            assert_eq!(grown, ptr);
            assert_eq!(arena.used(), 64);
        }
    }

    #[test]
    fn test_reallocate_older_relocates() {
        let arena = small_arena(2);
        let layout = Layout::from_size_align(16, 8).unwrap();
        let first = Allocator::allocate(&arena, layout).unwrap();
        unsafe { first.as_ptr().write_bytes(0x33, 16) };
        let _second = Allocator::allocate(&arena, layout).unwrap();
        unsafe {
            let moved = arena.reallocate(Some(first), layout, 32).unwrap();
            assert_ne!(moved, first);
            for i in 0..16 {
                assert_eq!(moved.as_ptr().add(i).read(), 0x33);
            }
        }
    }

    #[test]
    fn test_release_last_rewinds() {
        let arena = small_arena(1);
        let layout = Layout::from_size_align(24, 8).unwrap();
        let first = Allocator::allocate(&arena, layout).unwrap();
        let second = Allocator::allocate(&arena, layout).unwrap();
        unsafe {
            arena.release(Some(first), layout);
            assert_eq!(arena.used(), 48);
            arena.release(Some(second), layout);
            assert_eq!(arena.used(), 24);
        }
    }

    #[test]
    fn test_destroy() {
        let arena = small_arena(4);
        arena.allocate_unaligned(100).unwrap();
        arena.destroy().unwrap();
    }
}

//! The allocator capability contract.
//!
//! Every container in this workspace is generic over [`Allocator`] rather
//! than over a concrete allocator, so any strategy (heap, pool, arena) can
//! back any container.

use core::{
    alloc::Layout,
    num::NonZero,
    ptr::{self, NonNull},
};

/// A source of raw memory.
///
/// Failure is always signaled by `None`; nothing is raised out of band.
/// All operations take `&self`: an allocator instance is single-writer and
/// may be shared by several containers at once.
///
/// # Safety
///
/// Implementations must uphold:
///
/// - a pointer returned by [`allocate`](Self::allocate) or
///   [`reallocate`](Self::reallocate) satisfies the requested alignment and
///   is valid for reads and writes of the requested size,
/// - it stays valid until it is passed to `release`/`reallocate` on the same
///   instance or the instance is dropped,
/// - two live allocations never overlap,
/// - a failed `reallocate` leaves the original allocation untouched.
pub unsafe trait Allocator {
    /// Allocates memory described by `layout`.
    ///
    /// A zero-sized request may return a dangling, well-aligned pointer that
    /// must not be dereferenced.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns memory to the allocator. `None` is a no-op.
    ///
    /// Some allocators validate `layout` (block allocators); others ignore it.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this instance with `layout` and not
    /// released since.
    unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout);

    /// Resizes an allocation, possibly moving it.
    ///
    /// `ptr == None` behaves as [`allocate`](Self::allocate) with
    /// `old_layout.align()`. `new_size == 0` behaves as
    /// [`release`](Self::release) and returns `None`.
    ///
    /// # Safety
    ///
    /// If `ptr` is `Some`, it must have been returned by this instance with
    /// `old_layout` and not released since.
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        unsafe { relocate(self, ptr, old_layout, new_size) }
    }
}

unsafe impl<A> Allocator for &A
where
    A: Allocator + ?Sized,
{
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout) {
        unsafe { (**self).release(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        unsafe { (**self).reallocate(ptr, old_layout, new_size) }
    }
}

/// Generic reallocation: allocate, copy the surviving bytes, release.
///
/// Allocators that can resize in place call this for the cases they cannot
/// handle themselves.
///
/// # Safety
///
/// Same as [`Allocator::reallocate`].
pub unsafe fn relocate<A>(
    allocator: &A,
    ptr: Option<NonNull<u8>>,
    old_layout: Layout,
    new_size: usize,
) -> Option<NonNull<u8>>
where
    A: Allocator + ?Sized,
{
    let new_layout = Layout::from_size_align(new_size, old_layout.align()).ok()?;
    let Some(ptr) = ptr else {
        return allocator.allocate(new_layout);
    };
    if new_size == 0 {
        unsafe { allocator.release(Some(ptr), old_layout) };
        return None;
    }

    let new_ptr = allocator.allocate(new_layout)?;
    unsafe {
        ptr::copy_nonoverlapping(
            ptr.as_ptr(),
            new_ptr.as_ptr(),
            usize::min(old_layout.size(), new_size),
        );
        allocator.release(Some(ptr), old_layout);
    }
    Some(new_ptr)
}

/// A non-null pointer aligned to `layout.align()`, for zero-sized requests.
#[must_use]
pub fn dangling(layout: Layout) -> NonNull<u8> {
    let addr = NonZero::new(layout.align()).unwrap_or(NonZero::<usize>::MIN);
    NonNull::<u8>::dangling().with_addr(addr)
}

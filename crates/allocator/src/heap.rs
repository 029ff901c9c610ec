//! Pass-through to the process allocator.

use alloc::alloc as heap;
use core::{alloc::Layout, ptr::NonNull};

use diagnostic::Violation;

use crate::contract::{self, Allocator};

/// Largest alignment the process allocator is assumed to honor.
pub const MAX_ALIGN: usize = 2 * size_of::<usize>();

/// Delegates every request to the process allocator.
///
/// Alignments above [`MAX_ALIGN`] are rejected as a precondition violation.
/// Layouts passed back to [`release`](Allocator::release) are only used to
/// satisfy the process allocator's own interface.
///
/// ```
/// use core::alloc::Layout;
///
/// use allocator::{Allocator, HeapAllocator};
///
/// let layout = Layout::new::<u64>();
/// let ptr = HeapAllocator.allocate(layout).unwrap();
/// unsafe { HeapAllocator.release(Some(ptr), layout) };
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapAllocator;

impl HeapAllocator {
    #[track_caller]
    fn check_align(layout: Layout) -> bool {
        diagnostic::check(
            layout.align() <= MAX_ALIGN,
            Violation::Misaligned {
                align: layout.align(),
                max: MAX_ALIGN,
            },
        )
    }
}

unsafe impl Allocator for HeapAllocator {
    #[track_caller]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !Self::check_align(layout) {
            return None;
        }
        if layout.size() == 0 {
            return Some(contract::dangling(layout));
        }

        let ptr = NonNull::new(unsafe { heap::alloc(layout) });
        if ptr.is_none() {
            log::warn!("heap allocation failed: {layout:?}");
        }
        ptr
    }

    unsafe fn release(&self, ptr: Option<NonNull<u8>>, layout: Layout) {
        let Some(ptr) = ptr else {
            return;
        };
        if layout.size() == 0 {
            return;
        }
        unsafe { heap::dealloc(ptr.as_ptr(), layout) }
    }

    #[track_caller]
    unsafe fn reallocate(
        &self,
        ptr: Option<NonNull<u8>>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if !Self::check_align(old_layout) {
            return None;
        }
        let Some(old_ptr) = ptr.filter(|_| old_layout.size() > 0) else {
            let new_layout = Layout::from_size_align(new_size, old_layout.align()).ok()?;
            return self.allocate(new_layout);
        };
        if new_size == 0 {
            unsafe { self.release(Some(old_ptr), old_layout) };
            return None;
        }
        if Layout::from_size_align(new_size, old_layout.align()).is_err() {
            log::warn!("heap reallocation rejected: {new_size} bytes exceeds isize::MAX");
            return None;
        }

        let ptr = NonNull::new(unsafe { heap::realloc(old_ptr.as_ptr(), old_layout, new_size) });
        if ptr.is_none() {
            log::warn!("heap reallocation failed: {old_layout:?} -> {new_size} bytes");
        }
        ptr
    }
}

#[cfg(test)]
mod tests {
    use diagnostic::Policy;

    use super::*;

    #[test]
    fn test_basic_allocation() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let ptr = HeapAllocator.allocate(layout).unwrap();
        assert_eq!(ptr.addr().get() % 8, 0);
        unsafe {
            ptr.as_ptr().write_bytes(0x33, 64);
            HeapAllocator.release(Some(ptr), layout);
        }
    }

    #[test]
    fn test_max_alignment_accepted() {
        let layout = Layout::from_size_align(32, MAX_ALIGN).unwrap();
        let ptr = HeapAllocator.allocate(layout).unwrap();
        assert_eq!(ptr.addr().get() % MAX_ALIGN, 0);
        unsafe { HeapAllocator.release(Some(ptr), layout) };
    }

    #[test]
    fn test_excess_alignment_rejected() {
        diagnostic::set_policy(Policy::Log);
        let layout = Layout::from_size_align(32, MAX_ALIGN * 2).unwrap();
        assert!(HeapAllocator.allocate(layout).is_none());
    }

    #[test]
    fn test_zero_size() {
        let layout = Layout::from_size_align(0, 8).unwrap();
        let ptr = HeapAllocator.allocate(layout).unwrap();
        assert_eq!(ptr.addr().get() % 8, 0);
        unsafe { HeapAllocator.release(Some(ptr), layout) };
    }

    #[test]
    fn test_reallocate_preserves_contents() {
        let layout = Layout::from_size_align(16, 8).unwrap();
        let ptr = HeapAllocator.allocate(layout).unwrap();
        unsafe {
            for i in 0..16 {
                ptr.as_ptr().add(i).write(u8::try_from(i).unwrap());
            }
            let grown = HeapAllocator.reallocate(Some(ptr), layout, 4096).unwrap();
            for i in 0..16 {
                assert_eq!(usize::from(grown.as_ptr().add(i).read()), i);
            }
            HeapAllocator.release(Some(grown), Layout::from_size_align(4096, 8).unwrap());
        }
    }

    #[test]
    fn test_reallocate_oversize_keeps_original() {
        let layout = Layout::from_size_align(16, 8).unwrap();
        let ptr = HeapAllocator.allocate(layout).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0x5a, 16);
            assert!(
                HeapAllocator
                    .reallocate(Some(ptr), layout, usize::MAX - 2)
                    .is_none()
            );
            assert_eq!(ptr.as_ptr().add(15).read(), 0x5a);
            HeapAllocator.release(Some(ptr), layout);
        }
    }
}

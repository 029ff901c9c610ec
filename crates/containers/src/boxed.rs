//! A nullable single-owner box generic over the allocator.

use core::{alloc::Layout, fmt, ptr::NonNull};

use allocator::{Allocator, HeapAllocator};
use diagnostic::Violation;

use crate::error::{AllocError, EmptyError};

/// Owns zero or one value of `T` in memory obtained from `A`.
///
/// Unlike `Box`, an `OwnedBox` may be empty. The allocation is kept when the
/// value is replaced through [`construct`](Self::construct), and released by
/// [`destroy`](Self::destroy), [`into_inner`](Self::into_inner) or drop.
///
/// ```
/// use containers::OwnedBox;
///
/// let mut boxed = OwnedBox::new(String::from("ship")).unwrap();
/// assert_eq!(boxed.get().map(String::as_str), Some("ship"));
///
/// let raw = boxed.leak().unwrap();
/// assert!(boxed.is_empty());
///
/// let restored = unsafe { OwnedBox::from_raw(raw) };
/// assert_eq!(restored.get().map(String::as_str), Some("ship"));
/// ```
pub struct OwnedBox<T, A: Allocator = HeapAllocator> {
    ptr: Option<NonNull<T>>,
    alloc: A,
}

unsafe impl<T: Send, A: Allocator + Send> Send for OwnedBox<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for OwnedBox<T, A> {}

impl<T> OwnedBox<T> {
    /// Moves `value` to the process heap.
    pub fn new(value: T) -> Result<Self, AllocError> {
        Self::new_in(value, HeapAllocator)
    }

    /// Takes ownership of a pointer previously returned by
    /// [`leak`](Self::leak) on a heap-backed box.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`leak`](Self::leak) of an
    /// `OwnedBox<T, HeapAllocator>` and must not be owned by anything else.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        unsafe { Self::from_raw_in(ptr, HeapAllocator) }
    }
}

impl<T> Default for OwnedBox<T> {
    fn default() -> Self {
        Self::empty_in(HeapAllocator)
    }
}

impl<T, A: Allocator> OwnedBox<T, A> {
    pub const fn empty_in(alloc: A) -> Self {
        Self { ptr: None, alloc }
    }

    pub fn new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        let mut boxed = Self::empty_in(alloc);
        boxed.construct(value)?;
        Ok(boxed)
    }

    /// # Safety
    ///
    /// `ptr` must point to an initialized `T` allocated from `alloc` with
    /// `Layout::new::<T>()` and must not be owned by anything else.
    pub unsafe fn from_raw_in(ptr: NonNull<T>, alloc: A) -> Self {
        Self {
            ptr: Some(ptr),
            alloc,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.ptr.is_some()
    }

    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.map(|mut ptr| unsafe { ptr.as_mut() })
    }

    /// Returns the value, or `fallback` if the box is empty.
    pub fn value_or<'a>(&'a self, fallback: &'a T) -> &'a T {
        self.get().unwrap_or(fallback)
    }

    pub fn try_get(&self) -> Result<&T, EmptyError> {
        self.get().ok_or(EmptyError)
    }

    /// Stores `value`, allocating only if the box is empty.
    ///
    /// An existing value is dropped and its memory reused.
    pub fn construct(&mut self, value: T) -> Result<&mut T, AllocError> {
        let mut ptr = match self.ptr {
            Some(ptr) => {
                unsafe { ptr.drop_in_place() };
                ptr
            }
            None => {
                let Some(ptr) = self.alloc.allocate(Layout::new::<T>()) else {
                    log::warn!("box allocation of {} bytes failed", size_of::<T>());
                    return Err(AllocError);
                };
                ptr.cast()
            }
        };
        unsafe { ptr.write(value) };
        self.ptr = Some(ptr);
        Ok(unsafe { ptr.as_mut() })
    }

    /// Drops the value and releases its memory early.
    pub fn destroy(&mut self) {
        drop(self.into_inner_mut());
    }

    /// Moves the value out, releasing its memory and leaving the box empty.
    pub fn into_inner_mut(&mut self) -> Option<T> {
        let ptr = self.ptr.take()?;
        let value = unsafe { ptr.read() };
        unsafe { self.alloc.release(Some(ptr.cast()), Layout::new::<T>()) };
        Some(value)
    }

    pub fn into_inner(mut self) -> Option<T> {
        self.into_inner_mut()
    }

    /// Gives up ownership of the allocation, leaving the box empty.
    ///
    /// The pointer can be turned back into a box with
    /// [`from_raw_in`](Self::from_raw_in) and the same allocator.
    #[must_use = "the leaked value must be reclaimed with `from_raw_in`"]
    pub fn leak(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Moves ownership into a new box sharing a clone of the allocator,
    /// leaving this box empty.
    #[must_use]
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        Self {
            ptr: self.ptr.take(),
            alloc: self.alloc.clone(),
        }
    }

    /// Deep-clones the value into a new allocation.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        T: Clone,
        A: Clone,
    {
        match self.get() {
            Some(value) => Self::new_in(value.clone(), self.alloc.clone()),
            None => Ok(Self::empty_in(self.alloc.clone())),
        }
    }

    /// Returns the value, reporting [`Violation::NullPointer`] and falling
    /// back to `fallback` if the box is empty.
    #[track_caller]
    pub fn expect_value<'a>(&'a self, fallback: &'a T) -> &'a T {
        if let Some(value) = self.get() {
            return value;
        }
        diagnostic::report(Violation::NullPointer);
        fallback
    }
}

impl<T, A: Allocator> Drop for OwnedBox<T, A> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Deep-clones the value. If the allocation fails the clone is empty and the
/// failure is logged.
impl<T: Clone, A: Allocator + Clone> Clone for OwnedBox<T, A> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| {
            log::warn!("box clone: {err}");
            Self::empty_in(self.alloc.clone())
        })
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for OwnedBox<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedBox").field(&self.get()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for OwnedBox<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Eq, A: Allocator> Eq for OwnedBox<T, A> {}

impl<T, A: Allocator> From<OwnedBox<T, A>> for Option<T> {
    fn from(boxed: OwnedBox<T, A>) -> Self {
        boxed.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use std::rc::Rc;

    use allocator::{BlockAllocator, BlockAllocatorConfig};
    use diagnostic::Policy;

    use super::*;

    #[derive(Debug, Clone)]
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_construct_reuses_allocation() {
        let pool = BlockAllocator::create(BlockAllocatorConfig::new(16, 2)).unwrap();
        let mut boxed = OwnedBox::empty_in(&pool);
        boxed.construct(1_u64).unwrap();
        assert_eq!(pool.free_blocks(), 1);
        boxed.construct(2).unwrap();
        assert_eq!(pool.free_blocks(), 1);
        assert_eq!(boxed.get(), Some(&2));
        boxed.destroy();
        assert!(boxed.is_empty());
        assert_eq!(pool.free_blocks(), 2);
    }

    #[test]
    fn test_leak_round_trip() {
        let mut boxed = OwnedBox::new([1_u32, 2, 3]).unwrap();
        let raw = boxed.leak().unwrap();
        assert!(boxed.is_empty());
        let restored = unsafe { OwnedBox::from_raw(raw) };
        assert_eq!(restored.into_inner(), Some([1, 2, 3]));
    }

    #[test]
    fn test_take_nulls_source() {
        let mut source = OwnedBox::new(5).unwrap();
        let target = source.take();
        assert!(source.is_empty());
        assert_eq!(target.get(), Some(&5));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = OwnedBox::new(vec![1, 2]).unwrap();
        let clone = original.clone();
        original.get_mut().unwrap().push(3);
        assert_eq!(clone.get(), Some(&vec![1, 2]));
        assert_ne!(original, clone);
        assert!(OwnedBox::<u8>::default().clone().is_empty());
    }

    #[test]
    fn test_value_drops_once() {
        let drops = Rc::new(Cell::new(0));
        let mut boxed = OwnedBox::new(DropCounter(Rc::clone(&drops))).unwrap();
        boxed.construct(DropCounter(Rc::clone(&drops))).unwrap();
        assert_eq!(drops.get(), 1);
        drop(boxed);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_empty_access() {
        diagnostic::set_policy(Policy::Log);
        let boxed = OwnedBox::<i32>::default();
        assert_eq!(boxed.try_get(), Err(EmptyError));
        assert_eq!(*boxed.value_or(&4), 4);
        assert_eq!(*boxed.expect_value(&9), 9);
    }

    #[test]
    fn test_allocation_failure() {
        let pool = BlockAllocator::create(BlockAllocatorConfig::new(16, 1)).unwrap();
        let _first = OwnedBox::new_in(1_u8, &pool).unwrap();
        assert_eq!(OwnedBox::new_in(2_u8, &pool).unwrap_err(), AllocError);
    }
}

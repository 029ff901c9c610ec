//! Growable array generic over the allocator.
//!
//! Growth is a single [`Allocator::reallocate`] call. Existing elements are
//! relocated as raw bytes, which is sound because every Rust value can be
//! moved by a bitwise copy.

use core::{
    alloc::Layout,
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use allocator::{Allocator, HeapAllocator};

use crate::error::{AllocError, CapacityError, IndexOutOfBounds, InsertError};

/// Smallest non-zero capacity.
const MIN_CAPACITY: usize = 4;

/// A contiguous growable array.
///
/// When full, the capacity doubles (starting at 4).
/// [`extend_from_slice`](Self::extend_from_slice) grows straight to the next
/// power of two that fits the result.
///
/// ```
/// use containers::DynArray;
///
/// let mut values = DynArray::<i32>::new();
/// values.extend_from_slice(&[1, 2, 3, 4, 5]).unwrap();
/// assert_eq!(values.capacity(), 8);
///
/// assert_eq!(values.remove_swap(0), Ok(1));
/// assert_eq!(values, [5, 2, 3, 4]);
/// ```
///
/// Any [`Allocator`] can back the array, including a borrowed arena:
///
/// ```
/// use allocator::{Arena, ArenaConfig};
/// use containers::DynArray;
///
/// let arena = Arena::create(&ArenaConfig::new(1 << 20)).unwrap();
/// let mut values = DynArray::new_in(&arena);
/// values.push(1_u64).unwrap();
/// assert!(arena.used() >= 8);
/// ```
pub struct DynArray<T, A: Allocator = HeapAllocator> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for DynArray<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for DynArray<T, A> {}

impl<T> DynArray<T> {
    /// Creates an empty array backed by the process heap.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(HeapAllocator)
    }

    /// Creates an array with room for `capacity` elements on the process
    /// heap.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        Self::with_capacity_in(capacity, HeapAllocator)
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> DynArray<T, A> {
    /// Creates an empty array. Nothing is allocated until the first
    /// insertion.
    pub fn new_in(alloc: A) -> Self {
        let cap = if size_of::<T>() == 0 { usize::MAX } else { 0 };
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates an empty array with room for at least `capacity` elements.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of elements to allocate up front
    /// * `alloc` - Allocator that owns the storage
    ///
    /// # Returns
    ///
    /// * `Ok(array)` - An empty array whose capacity is at least `capacity`
    /// * `Err(AllocError)` - If `alloc` cannot provide the storage
    ///
    /// # Examples
    ///
    /// ```
    /// use allocator::HeapAllocator;
    /// use containers::DynArray;
    ///
    /// let array = DynArray::<u32>::with_capacity_in(10, HeapAllocator).unwrap();
    /// assert!(array.is_empty());
    /// assert!(array.capacity() >= 10);
    /// ```
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocError> {
        let mut array = Self::new_in(alloc);
        array.grow_to(capacity)?;
        Ok(array)
    }

    /// Clones `values` into a new array backed by `alloc`.
    pub fn from_slice_in(values: &[T], alloc: A) -> Result<Self, AllocError>
    where
        T: Clone,
    {
        let mut array = Self::new_in(alloc);
        array.extend_from_slice(values)?;
        Ok(array)
    }

    /// Collects `iter`, stopping at the first allocation failure.
    pub fn from_iter_in<I>(iter: I, alloc: A) -> Result<Self, AllocError>
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        let mut array = Self::new_in(alloc);
        array.reserve(iter.size_hint().0)?;
        for value in iter {
            if array.push(value).is_err() {
                return Err(AllocError);
            }
        }
        Ok(array)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Appends `value`, doubling the capacity if the array is full.
    ///
    /// On allocation failure the array is unchanged and `value` is returned
    /// in the error.
    pub fn push(&mut self, value: T) -> Result<(), CapacityError<T>> {
        if self.len == self.cap {
            let new_cap = usize::max(MIN_CAPACITY, self.cap.saturating_mul(2));
            if self.grow_to(new_cap).is_err() {
                return Err(CapacityError::new(value));
            }
        }
        unsafe { self.ptr.add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Appends clones of every element of `values` after at most one
    /// reallocation.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), AllocError>
    where
        T: Clone,
    {
        self.reserve(values.len())?;
        for value in values {
            unsafe { self.ptr.add(self.len).write(value.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Makes room for at least `additional` more elements, growing to the
    /// next power of two.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let required = self.len.checked_add(additional).ok_or(AllocError)?;
        if required <= self.cap {
            return Ok(());
        }
        let new_cap = required
            .checked_next_power_of_two()
            .ok_or(AllocError)?
            .max(MIN_CAPACITY);
        self.grow_to(new_cap)
    }

    /// Inserts `value` at `index`, shifting the tail right.
    ///
    /// `index == len` appends.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), InsertError<T>> {
        if index > self.len {
            return Err(InsertError::OutOfBounds {
                element: value,
                source: IndexOutOfBounds {
                    index,
                    len: self.len,
                },
            });
        }
        self.push(value).map_err(InsertError::Capacity)?;
        self.as_mut_slice()[index..].rotate_right(1);
        Ok(())
    }

    /// Removes the element at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len)?;
        unsafe {
            let hole = self.ptr.add(index);
            let value = hole.read();
            ptr::copy(hole.add(1).as_ptr(), hole.as_ptr(), self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Removes the element at `index` by moving the last element into its
    /// place. Does not preserve order.
    pub fn remove_swap(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len)?;
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.len = last;
        Ok(unsafe { self.ptr.add(last).read() })
    }

    /// Removes the last element and returns it, or `None` if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.ptr.add(self.len).read() })
    }

    /// Drops every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Shortens the array to `len` elements, dropping the rest.
    ///
    /// Has no effect if `len` is not less than the current length. The
    /// capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = unsafe { self.ptr.add(len).as_ptr() };
        let tail = ptr::slice_from_raw_parts_mut(tail, self.len - len);
        self.len = len;
        unsafe { ptr::drop_in_place(tail) };
    }

    /// Replaces the element at `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len)?;
        self.as_mut_slice()[index] = value;
        Ok(())
    }

    /// Returns the element at `index`, or `fallback` when out of bounds.
    pub fn get_or<'a>(&'a self, index: usize, fallback: &'a T) -> &'a T {
        self.as_slice().get(index).unwrap_or(fallback)
    }

    /// Returns the element at `index` without a bounds check in release
    /// builds.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len, "index {index} out of bounds");
        unsafe { self.ptr.add(index).as_ref() }
    }

    /// Replaces the element at `index` without a bounds check in release
    /// builds.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    pub unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len, "index {index} out of bounds");
        unsafe { *self.ptr.add(index).as_ptr() = value };
    }

    /// Clones the array into a new allocation from a clone of its allocator.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        T: Clone,
        A: Clone,
    {
        let mut clone = Self::new_in(self.alloc.clone());
        clone.extend_from_slice(self.as_slice())?;
        Ok(clone)
    }

    fn layout(cap: usize) -> Result<Layout, AllocError> {
        Layout::array::<T>(cap).ok().ok_or(AllocError)
    }

    fn grow_to(&mut self, new_cap: usize) -> Result<(), AllocError> {
        if new_cap <= self.cap {
            return Ok(());
        }
        let new_layout = Self::layout(new_cap)?;
        let old_layout = Self::layout(self.cap)?;
        let old_ptr = (self.cap > 0).then(|| self.ptr.cast::<u8>());
        let Some(new_ptr) = (unsafe { self.alloc.reallocate(old_ptr, old_layout, new_layout.size()) })
        else {
            log::warn!(
                "array growth from {} to {new_cap} elements of {} bytes failed",
                self.cap,
                size_of::<T>()
            );
            return Err(AllocError);
        };
        self.ptr = new_ptr.cast();
        self.cap = new_cap;
        Ok(())
    }

    fn release_buffer(&mut self) {
        if size_of::<T>() == 0 || self.cap == 0 {
            return;
        }
        if let Ok(layout) = Self::layout(self.cap) {
            unsafe { self.alloc.release(Some(self.ptr.cast()), layout) };
        }
    }
}

impl<T, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
        self.release_buffer();
    }
}

impl<T, A: Allocator> Deref for DynArray<T, A> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for DynArray<T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

/// Clones into a fresh allocation. If that allocation fails the clone is
/// empty and the failure is logged; use
/// [`try_clone`](DynArray::try_clone) to observe it.
impl<T: Clone, A: Allocator + Clone> Clone for DynArray<T, A> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| {
            log::warn!("array clone of {} elements: {err}", self.len);
            Self::new_in(self.alloc.clone())
        })
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<DynArray<T, B>> for DynArray<T, A> {
    fn eq(&self, other: &DynArray<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for DynArray<T, A> {}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for DynArray<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for DynArray<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Hash, A: Allocator> Hash for DynArray<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

/// Appends every element, stopping with a logged warning at the first
/// allocation failure.
impl<T, A: Allocator> Extend<T> for DynArray<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let _ = self.reserve(iter.size_hint().0);
        for value in iter {
            if self.push(value).is_err() {
                log::warn!("array extend stopped at {} elements", self.len);
                return;
            }
        }
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut DynArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for DynArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        let array = ManuallyDrop::new(self);
        IntoIter {
            ptr: array.ptr,
            cap: array.cap,
            alloc: ManuallyDrop::new(unsafe { ptr::read(&array.alloc) }),
            start: 0,
            end: array.len,
            _marker: PhantomData,
        }
    }
}

/// Owning iterator over a [`DynArray`].
pub struct IntoIter<T, A: Allocator = HeapAllocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: ManuallyDrop<A>,
    start: usize,
    end: usize,
    _marker: PhantomData<T>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    /// The elements not yet yielded.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.add(self.start).as_ptr(), self.end - self.start) }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let value = unsafe { self.ptr.add(self.start).read() };
        self.start += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { self.ptr.add(self.end).read() })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        // Reassembling the array drops the remaining elements and releases
        // the buffer.
        let remaining = self.end - self.start;
        unsafe {
            ptr::copy(self.ptr.add(self.start).as_ptr(), self.ptr.as_ptr(), remaining);
        }
        let alloc = unsafe { ManuallyDrop::take(&mut self.alloc) };
        drop(DynArray {
            ptr: self.ptr,
            len: remaining,
            cap: self.cap,
            alloc,
            _marker: PhantomData::<T>,
        });
        self.start = self.end;
    }
}

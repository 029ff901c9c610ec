//! Fixed-capacity arrays with inline storage.
//!
//! [`BoundedArray`] is a thin layer over [`ArrayVec`] that speaks the same
//! error vocabulary as the heap-backed [`DynArray`](crate::DynArray): a
//! full array hands the rejected element back in a [`CapacityError`], and
//! bulk operations that have no failure channel report
//! [`Violation::CapacityExceeded`] instead of panicking.

use core::{
    fmt,
    ops::{Deref, DerefMut},
    slice,
};

use arrayvec::ArrayVec;
use diagnostic::Violation;

use crate::error::{CapacityError, IndexOutOfBounds, InsertError};

/// An array with inline storage for at most `N` elements.
///
/// Appending to a full array fails instead of growing. The array needs no
/// allocator and can live on the stack or inside another value.
///
/// ```
/// use containers::BoundedArray;
///
/// let mut voices = BoundedArray::<u8, 2>::new();
/// voices.push(5).unwrap();
/// voices.push(7).unwrap();
/// assert_eq!(voices.push(9).unwrap_err().element(), 9);
/// assert_eq!(voices, [5, 7]);
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundedArray<T, const N: usize> {
    items: ArrayVec<T, N>,
}

impl<T, const N: usize> BoundedArray<T, N> {
    pub const CAPACITY: usize = N;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: ArrayVec::new_const(),
        }
    }

    /// Copies `values` into a new array, failing if they do not fit.
    pub fn from_slice(values: &[T]) -> Result<Self, CapacityError>
    where
        T: Clone,
    {
        let mut array = Self::new();
        array.extend_from_slice(values)?;
        Ok(array)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.items.is_full()
    }

    #[must_use]
    pub const fn remaining_capacity(&self) -> usize {
        self.items.remaining_capacity()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.items.as_slice()
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.items.as_mut_slice()
    }

    /// Appends `value`, or hands it back if the array is full.
    pub fn push(&mut self, value: T) -> Result<(), CapacityError<T>> {
        self.items
            .try_push(value)
            .map_err(|err| CapacityError::new(err.element()))
    }

    /// Appends clones of `values`. The array is unchanged if they do not all
    /// fit.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<(), CapacityError>
    where
        T: Clone,
    {
        if values.len() > self.remaining_capacity() {
            return Err(CapacityError::new(()));
        }
        for value in values {
            self.items.push(value.clone());
        }
        Ok(())
    }

    /// Inserts `value` at `index`, shifting the tail right.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), InsertError<T>> {
        let len = self.len();
        if index > len {
            return Err(InsertError::OutOfBounds {
                element: value,
                source: IndexOutOfBounds { index, len },
            });
        }
        self.items
            .try_insert(index, value)
            .map_err(|err| InsertError::Capacity(CapacityError::new(err.element())))
    }

    /// Removes the element at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len())?;
        Ok(self.items.remove(index))
    }

    /// Removes the element at `index` by moving the last element into its
    /// place.
    pub fn remove_swap(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len())?;
        Ok(self.items.swap_remove(index))
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.len())?;
        self.items[index] = value;
        Ok(())
    }

    /// Returns the element at `index`, or `fallback` when out of bounds.
    pub fn get_or<'a>(&'a self, index: usize, fallback: &'a T) -> &'a T {
        self.items.get(index).unwrap_or(fallback)
    }

    /// # Safety
    ///
    /// `index` must be less than `len()`.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len(), "index {index} out of bounds");
        unsafe { self.items.as_slice().get_unchecked(index) }
    }

    /// # Safety
    ///
    /// `index` must be less than `len()`.
    pub unsafe fn set_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len(), "index {index} out of bounds");
        unsafe { *self.items.as_mut_slice().get_unchecked_mut(index) = value };
    }

    /// Appends `value`, reporting [`Violation::CapacityExceeded`] and
    /// dropping it when the array is full.
    #[track_caller]
    fn push_or_report(&mut self, value: T) -> bool {
        if self.items.try_push(value).is_ok() {
            return true;
        }
        diagnostic::report(Violation::CapacityExceeded { capacity: N });
        false
    }
}

impl<T, const N: usize> Default for BoundedArray<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for BoundedArray<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, const N: usize> DerefMut for BoundedArray<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for BoundedArray<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize> PartialEq<[T]> for BoundedArray<T, N> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, const N: usize, const M: usize> PartialEq<[T; M]> for BoundedArray<T, N> {
    fn eq(&self, other: &[T; M]) -> bool {
        self.as_slice() == other
    }
}

/// Appends every element that fits. Elements past the capacity are dropped
/// after a [`Violation::CapacityExceeded`] report.
impl<T, const N: usize> Extend<T> for BoundedArray<T, N> {
    #[track_caller]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if !self.push_or_report(value) {
                return;
            }
        }
    }
}

impl<T, const N: usize> FromIterator<T> for BoundedArray<T, N> {
    #[track_caller]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a BoundedArray<T, N> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a mut BoundedArray<T, N> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, const N: usize> IntoIterator for BoundedArray<T, N> {
    type Item = T;
    type IntoIter = arrayvec::IntoIter<T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T, const N: usize> From<[T; N]> for BoundedArray<T, N> {
    fn from(values: [T; N]) -> Self {
        Self {
            items: ArrayVec::from(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use diagnostic::Policy;

    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut array = BoundedArray::<i32, 2>::new();
        array.push(5).unwrap();
        array.push(7).unwrap();
        assert!(array.is_full());
        assert_eq!(array.push(9).unwrap_err().element(), 9);
        assert_eq!(array, [5, 7]);
    }

    #[test]
    fn test_extend_from_slice_is_all_or_nothing() {
        let mut array = BoundedArray::<i32, 4>::new();
        array.push(1).unwrap();
        assert!(array.extend_from_slice(&[2, 3, 4, 5]).is_err());
        assert_eq!(array, [1]);
        array.extend_from_slice(&[2, 3, 4]).unwrap();
        assert_eq!(array.remaining_capacity(), 0);
    }

    #[test]
    fn test_insert_remove() {
        let mut array = BoundedArray::<char, 3>::from_slice(&['a', 'c']).unwrap();
        array.insert(1, 'b').unwrap();
        assert_eq!(array, ['a', 'b', 'c']);
        assert!(array.insert(0, 'z').unwrap_err().is_capacity());
        assert_eq!(array.remove(0), Ok('a'));
        assert_eq!(array.remove_swap(0), Ok('b'));
        assert_eq!(array, ['c']);
        assert!(array.remove(1).is_err());
        assert!(array.insert(5, 'q').unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_accessors() {
        let mut array = BoundedArray::from([1, 2, 3]);
        array.set(2, 30).unwrap();
        assert_eq!(array.set(3, 0), Err(IndexOutOfBounds { index: 3, len: 3 }));
        assert_eq!(*array.get_or(3, &0), 0);
        unsafe {
            array.set_unchecked(0, 10);
            assert_eq!(*array.get_unchecked(0), 10);
        }
        assert_eq!(array.pop(), Some(30));
        array.truncate(1);
        assert_eq!(array, [10]);
    }

    #[test]
    fn test_from_iter_drops_excess() {
        diagnostic::set_policy(Policy::Log);
        let array: BoundedArray<u32, 3> = (0..10).collect();
        assert_eq!(array, [0, 1, 2]);
    }
}

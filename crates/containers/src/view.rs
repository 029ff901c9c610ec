//! Non-owning views over contiguous elements.
//!
//! A view is a borrowed slice with the accessor shape of the owning
//! containers. Its lifetime ties it to the memory it points into.

use core::{
    ops::{Deref, DerefMut},
    slice,
};

use diagnostic::Violation;

use crate::error::IndexOutOfBounds;

/// A read-only view.
///
/// ```
/// use containers::View;
///
/// let data = [1, 2, 3];
/// let view = View::from(&data);
/// assert_eq!(view.len(), 3);
/// assert_eq!(*view.get_or(7, &0), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct View<'a, T> {
    items: &'a [T],
}

impl<'a, T> View<'a, T> {
    #[must_use]
    pub const fn new(items: &'a [T]) -> Self {
        Self { items }
    }

    /// Builds a view from a raw pointer and element count.
    ///
    /// A null `ptr` with a non-zero `len` is reported as
    /// [`Violation::NullPointer`] and yields an empty view.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must satisfy the requirements of
    /// [`slice::from_raw_parts`] for `len` elements and lifetime `'a`.
    #[track_caller]
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Self {
        if ptr.is_null() {
            if len > 0 {
                diagnostic::report(Violation::NullPointer);
            }
            return Self { items: &[] };
        }
        Self {
            items: unsafe { slice::from_raw_parts(ptr, len) },
        }
    }

    #[must_use]
    pub const fn as_slice(&self) -> &'a [T] {
        self.items
    }

    pub fn get_or(&self, index: usize, fallback: &'a T) -> &'a T {
        self.items.get(index).unwrap_or(fallback)
    }
}

impl<T> Deref for View<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.items
    }
}

impl<'a, T> From<&'a [T]> for View<'a, T> {
    fn from(items: &'a [T]) -> Self {
        Self::new(items)
    }
}

impl<'a, T, const N: usize> From<&'a [T; N]> for View<'a, T> {
    fn from(items: &'a [T; N]) -> Self {
        Self::new(items)
    }
}

impl<'a, T> IntoIterator for View<'a, T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A mutable view.
///
/// ```
/// use containers::ViewMut;
///
/// let mut data = [1, 2, 3];
/// let mut view = ViewMut::from(&mut data);
/// view.set(0, 10).unwrap();
/// assert!(view.set(3, 0).is_err());
/// assert_eq!(data, [10, 2, 3]);
/// ```
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ViewMut<'a, T> {
    items: &'a mut [T],
}

impl<'a, T> ViewMut<'a, T> {
    pub const fn new(items: &'a mut [T]) -> Self {
        Self { items }
    }

    /// Builds a mutable view from a raw pointer and element count.
    ///
    /// A null `ptr` with a non-zero `len` is reported as
    /// [`Violation::NullPointer`] and yields an empty view.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must satisfy the requirements of
    /// [`slice::from_raw_parts_mut`] for `len` elements and lifetime `'a`.
    #[track_caller]
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Self {
        if ptr.is_null() {
            if len > 0 {
                diagnostic::report(Violation::NullPointer);
            }
            return Self { items: &mut [] };
        }
        Self {
            items: unsafe { slice::from_raw_parts_mut(ptr, len) },
        }
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), IndexOutOfBounds> {
        IndexOutOfBounds::check(index, self.items.len())?;
        self.items[index] = value;
        Ok(())
    }

    pub fn get_or<'b>(&'b self, index: usize, fallback: &'b T) -> &'b T {
        self.items.get(index).unwrap_or(fallback)
    }

    /// Reborrows as a read-only view.
    #[must_use]
    pub fn as_view(&self) -> View<'_, T> {
        View::new(self.items)
    }
}

impl<T> Deref for ViewMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.items
    }
}

impl<T> DerefMut for ViewMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.items
    }
}

impl<'a, T> From<&'a mut [T]> for ViewMut<'a, T> {
    fn from(items: &'a mut [T]) -> Self {
        Self::new(items)
    }
}

impl<'a, T, const N: usize> From<&'a mut [T; N]> for ViewMut<'a, T> {
    fn from(items: &'a mut [T; N]) -> Self {
        Self::new(items)
    }
}

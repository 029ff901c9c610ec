use core::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::enumerant::Enumerant;

/// A fixed array with one slot per member of `E`.
///
/// `N` must equal `E::COUNT`; a mismatch fails at compile time when the
/// array is constructed. Indexing takes a member of `E`, never a raw
/// integer, so every access is in bounds.
///
/// ```
/// use containers::{EnumArray, Enumerant, enumerant};
///
/// enumerant! {
///     enum Channel { Music, Effects, Voice }
/// }
///
/// let mut volume = EnumArray::<Channel, u8, { Channel::COUNT }>::from_array([10, 20, 30]);
/// assert_eq!(*volume.lookup(Channel::Effects), 20);
/// volume.set(Channel::Voice, 99);
/// assert_eq!(volume[Channel::Voice], 99);
/// ```
pub struct EnumArray<E, T, const N: usize> {
    values: [T; N],
    _enum: PhantomData<fn(E) -> E>,
}

impl<E: Enumerant, T, const N: usize> EnumArray<E, T, N> {
    const SIZE_MATCHES: () = assert!(
        N == E::COUNT,
        "array length must equal the number of enumerants"
    );

    /// Takes the values in member index order.
    pub const fn from_array(values: [T; N]) -> Self {
        let () = Self::SIZE_MATCHES;
        Self {
            values,
            _enum: PhantomData,
        }
    }

    pub fn from_fn(mut f: impl FnMut(E) -> T) -> Self {
        Self::from_array(core::array::from_fn(|index| f(E::ALL[index])))
    }

    /// Returns the value stored for `key`.
    pub fn lookup(&self, key: E) -> &T {
        &self.values[key.index()]
    }

    pub fn lookup_mut(&mut self, key: E) -> &mut T {
        &mut self.values[key.index()]
    }

    /// Replaces the value for `key`, returning the previous one.
    pub fn set(&mut self, key: E, value: T) -> T {
        core::mem::replace(self.lookup_mut(key), value)
    }

    /// Sets every slot to a clone of `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.values.fill(value);
    }

    /// Iterates over `(member, value)` pairs in member index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (E, &T)> + '_ {
        E::ALL.iter().copied().zip(&self.values)
    }

    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (E, &mut T)> + '_ {
        E::ALL.iter().copied().zip(&mut self.values)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[T; N] {
        &self.values
    }

    pub fn into_array(self) -> [T; N] {
        self.values
    }
}

impl<E: Enumerant, T: Default, const N: usize> Default for EnumArray<E, T, N> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<E, T: Clone, const N: usize> Clone for EnumArray<E, T, N> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            _enum: PhantomData,
        }
    }
}

impl<E, T: Copy, const N: usize> Copy for EnumArray<E, T, N> {}

impl<E, T: PartialEq, const N: usize> PartialEq for EnumArray<E, T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<E, T: Eq, const N: usize> Eq for EnumArray<E, T, N> {}

impl<E: Enumerant + fmt::Debug, T: fmt::Debug, const N: usize> fmt::Debug for EnumArray<E, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<E: Enumerant, T, const N: usize> Index<E> for EnumArray<E, T, N> {
    type Output = T;

    fn index(&self, key: E) -> &T {
        self.lookup(key)
    }
}

impl<E: Enumerant, T, const N: usize> IndexMut<E> for EnumArray<E, T, N> {
    fn index_mut(&mut self, key: E) -> &mut T {
        self.lookup_mut(key)
    }
}

//! A set of enumerants packed into one `u64`.
//!
//! How a member maps to a bit is fixed by the [`Encoding`] type parameter:
//! [`ByIndex`] shifts `1` by the member's index, [`ByMask`] uses the member's
//! discriminant as the mask directly. The two are never mixed within one set
//! type.

use core::{fmt, hash::Hash, marker::PhantomData};

use diagnostic::Violation;

use crate::{
    bounded_array::BoundedArray,
    enumerant::{Enumerant, MaskEnumerant},
};

/// Number of bits in the set's word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// Maps members of `E` to bits of the set's word.
pub trait Encoding<E: Copy + 'static> {
    /// Every member that can be stored.
    fn members() -> &'static [E];

    fn bit(member: E) -> u64;
}

/// Member `m` occupies bit `m.index()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByIndex {}

/// Member `m` occupies the bits of `m.mask()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByMask {}

impl<E: Enumerant> Encoding<E> for ByIndex {
    fn members() -> &'static [E] {
        E::ALL
    }

    #[track_caller]
    fn bit(member: E) -> u64 {
        let index = member.index();
        let bit = u32::try_from(index)
            .ok()
            .and_then(|shift| 1_u64.checked_shl(shift));
        bit.unwrap_or_else(|| {
            diagnostic::report(Violation::IndexOutOfRange {
                index,
                len: WORD_BITS,
            });
            0
        })
    }
}

impl<E: MaskEnumerant> Encoding<E> for ByMask {
    fn members() -> &'static [E] {
        E::ALL
    }

    fn bit(member: E) -> u64 {
        member.mask()
    }
}

/// A set of members of `E`.
///
/// ```
/// use containers::{EnumSet, enumerant};
///
/// enumerant! {
///     enum Key { Left, Right, Fire }
/// }
///
/// let mut held = EnumSet::<Key>::new();
/// held.insert(Key::Left);
/// held.insert(Key::Fire);
/// assert!(held.contains(Key::Fire));
/// assert!(!held.contains(Key::Right));
/// assert_eq!(held.bits(), 0b101);
/// assert_eq!(held.to_dense_list(), [Key::Left, Key::Fire]);
/// ```
pub struct EnumSet<E, Enc = ByIndex> {
    bits: u64,
    _marker: PhantomData<(fn(E) -> E, Enc)>,
}

impl<E: Copy + 'static, Enc: Encoding<E>> EnumSet<E, Enc> {
    #[must_use]
    pub const fn new() -> Self {
        Self::from_bits(0)
    }

    /// Wraps a raw word. Bits that correspond to no member are kept.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    pub fn from_members(members: impl IntoIterator<Item = E>) -> Self {
        let mut set = Self::new();
        for member in members {
            set.insert(member);
        }
        set
    }

    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    #[track_caller]
    pub fn insert(&mut self, member: E) {
        self.bits |= Enc::bit(member);
    }

    #[track_caller]
    pub fn remove(&mut self, member: E) {
        self.bits &= !Enc::bit(member);
    }

    /// Returns `true` if every bit of `member` is set.
    #[track_caller]
    pub fn contains(&self, member: E) -> bool {
        let bit = Enc::bit(member);
        bit != 0 && self.bits & bit == bit
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of members in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self::from_bits(self.bits & other.bits)
    }

    /// Iterates over the members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        Enc::members()
            .iter()
            .copied()
            .filter(|member| self.contains(*member))
    }

    /// Copies the members into a bounded array with one slot per bit.
    #[must_use]
    pub fn to_dense_list(&self) -> BoundedArray<E, WORD_BITS> {
        let mut list = BoundedArray::new();
        for member in self.iter() {
            if list.push(member).is_err() {
                break;
            }
        }
        list
    }
}

impl<E: Copy + 'static, Enc: Encoding<E>> Default for EnumSet<E, Enc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, Enc> Clone for EnumSet<E, Enc> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, Enc> Copy for EnumSet<E, Enc> {}

impl<E, Enc> PartialEq for EnumSet<E, Enc> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<E, Enc> Eq for EnumSet<E, Enc> {}

impl<E, Enc> Hash for EnumSet<E, Enc> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<E: Copy + fmt::Debug + 'static, Enc: Encoding<E>> fmt::Debug for EnumSet<E, Enc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<E: Copy + 'static, Enc: Encoding<E>> FromIterator<E> for EnumSet<E, Enc> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_members(iter)
    }
}

impl<E: Copy + 'static, Enc: Encoding<E>> Extend<E> for EnumSet<E, Enc> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for member in iter {
            self.insert(member);
        }
    }
}

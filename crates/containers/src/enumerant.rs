//! Closed enumerations usable as container indices.

/// A closed enumeration whose members are numbered `0..COUNT`.
///
/// Implement it with the [`enumerant!`](crate::enumerant!) macro.
pub trait Enumerant: Copy + Eq + 'static {
    /// Number of members.
    const COUNT: usize;
    /// Every member, in index order.
    const ALL: &'static [Self];

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;
}

/// A closed enumeration whose members carry a pre-shifted bit mask.
///
/// Implement it with the [`mask_enumerant!`](crate::mask_enumerant!) macro.
pub trait MaskEnumerant: Copy + Eq + 'static {
    /// Every member, in declaration order.
    const ALL: &'static [Self];

    fn mask(self) -> u64;
}

/// Declares an enumeration and implements [`Enumerant`] for it.
///
/// ```
/// use containers::{Enumerant, enumerant};
///
/// enumerant! {
///     pub enum Layer {
///         Background,
///         World,
///         Interface,
///     }
/// }
///
/// assert_eq!(Layer::COUNT, 3);
/// assert_eq!(Layer::World.index(), 1);
/// assert_eq!(Layer::from_index(2), Some(Layer::Interface));
/// assert_eq!(Layer::from_index(3), None);
/// ```
#[macro_export]
macro_rules! enumerant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $crate::Enumerant for $name {
            const COUNT: usize = <Self as $crate::Enumerant>::ALL.len();
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Option<Self> {
                <Self as $crate::Enumerant>::ALL.get(index).copied()
            }
        }
    };
}

/// Declares an enumeration whose discriminants are bit masks and implements
/// [`MaskEnumerant`] for it.
///
/// ```
/// use containers::{MaskEnumerant, mask_enumerant};
///
/// mask_enumerant! {
///     pub enum Button {
///         Fire = 0x1,
///         Thrust = 0x4,
///     }
/// }
///
/// assert_eq!(Button::Thrust.mask(), 0x4);
/// ```
#[macro_export]
macro_rules! mask_enumerant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $mask:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u64)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant = $mask),+
        }

        impl $crate::MaskEnumerant for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn mask(self) -> u64 {
                self as u64
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::enumerant! {
        enum Axis {
            X,
            Y,
            Z,
        }
    }

    crate::mask_enumerant! {
        enum Flag {
            Low = 1 << 0,
            High = 1 << 63,
        }
    }

    #[test]
    fn test_enumerant_round_trip() {
        for (index, axis) in Axis::ALL.iter().enumerate() {
            assert_eq!(axis.index(), index);
            assert_eq!(Axis::from_index(index), Some(*axis));
        }
        assert_eq!(Axis::COUNT, 3);
    }

    #[test]
    fn test_mask_enumerant() {
        assert_eq!(Flag::Low.mask(), 1);
        assert_eq!(Flag::High.mask(), 1 << 63);
        assert_eq!(Flag::ALL.len(), 2);
    }
}

//! Allocator-aware containers with predictable growth and no undefined
//! behavior on misuse.
//!
//! | Container | Storage | Notes |
//! |-----------|---------|-------|
//! | [`DynArray`] | any [`Allocator`] | doubling growth, raw relocation |
//! | [`BoundedArray`] | inline | fails instead of growing |
//! | [`EnumArray`] | inline | indexed by an [`Enumerant`] |
//! | [`View`] / [`ViewMut`] | borrowed | no ownership |
//! | [`EnumSet`] | one `u64` | index or mask encoding |
//! | [`OwnedBox`] | any [`Allocator`] | nullable single owner |
//! | [`Optional`] | inline | explicit set/clear |
//!
//! Checked operations return [`Option`] or [`Result`]. Operations that are
//! given an invalid argument and have no failure channel report a
//! [`diagnostic::Violation`] and fall back to a neutral value.
//!
//! ```
//! use containers::{BoundedArray, DynArray, SliceExt as _};
//!
//! let mut scores = DynArray::<u32>::new();
//! for score in [30, 10, 20] {
//!     scores.push(score).unwrap();
//! }
//! assert_eq!(scores.find(&10), Some(1));
//!
//! let mut top = BoundedArray::<u32, 2>::new();
//! top.push(30).unwrap();
//! top.push(20).unwrap();
//! assert!(top.push(10).is_err());
//! ```
//!
//! [`Allocator`]: allocator::Allocator

#![cfg_attr(not(test), no_std)]

pub use self::{
    bounded_array::BoundedArray,
    boxed::OwnedBox,
    dyn_array::{DynArray, IntoIter},
    enum_array::EnumArray,
    enum_set::{ByIndex, ByMask, Encoding, EnumSet},
    enumerant::{Enumerant, MaskEnumerant},
    error::{AllocError, CapacityError, EmptyError, IndexOutOfBounds, InsertError},
    optional::Optional,
    slice_ext::SliceExt,
    view::{View, ViewMut},
};

mod bounded_array;
mod boxed;
mod dyn_array;
mod enum_array;
mod enum_set;
mod enumerant;
mod error;
mod optional;
mod slice_ext;
mod view;

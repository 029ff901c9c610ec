//! Shared error plumbing: caller locations for `snafu` errors, a
//! whatever-style error for binaries, and a source-chain formatter.
//!
//! Errors that record where they were raised implement [`Located`]. A
//! [`Report`] prints an error and its `source()` chain, and asks its
//! [`Locator`] for the location of every link:
//!
//! ```text
//! Error: failed to create memory context
//!   at crates/frame-demo/src/main.rs:144:10
//!
//! Caused by:
//!    0: failed to reserve 8388608 bytes of address space
//!       at crates/allocator/src/arena.rs:110:14
//!    1: failed to map 8388608 bytes: errno=12
//!       at crates/allocator/src/os/unix.rs:31:13
//! ```

#![no_std]

extern crate alloc;

use alloc::{boxed::Box, string::String};
use core::{error::Error, fmt, panic};

use snafu::{GenerateImplicitData, Snafu};

/// Source location captured where an error or diagnostic was raised.
///
/// Used as an implicit `snafu` field, so the location is filled in by
/// `context`, `ensure!` and `whatever!` without naming it:
///
/// ```
/// use snafu::{Snafu, ensure};
/// use snafu_utils::{Located, Location};
///
/// #[derive(Debug, Snafu)]
/// #[snafu(display("empty name"))]
/// struct EmptyName {
///     #[snafu(implicit)]
///     location: Location,
/// }
///
/// impl Located for EmptyName {
///     fn location(&self) -> Location {
///         self.location
///     }
/// }
///
/// fn check(name: &str) -> Result<(), EmptyName> {
///     ensure!(!name.is_empty(), EmptyNameSnafu);
///     Ok(())
/// }
///
/// let err = check("").unwrap_err();
/// assert!(err.location().file().ends_with(".rs"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static panic::Location<'static>);

impl Location {
    /// Location of the caller, following `#[track_caller]` frames.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Self(panic::Location::caller())
    }

    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.0.column()
    }
}

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self::caller()
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::caller()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An error that knows where it was raised.
pub trait Located {
    fn location(&self) -> Location;
}

/// Finds the location of one link of an error chain, if its type is known.
pub type Locator = fn(&(dyn Error + 'static)) -> Option<Location>;

/// Locates `error` if its concrete type is `T`.
///
/// Chain several calls with [`Option::or_else`] to build a [`Locator`] that
/// understands more than one error type.
pub fn locate_as<T>(error: &(dyn Error + 'static)) -> Option<Location>
where
    T: Error + Located + 'static,
{
    error.downcast_ref::<T>().map(Located::location)
}

/// Catch-all error for binaries, built with `snafu::whatever!` or
/// `whatever_context`.
#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct GenericError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn Error>, Some)))]
    source: Option<Box<dyn Error>>,
}

impl Located for GenericError {
    fn location(&self) -> Location {
        self.location
    }
}

/// Formats an error followed by every error in its `source()` chain.
///
/// Each link is followed by its location when the [`Locator`] recognizes
/// it. [`Report::new`] only recognizes [`GenericError`]; use
/// [`with_locator`](Self::with_locator) to add library error types.
pub struct Report<E> {
    error: E,
    locator: Locator,
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            locator: locate_as::<GenericError>,
        }
    }

    /// Replaces the function used to find the location of each link.
    #[must_use]
    pub fn with_locator(self, locator: Locator) -> Self {
        Self { locator, ..self }
    }

    pub fn into_inner(self) -> E {
        self.error
    }
}

impl<E> Report<E>
where
    E: Error + 'static,
{
    fn write_location(
        &self,
        f: &mut fmt::Formatter<'_>,
        error: &(dyn Error + 'static),
        indent: usize,
    ) -> fmt::Result {
        if let Some(location) = (self.locator)(error) {
            writeln!(f, "{:indent$}at {location}", "")?;
        }
        Ok(())
    }
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        self.write_location(f, &self.error, 2)?;

        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {s}")?;
            self.write_location(f, s, 6)?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

//! Page-granular memory obtained directly from the operating system.
//!
//! Address space is [`reserve`]d without backing, made usable with
//! [`commit`], and handed back with [`release`]. [`map`] combines reserve and
//! commit for callers that want a block of usable pages in one call.
//!
//! On Unix this is `mmap`/`mprotect`/`munmap`. Other targets fall back to the
//! process heap, where a reservation is fully backed up front and committing
//! is a no-op.

use core::ptr::NonNull;

use bitflags::bitflags;
use snafu::Snafu;
use snafu_utils::{Located, Location};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use self::unix as imp;
    } else {
        mod fallback;
        use self::fallback as imp;
    }
}

bitflags! {
    /// Access permissions of a range of pages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Protection: u32 {
        /// Pages can be read.
        const READ = 1 << 0;

        /// Pages can be written.
        const WRITE = 1 << 1;

        const RW = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Errors reported by the operating system page layer.
#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub(crate)))]
pub enum OsError {
    #[snafu(display("failed to map {size} bytes: errno={errno}"))]
    Map {
        size: usize,
        errno: i32,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to change protection of {size} bytes at {addr:#x} to {protection:?}: errno={errno}"))]
    Protect {
        addr: usize,
        size: usize,
        protection: Protection,
        errno: i32,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to unmap {size} bytes at {addr:#x}: errno={errno}"))]
    Unmap {
        addr: usize,
        size: usize,
        errno: i32,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for OsError {
    fn location(&self) -> Location {
        match self {
            Self::Map { location, .. }
            | Self::Protect { location, .. }
            | Self::Unmap { location, .. } => *location,
        }
    }
}

/// Returns the granularity of [`reserve`], [`commit`] and [`map`].
#[must_use]
pub fn page_size() -> usize {
    imp::page_size()
}

/// Reserves `size` bytes of address space with no access rights.
///
/// `size` must be a non-zero multiple of [`page_size`].
pub fn reserve(size: usize) -> Result<NonNull<u8>, OsError> {
    debug_assert!(size > 0 && size.is_multiple_of(page_size()));
    imp::map(size, Protection::empty())
}

/// Reserves and commits `size` bytes of readable and writable memory.
///
/// `size` must be a non-zero multiple of [`page_size`].
pub fn map(size: usize) -> Result<NonNull<u8>, OsError> {
    debug_assert!(size > 0 && size.is_multiple_of(page_size()));
    imp::map(size, Protection::RW)
}

/// Makes `size` bytes starting at `ptr` readable and writable.
///
/// # Safety
///
/// `ptr..ptr + size` must lie within a single region returned by
/// [`reserve`] or [`map`], and `ptr` must be page aligned.
pub unsafe fn commit(ptr: NonNull<u8>, size: usize) -> Result<(), OsError> {
    unsafe { imp::protect(ptr, size, Protection::RW) }
}

/// Returns a whole region to the operating system.
///
/// # Safety
///
/// `ptr` and `size` must describe exactly one region returned by
/// [`reserve`] or [`map`], and no reference into it may be used afterwards.
pub unsafe fn release(ptr: NonNull<u8>, size: usize) -> Result<(), OsError> {
    unsafe { imp::unmap(ptr, size) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
        assert!(page_size() >= 4096);
    }

    #[test]
    fn test_map_is_writable() {
        let size = page_size() * 2;
        let ptr = map(size).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0x33, size);
            assert_eq!(ptr.as_ptr().add(size - 1).read(), 0x33);
            release(ptr, size).unwrap();
        }
    }

    #[test]
    fn test_reserve_then_commit() {
        let page = page_size();
        let ptr = reserve(page * 4).unwrap();
        assert_eq!(ptr.addr().get() % page, 0);
        unsafe {
            commit(ptr, page).unwrap();
            ptr.as_ptr().write_bytes(0x55, page);
            assert_eq!(ptr.as_ptr().read(), 0x55);
            release(ptr, page * 4).unwrap();
        }
    }
}

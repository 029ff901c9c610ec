use alloc::alloc::{self as heap, Layout};
use core::ptr::NonNull;

use super::{OsError, Protection, os_error};

const PAGE_SIZE: usize = 4096;

pub(super) fn page_size() -> usize {
    PAGE_SIZE
}

fn layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size, PAGE_SIZE).ok()
}

pub(super) fn map(size: usize, _protection: Protection) -> Result<NonNull<u8>, OsError> {
    let Some(layout) = layout(size) else {
        return os_error::MapSnafu { size, errno: 0 }.fail();
    };
    let ptr = unsafe { heap::alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or_else(|| os_error::MapSnafu { size, errno: 0 }.build())
}

pub(super) unsafe fn protect(
    _ptr: NonNull<u8>,
    _size: usize,
    _protection: Protection,
) -> Result<(), OsError> {
    Ok(())
}

pub(super) unsafe fn unmap(ptr: NonNull<u8>, size: usize) -> Result<(), OsError> {
    let Some(layout) = layout(size) else {
        return os_error::UnmapSnafu {
            addr: ptr.addr().get(),
            size,
            errno: 0,
        }
        .fail();
    };
    unsafe { heap::dealloc(ptr.as_ptr(), layout) };
    Ok(())
}

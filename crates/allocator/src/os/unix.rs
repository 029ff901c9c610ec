use core::ptr::{self, NonNull};

use libc::c_int;
use snafu::ensure;

use super::{OsError, Protection, os_error};

const FALLBACK_PAGE_SIZE: usize = 4096;

pub(super) fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(size)
        .ok()
        .filter(|size| size.is_power_of_two())
        .unwrap_or(FALLBACK_PAGE_SIZE)
}

fn prot_bits(protection: Protection) -> c_int {
    let mut bits = libc::PROT_NONE;
    if protection.contains(Protection::READ) {
        bits |= libc::PROT_READ;
    }
    if protection.contains(Protection::WRITE) {
        bits |= libc::PROT_WRITE;
    }
    bits
}

fn errno() -> i32 {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))] {
            unsafe { *libc::__errno_location() }
        } else if #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))] {
            unsafe { *libc::__error() }
        } else {
            0
        }
    }
}

pub(super) fn map(size: usize, protection: Protection) -> Result<NonNull<u8>, OsError> {
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            prot_bits(protection),
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    ensure!(
        addr != libc::MAP_FAILED,
        os_error::MapSnafu {
            size,
            errno: errno()
        }
    );
    NonNull::new(addr.cast()).ok_or_else(|| os_error::MapSnafu { size, errno: 0 }.build())
}

pub(super) unsafe fn protect(
    ptr: NonNull<u8>,
    size: usize,
    protection: Protection,
) -> Result<(), OsError> {
    let ret = unsafe { libc::mprotect(ptr.as_ptr().cast(), size, prot_bits(protection)) };
    ensure!(
        ret == 0,
        os_error::ProtectSnafu {
            addr: ptr.addr().get(),
            size,
            protection,
            errno: errno(),
        }
    );
    Ok(())
}

pub(super) unsafe fn unmap(ptr: NonNull<u8>, size: usize) -> Result<(), OsError> {
    let ret = unsafe { libc::munmap(ptr.as_ptr().cast(), size) };
    ensure!(
        ret == 0,
        os_error::UnmapSnafu {
            addr: ptr.addr().get(),
            size,
            errno: errno(),
        }
    );
    Ok(())
}

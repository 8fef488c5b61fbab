//! Access to the calling thread's `errno`.
//!
//! The backend is loaded into a process that already has a libc, so errno is
//! the host's thread-local slot.

use std::ffi::c_int;

#[inline]
pub fn get_errno() -> c_int {
    // SAFETY: __errno_location always returns the calling thread's errno slot.
    unsafe { *libc::__errno_location() }
}

#[inline]
pub fn set_errno(val: c_int) {
    // SAFETY: same slot as above; writing an int is the documented use.
    unsafe { *libc::__errno_location() = val };
}

/// Snapshot of errno taken on entry to an NSS call.
#[derive(Debug, Clone, Copy)]
pub struct SavedErrno(c_int);

impl SavedErrno {
    pub fn capture() -> Self {
        Self(get_errno())
    }

    pub fn restore(self) {
        set_errno(self.0);
    }
}

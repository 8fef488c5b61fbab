//! NSS `services` database entry points of the `nisplus` backend.
//!
//! Records are packed into the caller's buffer by the core parser; the
//! `servent` fields point into that buffer. Misses (`NSS_STATUS_NOTFOUND`,
//! `NSS_STATUS_UNAVAIL`) leave `errno` as the caller had it.

use std::ffi::{CStr, c_char, c_int};

use frankenlibc_nisplus_core::errno;
use frankenlibc_nisplus_core::{LookupError, NssStatus, ServiceEntry};

use crate::backend;
use crate::errno_abi::SavedErrno;

/// Where a packed record landed inside the caller buffer.
struct Placement {
    name: usize,
    protocol: usize,
    aliases: usize,
    port_be: u16,
}

impl From<&ServiceEntry<'_>> for Placement {
    fn from(entry: &ServiceEntry<'_>) -> Self {
        Self {
            name: entry.name_offset(),
            protocol: entry.protocol_offset(),
            aliases: entry.alias_table_offset(),
            port_be: entry.port_be(),
        }
    }
}

#[inline]
unsafe fn set_errnop(errnop: *mut c_int, val: c_int) {
    if !errnop.is_null() {
        // SAFETY: non-null errnop is writable by NSS calling convention.
        unsafe { *errnop = val };
    }
}

/// Borrow the caller buffer as bytes.
///
/// # Safety
///
/// `buffer` must be valid for writes of `buflen` bytes for the duration of
/// the call.
unsafe fn caller_buffer<'b>(buffer: *mut c_char, buflen: usize) -> &'b mut [u8] {
    // SAFETY: guaranteed by the caller.
    unsafe { std::slice::from_raw_parts_mut(buffer.cast::<u8>(), buflen) }
}

/// Turn a lookup outcome into the NSS status, filling `result` on success.
///
/// # Safety
///
/// `result` must be a writable `servent`; `buffer` must be the buffer the
/// record was packed into.
unsafe fn complete(
    outcome: Result<Placement, LookupError>,
    result: *mut libc::servent,
    buffer: *mut c_char,
    errnop: *mut c_int,
    saved: SavedErrno,
) -> NssStatus {
    match outcome {
        Ok(placed) => {
            // SAFETY: result is non-null and writable by contract.
            let servent = unsafe { &mut *result };
            // SAFETY: offsets come from a record packed inside `buffer`.
            unsafe {
                servent.s_name = buffer.add(placed.name);
                servent.s_proto = buffer.add(placed.protocol);
                servent.s_aliases = buffer.add(placed.aliases).cast::<*mut c_char>();
            }
            servent.s_port = c_int::from(placed.port_be);
            NssStatus::Success
        }
        Err(err) => {
            match err.errno() {
                // SAFETY: errnop checked inside.
                Some(code) => unsafe { set_errnop(errnop, code) },
                None => saved.restore(),
            }
            err.nss_status()
        }
    }
}

/// Shared argument checks of the reentrant calls.
unsafe fn check_output(
    result: *mut libc::servent,
    buffer: *mut c_char,
    errnop: *mut c_int,
) -> Result<(), NssStatus> {
    if result.is_null() || buffer.is_null() {
        // SAFETY: errnop checked inside.
        unsafe { set_errnop(errnop, errno::EINVAL) };
        return Err(NssStatus::Unavail);
    }
    Ok(())
}

/// Text of a C string argument; `None` for NULL.
unsafe fn c_text<'a>(ptr: *const c_char) -> Option<Result<&'a str, std::str::Utf8Error>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null arguments are NUL-terminated by NSS calling convention.
    Some(unsafe { CStr::from_ptr(ptr) }.to_str())
}

/// `setservent`; `stay_open` has no meaning for this backend.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn _nss_nisplus_setservent(_stay_open: c_int) -> NssStatus {
    match backend::set_enumeration() {
        Ok(()) => NssStatus::Success,
        Err(err) => err.nss_status(),
    }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn _nss_nisplus_endservent() -> NssStatus {
    backend::end_enumeration();
    NssStatus::Success
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn _nss_nisplus_getservent_r(
    result: *mut libc::servent,
    buffer: *mut c_char,
    buflen: usize,
    errnop: *mut c_int,
) -> NssStatus {
    let saved = SavedErrno::capture();
    if let Err(status) = unsafe { check_output(result, buffer, errnop) } {
        return status;
    }
    // SAFETY: buffer is non-null and caller-owned for buflen bytes.
    let bytes = unsafe { caller_buffer(buffer, buflen) };
    let outcome = backend::next_service(bytes).map(|entry| Placement::from(&entry));
    unsafe { complete(outcome, result, buffer, errnop, saved) }
}

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn _nss_nisplus_getservbyname_r(
    name: *const c_char,
    protocol: *const c_char,
    result: *mut libc::servent,
    buffer: *mut c_char,
    buflen: usize,
    errnop: *mut c_int,
) -> NssStatus {
    let saved = SavedErrno::capture();
    // SAFETY: NULL handled; otherwise NUL-terminated by contract.
    let (Some(name), Some(protocol)) = (unsafe { c_text(name) }, unsafe { c_text(protocol) })
    else {
        unsafe { set_errnop(errnop, errno::EINVAL) };
        return NssStatus::NotFound;
    };
    if let Err(status) = unsafe { check_output(result, buffer, errnop) } {
        return status;
    }
    // Non-UTF-8 text cannot match a stored record.
    let (Ok(name), Ok(protocol)) = (name, protocol) else {
        saved.restore();
        return NssStatus::NotFound;
    };

    // SAFETY: buffer is non-null and caller-owned for buflen bytes.
    let bytes = unsafe { caller_buffer(buffer, buflen) };
    let outcome =
        backend::service_by_name(name, protocol, bytes).map(|entry| Placement::from(&entry));
    unsafe { complete(outcome, result, buffer, errnop, saved) }
}

/// `port` is in network byte order, as `getservbyport` receives it.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn _nss_nisplus_getservbyport_r(
    port: c_int,
    protocol: *const c_char,
    result: *mut libc::servent,
    buffer: *mut c_char,
    buflen: usize,
    errnop: *mut c_int,
) -> NssStatus {
    let saved = SavedErrno::capture();
    // SAFETY: NULL handled; otherwise NUL-terminated by contract.
    let Some(protocol) = (unsafe { c_text(protocol) }) else {
        unsafe { set_errnop(errnop, errno::EINVAL) };
        return NssStatus::NotFound;
    };
    if let Err(status) = unsafe { check_output(result, buffer, errnop) } {
        return status;
    }
    let Ok(protocol) = protocol else {
        saved.restore();
        return NssStatus::NotFound;
    };

    let port_host = u16::from_be(port as u16);
    // SAFETY: buffer is non-null and caller-owned for buflen bytes.
    let bytes = unsafe { caller_buffer(buffer, buflen) };
    let outcome =
        backend::service_by_port(port_host, protocol, bytes).map(|entry| Placement::from(&entry));
    unsafe { complete(outcome, result, buffer, errnop, saved) }
}

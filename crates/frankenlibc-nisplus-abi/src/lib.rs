//! # frankenlibc-nisplus-abi
//!
//! `extern "C"` boundary of the NIS+ services backend (`libnss_nisplus`).
//!
//! The glibc NSS dispatcher loads this `cdylib` and calls the
//! `_nss_nisplus_*servent*` entry points. Each entry point validates its raw
//! arguments, delegates to the safe implementation in
//! `frankenlibc-nisplus-core`, and converts the outcome into an
//! `enum nss_status` plus `*errnop`.
//!
//! ```text
//! NSS dispatcher -> services_abi (this crate) -> backend state -> core lookup/cursor
//! ```
//!
//! Symbols are exported unmangled only in release builds so that test
//! binaries keep linking against the host libc.

pub mod backend;
pub mod errno_abi;
pub mod services_abi;

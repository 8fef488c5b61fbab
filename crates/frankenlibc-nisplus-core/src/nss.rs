//! NSS dispatcher status codes and the NIS+ status translation table.

use crate::nis::NisStatus;

/// `enum nss_status` as the glibc dispatcher expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NssStatus {
    TryAgain = -2,
    Unavail = -1,
    NotFound = 0,
    Success = 1,
    Return = 2,
}

impl NssStatus {
    #[inline]
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Translate a NIS+ status into the dispatcher's vocabulary.
///
/// Codes outside the table map to `Unavail`.
pub fn niserr2nss(status: NisStatus) -> NssStatus {
    use NisStatus as N;
    match status {
        N::Success | N::SSuccess => NssStatus::Success,
        N::NotFound | N::UnknownObj | N::NoSuchName | N::Partial => NssStatus::NotFound,
        N::SNotFound | N::NameUnreachable | N::TryAgain | N::NoMemory => NssStatus::TryAgain,
        _ => NssStatus::Unavail,
    }
}

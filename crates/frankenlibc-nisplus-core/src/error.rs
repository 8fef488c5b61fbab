//! Outcome taxonomy shared by the point lookups and the enumeration cursor.
//!
//! Raw store statuses never leave this crate: they are folded into
//! [`LookupError`] at the lookup/cursor boundary, and the ABI layer turns a
//! `LookupError` into `(NssStatus, errno)`.

use crate::errno;
use crate::nis::NisStatus;
use crate::nss::NssStatus;
use crate::scope::ScopeError;

/// Why a transient failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The store answered with a retryable status.
    Store(NisStatus),
    /// No reply at all; carries the transport's errno.
    Transport { errno: i32 },
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(status) => write!(f, "store status {status}"),
            Self::Transport { errno } => write!(f, "transport errno {errno}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no matching service record")]
    NotFound,
    #[error("services table exhausted")]
    NoMoreRecords,
    #[error("buffer too small: {needed} bytes required")]
    RetryWithLargerBuffer { needed: usize },
    #[error("record store temporarily unavailable: {cause}")]
    TransientStoreFailure { cause: FailureCause },
    #[error("record store unavailable: {status}")]
    Unavailable { status: NisStatus },
    #[error("out of memory building the query scope")]
    OutOfMemory,
    #[error("invalid lookup argument")]
    InvalidArgument,
}

impl LookupError {
    /// Classify a non-success store status.
    ///
    /// `miss` is what a not-found status means at the call site:
    /// `NotFound` for point lookups, `NoMoreRecords` for enumeration.
    pub fn from_store_status(status: NisStatus, miss: LookupError) -> Self {
        match crate::nss::niserr2nss(status) {
            NssStatus::NotFound => miss,
            NssStatus::TryAgain => Self::TransientStoreFailure {
                cause: FailureCause::Store(status),
            },
            _ => Self::Unavailable { status },
        }
    }

    pub fn nss_status(&self) -> NssStatus {
        match self {
            Self::NotFound | Self::NoMoreRecords | Self::InvalidArgument => NssStatus::NotFound,
            Self::RetryWithLargerBuffer { .. }
            | Self::TransientStoreFailure { .. }
            | Self::OutOfMemory => NssStatus::TryAgain,
            Self::Unavailable { .. } => NssStatus::Unavail,
        }
    }

    /// Value for the NSS `errnop` out-parameter, if this outcome sets one.
    ///
    /// `None` means the caller's ambient errno must be left as it was
    /// before the call.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::NotFound | Self::Unavailable { .. } => None,
            Self::NoMoreRecords => Some(errno::ENOENT),
            Self::RetryWithLargerBuffer { .. } => Some(errno::ERANGE),
            Self::TransientStoreFailure {
                cause: FailureCause::Transport { errno },
            } => Some(*errno),
            Self::TransientStoreFailure { .. } => Some(errno::EAGAIN),
            Self::OutOfMemory => Some(errno::ENOMEM),
            Self::InvalidArgument => Some(errno::EINVAL),
        }
    }

    /// A miss that must restore the ambient error state.
    #[inline]
    pub fn restores_errno(&self) -> bool {
        self.errno().is_none()
    }
}

impl From<ScopeError> for LookupError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::OutOfMemory => Self::OutOfMemory,
            ScopeError::DomainUnavailable { errno } => Self::TransientStoreFailure {
                cause: FailureCause::Transport { errno },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_overflow_is_try_again_with_erange() {
        let err = LookupError::RetryWithLargerBuffer { needed: 64 };
        assert_eq!(err.nss_status(), NssStatus::TryAgain);
        assert_eq!(err.errno(), Some(errno::ERANGE));
    }

    #[test]
    fn misses_restore_errno() {
        assert!(LookupError::NotFound.restores_errno());
        assert!(
            LookupError::Unavailable {
                status: NisStatus::NoSuchTable
            }
            .restores_errno()
        );
        assert!(!LookupError::NoMoreRecords.restores_errno());
    }

    #[test]
    fn store_status_classification() {
        assert_eq!(
            LookupError::from_store_status(NisStatus::NotFound, LookupError::NoMoreRecords),
            LookupError::NoMoreRecords
        );
        assert_eq!(
            LookupError::from_store_status(NisStatus::TryAgain, LookupError::NotFound),
            LookupError::TransientStoreFailure {
                cause: FailureCause::Store(NisStatus::TryAgain)
            }
        );
        assert_eq!(
            LookupError::from_store_status(NisStatus::Permission, LookupError::NotFound),
            LookupError::Unavailable {
                status: NisStatus::Permission
            }
        );
    }

    #[test]
    fn transport_errno_is_preserved() {
        let err = LookupError::TransientStoreFailure {
            cause: FailureCause::Transport { errno: 111 },
        };
        assert_eq!(err.errno(), Some(111));
        assert_eq!(err.nss_status(), NssStatus::TryAgain);
    }

    #[test]
    fn scope_errors_translate() {
        assert_eq!(
            LookupError::from(ScopeError::OutOfMemory),
            LookupError::OutOfMemory
        );
        assert_eq!(LookupError::OutOfMemory.errno(), Some(errno::ENOMEM));
    }
}

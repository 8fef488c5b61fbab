//! Enumeration cursor behind `setservent`/`getservent_r`/`endservent`.
//!
//! The cursor keeps the last page it consumed; that page's cookie is the
//! resume point. A freshly fetched page only replaces it once the page has
//! been packed successfully, so a `RetryWithLargerBuffer` (or a store
//! failure) leaves the position untouched and the next call fetches the same
//! record again.
//!
//! `ServiceCursor` is plain state. The ABI layer keeps one instance per
//! process behind a mutex, so concurrent `getservent_r` calls serialize.

use tracing::{debug, warn};

use crate::config::PortPolicy;
use crate::error::{FailureCause, LookupError};
use crate::nis::NisResult;
use crate::servent::{InsufficientSpace, ServiceEntry, ServiceGroup};
use crate::store::{RecordStore, TransportError};

#[derive(Debug, Default)]
enum CursorState {
    #[default]
    Closed,
    /// `held` is the last consumed page, `None` before the first record.
    Open { held: Option<NisResult> },
    /// The store reported the end of the table.
    Exhausted,
}

#[derive(Debug, Default)]
pub struct ServiceCursor {
    state: CursorState,
}

impl ServiceCursor {
    pub const fn new() -> Self {
        Self {
            state: CursorState::Closed,
        }
    }

    /// Drop any held page and restart from the first entry.
    pub fn open(&mut self) {
        self.state = CursorState::Open { held: None };
    }

    pub fn close(&mut self) {
        self.state = CursorState::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, CursorState::Closed)
    }

    /// Whether a page (and so a resume cookie) is currently held.
    pub fn holds_page(&self) -> bool {
        matches!(self.state, CursorState::Open { held: Some(_) })
    }

    /// Pack the next services entry of `table` into `buffer`.
    ///
    /// A closed cursor opens itself. Pages that are not services entries are
    /// skipped; their cookies still advance the position.
    pub fn next<'b, S>(
        &mut self,
        store: &S,
        table: &str,
        buffer: &'b mut [u8],
        policy: PortPolicy,
    ) -> Result<ServiceEntry<'b>, LookupError>
    where
        S: RecordStore + ?Sized,
    {
        let mut fallback = match std::mem::take(&mut self.state) {
            CursorState::Exhausted => {
                self.state = CursorState::Exhausted;
                return Err(LookupError::NoMoreRecords);
            }
            CursorState::Closed => None,
            CursorState::Open { held } => held,
        };

        let group = loop {
            let reply = match &fallback {
                None => store.first_entry(table),
                Some(prev) => store.next_entry(table, &prev.cookie),
            };
            let reply = match reply {
                Ok(reply) => reply,
                Err(TransportError { errno }) => {
                    warn!(%table, errno, "services enumeration: no reply from store");
                    self.state = CursorState::Open { held: fallback };
                    return Err(LookupError::TransientStoreFailure {
                        cause: FailureCause::Transport { errno },
                    });
                }
            };

            if !reply.status.is_success() {
                let err = LookupError::from_store_status(reply.status, LookupError::NoMoreRecords);
                if err == LookupError::NoMoreRecords {
                    self.state = CursorState::Exhausted;
                } else {
                    warn!(%table, status = %reply.status, "services enumeration: store failure");
                    self.state = CursorState::Open { held: fallback };
                }
                return Err(err);
            }

            match ServiceGroup::validate(reply, policy) {
                Ok(group) => break group,
                Err(skipped) => {
                    debug!(%table, "services enumeration: skipping page that is not a services entry");
                    fallback = Some(skipped);
                }
            }
        };

        match group.pack(buffer) {
            Ok(entry) => {
                self.state = CursorState::Open {
                    held: Some(group.into_result()),
                };
                Ok(entry)
            }
            Err(InsufficientSpace { needed }) => {
                self.state = CursorState::Open { held: fallback };
                Err(LookupError::RetryWithLargerBuffer { needed })
            }
        }
    }
}

//! Record store seam.
//!
//! The backend only needs three directory primitives: an indexed list query
//! and the two paging calls. Anything answering them (an RPC client, a
//! fixture table) can serve the services table.

pub mod dump;
pub mod memory;

pub use dump::{ColumnSpec, DumpError, TableDump};
pub use memory::MemoryTable;

use crate::nis::{Cookie, NisResult};

/// The query produced no reply at all (`nis_list` returning NULL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("record store transport failure (errno {errno})")]
pub struct TransportError {
    pub errno: i32,
}

pub trait RecordStore: Send + Sync {
    /// All objects matching an indexed name such as `[name=ftp,proto=tcp],T`.
    fn list(&self, indexed_name: &str) -> Result<NisResult, TransportError>;

    /// First object of `table`, with a cookie for the next one.
    fn first_entry(&self, table: &str) -> Result<NisResult, TransportError>;

    /// Object after the one `cookie` was issued for. End of table is a
    /// `NotFound` status.
    fn next_entry(&self, table: &str, cookie: &Cookie) -> Result<NisResult, TransportError>;
}

//! # frankenlibc-nisplus-core
//!
//! Safe implementation of the NIS+ `services` name-service backend.
//!
//! The ABI crate owns the C boundary (`struct servent`, errno, symbol
//! export). Everything here works on byte slices and typed results:
//!
//! ```text
//! scope (services.org_dir.<domain>)
//!   -> lookup::{find_by_name, find_by_port} | cursor::ServiceCursor
//!     -> servent::parse_servent (packs into the caller buffer)
//! ```
//!
//! The record store is a trait (`store::RecordStore`) so the transport can be
//! swapped; `store::MemoryTable` is the in-process implementation used by the
//! harness and tests.

#![deny(unsafe_code)]

pub mod config;
pub mod cursor;
pub mod errno;
pub mod error;
pub mod lookup;
pub mod nis;
pub mod nss;
pub mod scope;
pub mod servent;
pub mod store;

pub use config::{BackendConfig, PortPolicy};
pub use cursor::ServiceCursor;
pub use error::{FailureCause, LookupError};
pub use lookup::{find_by_name, find_by_port};
pub use nis::{Cookie, NisObject, NisResult, NisStatus, ObjectKind};
pub use nss::NssStatus;
pub use scope::{ScopeError, TableScope};
pub use servent::{ParseOutcome, ServiceEntry, parse_servent};
pub use store::{MemoryTable, RecordStore, TransportError};

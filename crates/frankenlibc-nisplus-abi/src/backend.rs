//! Process-wide backend state shared by the services entry points.
//!
//! * the query scope (`services.org_dir.<domain>`), resolved once;
//! * the enumeration cursor, behind a mutex;
//! * the record store: an installed override, or the JSON table dump named
//!   by `FRANKENLIBC_NISPLUS_TABLE_PATH`, reloaded when the file changes.
//!
//! A reload bumps the store generation; an enumeration that started on an
//! older generation restarts from the first entry.

use std::ffi::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use frankenlibc_nisplus_core::errno;
use frankenlibc_nisplus_core::scope::normalize_local_directory;
use frankenlibc_nisplus_core::{
    BackendConfig, LookupError, MemoryTable, NisStatus, RecordStore, ScopeError, ServiceCursor,
    ServiceEntry, TableScope, find_by_name, find_by_port,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errno_abi;

static SCOPE: TableScope = TableScope::new();

static ENUMERATION: Mutex<Enumeration> = parking_lot::const_mutex(Enumeration {
    cursor: ServiceCursor::new(),
    generation: 0,
});

static STORE: Mutex<StoreState> = parking_lot::const_mutex(StoreState {
    installed: None,
    loaded: None,
    generation: 0,
});

struct Enumeration {
    cursor: ServiceCursor,
    /// Store generation the cursor's position belongs to.
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct LoadedTable {
    path: PathBuf,
    fingerprint: Fingerprint,
    table: Arc<MemoryTable>,
}

struct StoreState {
    installed: Option<Arc<dyn RecordStore>>,
    loaded: Option<LoadedTable>,
    generation: u64,
}

/// A store plus the generation it was published under.
#[derive(Clone)]
pub struct StoreHandle {
    pub store: Arc<dyn RecordStore>,
    pub generation: u64,
}

/// Serve every query from `store` until [`clear_installed_store`].
pub fn install_store(store: Arc<dyn RecordStore>) {
    let mut state = STORE.lock();
    state.installed = Some(store);
    state.generation += 1;
}

pub fn clear_installed_store() {
    let mut state = STORE.lock();
    if state.installed.take().is_some() {
        state.generation += 1;
    }
}

/// Current store, reloading the table dump if it changed on disk.
///
/// `None` when no store is installed and no usable dump is configured.
pub fn current_store(config: &BackendConfig) -> Option<StoreHandle> {
    let mut state = STORE.lock();
    if let Some(store) = &state.installed {
        return Some(StoreHandle {
            store: Arc::clone(store),
            generation: state.generation,
        });
    }

    let Some(path) = config.table_path.as_deref() else {
        state.loaded = None;
        return None;
    };
    let fingerprint = match Fingerprint::of(path) {
        Ok(fp) => fp,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "services table dump unavailable");
            state.loaded = None;
            return None;
        }
    };

    if let Some(loaded) = &state.loaded
        && loaded.path == path
        && loaded.fingerprint == fingerprint
    {
        return Some(StoreHandle {
            store: loaded.table.clone(),
            generation: state.generation,
        });
    }

    match MemoryTable::from_dump_file(path) {
        Ok(table) => {
            debug!(path = %path.display(), rows = table.len(), "services table dump loaded");
            let table = Arc::new(table);
            state.loaded = Some(LoadedTable {
                path: path.to_path_buf(),
                fingerprint,
                table: Arc::clone(&table),
            });
            state.generation += 1;
            Some(StoreHandle {
                store: table,
                generation: state.generation,
            })
        }
        Err(err) => {
            warn!(error = %err, "services table dump rejected");
            state.loaded = None;
            None
        }
    }
}

fn no_store() -> LookupError {
    LookupError::Unavailable {
        status: NisStatus::NoSuchTable,
    }
}

/// Local NIS+ directory: the configured one, else the host's domain name.
fn local_directory(config: &BackendConfig) -> Result<String, ScopeError> {
    if let Some(dir) = &config.local_directory {
        return Ok(normalize_local_directory(dir));
    }
    let mut raw = [0u8; 256];
    // SAFETY: `raw` is writable for its full length.
    let rc = unsafe { libc::getdomainname(raw.as_mut_ptr().cast::<c_char>(), raw.len()) };
    if rc != 0 {
        return Err(ScopeError::DomainUnavailable {
            errno: errno_abi::get_errno(),
        });
    }
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let domain = std::str::from_utf8(&raw[..end]).map_err(|_| ScopeError::DomainUnavailable {
        errno: errno::EINVAL,
    })?;
    Ok(normalize_local_directory(domain))
}

/// The services table name, resolving it on first use.
pub fn table_name(config: &BackendConfig) -> Result<&'static str, ScopeError> {
    SCOPE.ensure_with(|| local_directory(config))
}

/// `setservent`: rewind the enumeration and make sure the scope exists.
pub fn set_enumeration() -> Result<(), LookupError> {
    let config = BackendConfig::from_env();
    let mut enumeration = ENUMERATION.lock();
    enumeration.cursor.open();
    table_name(&config)?;
    Ok(())
}

/// `endservent`: release the held page.
pub fn end_enumeration() {
    ENUMERATION.lock().cursor.close();
}

/// `getservent_r`: pack the next record into `buffer`.
pub fn next_service(buffer: &mut [u8]) -> Result<ServiceEntry<'_>, LookupError> {
    let config = BackendConfig::from_env();
    let mut enumeration = ENUMERATION.lock();
    let table = table_name(&config)?;
    let handle = current_store(&config).ok_or_else(no_store)?;
    if handle.generation != enumeration.generation {
        if enumeration.cursor.holds_page() {
            debug!(generation = handle.generation, "services store changed; restarting enumeration");
            enumeration.cursor.open();
        }
        enumeration.generation = handle.generation;
    }
    enumeration
        .cursor
        .next(handle.store.as_ref(), table, buffer, config.port_policy)
}

/// `getservbyname_r`.
pub fn service_by_name<'b>(
    name: &str,
    protocol: &str,
    buffer: &'b mut [u8],
) -> Result<ServiceEntry<'b>, LookupError> {
    let config = BackendConfig::from_env();
    let table = table_name(&config)?;
    let handle = current_store(&config).ok_or_else(no_store)?;
    find_by_name(
        handle.store.as_ref(),
        table,
        name,
        protocol,
        buffer,
        config.port_policy,
    )
}

/// `getservbyport_r`; `port` in host byte order.
pub fn service_by_port<'b>(
    port: u16,
    protocol: &str,
    buffer: &'b mut [u8],
) -> Result<ServiceEntry<'b>, LookupError> {
    let config = BackendConfig::from_env();
    let table = table_name(&config)?;
    let handle = current_store(&config).ok_or_else(no_store)?;
    find_by_port(
        handle.store.as_ref(),
        table,
        port,
        protocol,
        buffer,
        config.port_policy,
    )
}

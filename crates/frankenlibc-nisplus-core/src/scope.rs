//! Query scope: the fully qualified name of the services table.
//!
//! Built once from the local NIS+ directory and never modified afterwards.
//! Readers go through `OnceLock::get`, so after publication no lock is taken.

use std::sync::OnceLock;

/// Every services query is issued under `services.org_dir.<local directory>`.
pub const SERVICES_TABLE_PREFIX: &str = "services.org_dir.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("cannot allocate the services table name")]
    OutOfMemory,
    #[error("local NIS+ directory unavailable (errno {errno})")]
    DomainUnavailable { errno: i32 },
}

/// Process-wide, set-once table name.
#[derive(Debug, Default)]
pub struct TableScope {
    name: OnceLock<String>,
}

impl TableScope {
    pub const fn new() -> Self {
        Self {
            name: OnceLock::new(),
        }
    }

    /// The published table name, if resolution already happened.
    pub fn get(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Resolve the scope on first use.
    ///
    /// `local_directory` is only called while the cell is empty. Concurrent
    /// first callers may each build a candidate, but exactly one is published
    /// and every caller gets that one back.
    pub fn ensure_with<F>(&self, local_directory: F) -> Result<&str, ScopeError>
    where
        F: FnOnce() -> Result<String, ScopeError>,
    {
        if let Some(name) = self.name.get() {
            return Ok(name);
        }
        let candidate = build_table_name(&local_directory()?)?;
        let published = self.name.get_or_init(|| candidate);
        tracing::debug!(table = %published, "services table scope resolved");
        Ok(published)
    }
}

/// `services.org_dir.` followed by the local directory.
pub fn build_table_name(local_directory: &str) -> Result<String, ScopeError> {
    let mut name = String::new();
    name.try_reserve_exact(SERVICES_TABLE_PREFIX.len() + local_directory.len())
        .map_err(|_| ScopeError::OutOfMemory)?;
    name.push_str(SERVICES_TABLE_PREFIX);
    name.push_str(local_directory);
    Ok(name)
}

/// Normalize a domain name into NIS+ directory form (trailing `.`).
///
/// Linux reports an unset domain as `(none)`; that and the empty string both
/// mean "no local directory".
pub fn normalize_local_directory(domain: &str) -> String {
    let domain = domain.trim();
    if domain.is_empty() || domain == "(none)" {
        return String::new();
    }
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{domain}.")
    }
}

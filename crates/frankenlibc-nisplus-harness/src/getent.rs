//! `getent services`-style queries against a table dump.
//!
//! Drives the same core lookups and cursor the NSS entry points use, with a
//! heap buffer that grows whenever the parser asks for more room.

use frankenlibc_nisplus_core::scope::{build_table_name, normalize_local_directory};
use frankenlibc_nisplus_core::servent::ServiceRecord;
use frankenlibc_nisplus_core::store::DumpError;
use frankenlibc_nisplus_core::{
    LookupError, MemoryTable, PortPolicy, ScopeError, ServiceCursor, find_by_name, find_by_port,
};
use tracing::debug;

/// Largest buffer the driver will grow to.
pub const MAX_BUFFER: usize = 1 << 20;

#[derive(Debug, thiserror::Error)]
pub enum GetentError {
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("record needs more than {limit} bytes of buffer")]
    BufferLimit { limit: usize },
    #[error("cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GetentError {
    /// getent convention: 2 when the key was not found, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Lookup(LookupError::NotFound | LookupError::InvalidArgument) => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    List,
    Name { name: String, protocol: String },
    Port { port: u16, protocol: String },
}

#[derive(Debug)]
pub struct Getent {
    store: MemoryTable,
    table: String,
    buffer_size: usize,
    policy: PortPolicy,
}

impl Getent {
    /// `domain` overrides the directory; by default the dump's own table name
    /// is queried.
    pub fn new(
        store: MemoryTable,
        domain: Option<&str>,
        buffer_size: usize,
        policy: PortPolicy,
    ) -> Result<Self, GetentError> {
        let table = match domain {
            Some(domain) => build_table_name(&normalize_local_directory(domain))?,
            None => store.name().to_string(),
        };
        Ok(Self {
            store,
            table,
            buffer_size: buffer_size.max(1),
            policy,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn run(&self, query: &Query) -> Result<Vec<ServiceRecord>, GetentError> {
        match query {
            Query::List => self.list(),
            Query::Name { name, protocol } => {
                let record = self.with_growing_buffer(|buf| {
                    find_by_name(&self.store, &self.table, name, protocol, buf, self.policy)
                        .map(|entry| entry.to_record())
                })?;
                Ok(vec![record])
            }
            Query::Port { port, protocol } => {
                let record = self.with_growing_buffer(|buf| {
                    find_by_port(&self.store, &self.table, *port, protocol, buf, self.policy)
                        .map(|entry| entry.to_record())
                })?;
                Ok(vec![record])
            }
        }
    }

    fn list(&self) -> Result<Vec<ServiceRecord>, GetentError> {
        let mut cursor = ServiceCursor::new();
        cursor.open();
        let mut records = Vec::new();
        loop {
            let next = self.with_growing_buffer(|buf| {
                cursor
                    .next(&self.store, &self.table, buf, self.policy)
                    .map(|entry| entry.to_record())
            });
            match next {
                Ok(record) => records.push(record),
                Err(GetentError::Lookup(LookupError::NoMoreRecords)) => break,
                Err(err) => return Err(err),
            }
        }
        cursor.close();
        Ok(records)
    }

    /// Call `attempt` with a buffer, doubling it on `RetryWithLargerBuffer`.
    fn with_growing_buffer<F>(&self, mut attempt: F) -> Result<ServiceRecord, GetentError>
    where
        F: FnMut(&mut [u8]) -> Result<ServiceRecord, LookupError>,
    {
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            match attempt(&mut buffer) {
                Err(LookupError::RetryWithLargerBuffer { needed }) => {
                    if needed > MAX_BUFFER {
                        return Err(GetentError::BufferLimit { limit: MAX_BUFFER });
                    }
                    let grown = buffer.len().saturating_mul(2).max(needed).min(MAX_BUFFER);
                    // Already at the cap and still short.
                    if grown <= buffer.len() {
                        return Err(GetentError::BufferLimit { limit: MAX_BUFFER });
                    }
                    debug!(from = buffer.len(), to = grown, needed, "growing record buffer");
                    buffer.resize(grown, 0);
                }
                other => return other.map_err(GetentError::from),
            }
        }
    }
}

/// One getent line: `name port/proto alias...`.
pub fn render_line(record: &ServiceRecord) -> String {
    let mut line = format!("{:<21} {}/{}", record.name, record.port, record.protocol);
    for alias in &record.aliases {
        line.push(' ');
        line.push_str(alias);
    }
    line
}

pub fn render_json(records: &[ServiceRecord]) -> Result<String, GetentError> {
    Ok(serde_json::to_string_pretty(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "services.org_dir.example.org.";

    fn getent(buffer_size: usize) -> Getent {
        let table = MemoryTable::services(TABLE)
            .with_row(["http", "http", "tcp", "80"])
            .with_row(["http", "www", "tcp", "80"])
            .with_row(["http", "www-http", "tcp", "80"]);
        Getent::new(table, None, buffer_size, PortPolicy::default()).expect("table name")
    }

    #[test]
    fn tiny_buffer_grows_until_record_fits() {
        let records = getent(1)
            .run(&Query::Name {
                name: "www".into(),
                protocol: "tcp".into(),
            })
            .expect("hit");
        assert_eq!(records[0].name, "http");
        assert_eq!(records[0].aliases, vec!["www", "www-http"]);
    }

    #[test]
    fn domain_overrides_dump_name() {
        let g = Getent::new(MemoryTable::services(TABLE), Some("other.org"), 64, PortPolicy::default())
            .expect("table name");
        assert_eq!(g.table(), "services.org_dir.other.org.");
    }

    #[test]
    fn not_found_exits_with_two() {
        let err = getent(64)
            .run(&Query::Port {
                port: 70,
                protocol: "tcp".into(),
            })
            .expect_err("no gopher");
        assert_eq!(err.exit_code(), 2);
    }

    fn getent_with_alias_len(alias_len: usize, buffer_size: usize) -> Getent {
        let table = MemoryTable::services(TABLE)
            .with_row(["big", "big", "tcp", "8080"].map(String::from))
            .with_row(["big".to_string(), "a".repeat(alias_len), "tcp".into(), "8080".into()]);
        Getent::new(table, None, buffer_size, PortPolicy::default()).expect("table name")
    }

    #[test]
    fn growth_clamps_to_limit_instead_of_failing() {
        // Doubling 600 KB overshoots the cap, but the record itself fits under it.
        let records = getent_with_alias_len(700_000, 600_000)
            .run(&Query::Port {
                port: 8080,
                protocol: "tcp".into(),
            })
            .expect("fits under the cap");
        assert_eq!(records[0].name, "big");
        assert_eq!(records[0].aliases[0].len(), 700_000);
    }

    #[test]
    fn record_larger_than_limit_is_refused() {
        let err = getent_with_alias_len(MAX_BUFFER + 1, 64)
            .run(&Query::Port {
                port: 8080,
                protocol: "tcp".into(),
            })
            .expect_err("over the cap");
        assert!(matches!(err, GetentError::BufferLimit { limit: MAX_BUFFER }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn line_format_matches_getent() {
        let record = ServiceRecord {
            name: "http".into(),
            aliases: vec!["www".into()],
            port: 80,
            protocol: "tcp".into(),
        };
        assert_eq!(render_line(&record), format!("{:<21} 80/tcp www", "http"));
    }
}

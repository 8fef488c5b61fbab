//! Point lookups: `getservbyname_r` and `getservbyport_r`.
//!
//! Lookup by name takes two hops. The first query matches the `name` column,
//! which also holds aliases; the second re-queries by the hit's canonical
//! name so the packed record carries the whole alias group of that service.

use tracing::debug;

use crate::config::PortPolicy;
use crate::error::{FailureCause, LookupError};
use crate::nis::indexed_name::is_plain_value;
use crate::nis::{IndexedName, NisResult};
use crate::servent::{COL_CNAME, ParseOutcome, ServiceEntry, is_services_entry, parse_servent};
use crate::store::{RecordStore, TransportError};

fn query<S>(store: &S, name: &IndexedName) -> Result<NisResult, LookupError>
where
    S: RecordStore + ?Sized,
{
    let indexed = name.to_string();
    store.list(&indexed).map_err(|TransportError { errno }| {
        debug!(query = %indexed, errno, "services lookup: no reply from store");
        LookupError::TransientStoreFailure {
            cause: FailureCause::Transport { errno },
        }
    })
}

fn pack<'b>(
    reply: &NisResult,
    buffer: &'b mut [u8],
    policy: PortPolicy,
) -> Result<ServiceEntry<'b>, LookupError> {
    if !reply.status.is_success() {
        return Err(LookupError::from_store_status(reply.status, LookupError::NotFound));
    }
    match parse_servent(reply, buffer, policy) {
        ParseOutcome::Record(entry) => Ok(entry),
        ParseOutcome::NoMatch => Err(LookupError::NotFound),
        ParseOutcome::InsufficientSpace { needed } => {
            Err(LookupError::RetryWithLargerBuffer { needed })
        }
    }
}

fn check_value(value: &str) -> Result<(), LookupError> {
    if is_plain_value(value) {
        Ok(())
    } else {
        Err(LookupError::InvalidArgument)
    }
}

/// Resolve a service by name or alias.
pub fn find_by_name<'b, S>(
    store: &S,
    table: &str,
    name: &str,
    protocol: &str,
    buffer: &'b mut [u8],
    policy: PortPolicy,
) -> Result<ServiceEntry<'b>, LookupError>
where
    S: RecordStore + ?Sized,
{
    check_value(name)?;
    check_value(protocol)?;

    let by_alias = IndexedName::new(table)
        .with("name", name)
        .with("proto", protocol);
    let first = query(store, &by_alias)?;

    let canonical = if is_services_entry(&first) {
        match first.first().and_then(|row| row.column_text(COL_CNAME)) {
            Some(cname) => match std::str::from_utf8(cname) {
                Ok(cname) => Some(cname),
                // Cannot be expressed as a query value, so the group is unreachable.
                Err(_) => {
                    debug!(%name, %protocol, "services lookup: canonical name is not UTF-8");
                    return Err(LookupError::NotFound);
                }
            },
            None => None,
        }
    } else {
        debug!(%name, %protocol, status = %first.status, "services lookup: falling back to cname");
        None
    };
    let cname = canonical.unwrap_or(name);
    // A canonical name read back from the store still has to be a valid criterion.
    check_value(cname)?;

    let by_cname = IndexedName::new(table)
        .with("cname", cname)
        .with("proto", protocol);
    let group = query(store, &by_cname)?;
    pack(&group, buffer, policy)
}

/// Resolve a service by port (host byte order) and protocol.
pub fn find_by_port<'b, S>(
    store: &S,
    table: &str,
    port: u16,
    protocol: &str,
    buffer: &'b mut [u8],
    policy: PortPolicy,
) -> Result<ServiceEntry<'b>, LookupError>
where
    S: RecordStore + ?Sized,
{
    check_value(protocol)?;
    let by_port = IndexedName::new(table)
        .with("port", port.to_string())
        .with("proto", protocol);
    let reply = query(store, &by_port)?;
    pack(&reply, buffer, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nis::NisStatus;
    use crate::store::MemoryTable;

    const TABLE: &str = "services.org_dir.example.org.";

    fn table() -> MemoryTable {
        MemoryTable::services(TABLE)
            .with_row(["http", "http", "tcp", "80"])
            .with_row(["http", "www", "tcp", "80"])
            .with_row(["domain", "domain", "udp", "53"])
    }

    fn aliases(entry: &ServiceEntry<'_>) -> Vec<Vec<u8>> {
        entry.aliases().map(<[u8]>::to_vec).collect()
    }

    #[test]
    fn alias_resolves_to_canonical_group() {
        let t = table();
        let mut buf = [0u8; 256];
        let entry = find_by_name(&t, TABLE, "www", "tcp", &mut buf, PortPolicy::default())
            .expect("alias hit");
        assert_eq!(entry.name(), b"http");
        assert_eq!(entry.port(), 80);
        assert_eq!(aliases(&entry), vec![b"www".to_vec()]);
    }

    #[test]
    fn canonical_name_hits_directly() {
        let t = table();
        let mut buf = [0u8; 256];
        let entry = find_by_name(&t, TABLE, "domain", "udp", &mut buf, PortPolicy::default())
            .expect("hit");
        assert_eq!(entry.protocol(), b"udp");
        assert_eq!(entry.alias_count(), 0);
    }

    #[test]
    fn wrong_protocol_is_not_found() {
        let t = table();
        let mut buf = [0u8; 256];
        let err = find_by_name(&t, TABLE, "domain", "tcp", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("no tcp row");
        assert_eq!(err, LookupError::NotFound);
    }

    #[test]
    fn by_port_uses_port_and_protocol() {
        let t = table();
        let mut buf = [0u8; 256];
        let entry = find_by_port(&t, TABLE, 80, "tcp", &mut buf, PortPolicy::default())
            .expect("hit");
        assert_eq!(entry.name(), b"http");
        assert_eq!(aliases(&entry), vec![b"www".to_vec()]);

        let err = find_by_port(&t, TABLE, 80, "udp", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("no udp row");
        assert_eq!(err, LookupError::NotFound);
    }

    #[test]
    fn small_buffer_asks_for_more() {
        let t = table();
        let mut buf = [0u8; 8];
        let err = find_by_name(&t, TABLE, "www", "tcp", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("too small");
        let LookupError::RetryWithLargerBuffer { needed } = err else {
            panic!("unexpected {err}");
        };
        let mut exact = vec![0u8; needed + 16];
        assert!(find_by_name(&t, TABLE, "www", "tcp", &mut exact, PortPolicy::default()).is_ok());
    }

    #[test]
    fn delimiters_in_values_are_rejected() {
        let t = table();
        let mut buf = [0u8; 64];
        let err = find_by_name(&t, TABLE, "http,x", "tcp", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("comma");
        assert_eq!(err, LookupError::InvalidArgument);
        let err = find_by_port(&t, TABLE, 80, "tcp]", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("bracket");
        assert_eq!(err, LookupError::InvalidArgument);
    }

    #[test]
    fn foreign_table_is_unavailable() {
        let t = table();
        let mut buf = [0u8; 64];
        let err = find_by_port(&t, "services.org_dir.other.", 80, "tcp", &mut buf, PortPolicy::default())
            .map(|e| e.port())
            .expect_err("wrong table");
        assert_eq!(
            err,
            LookupError::Unavailable {
                status: NisStatus::NoSuchTable
            }
        );
    }
}

//! Point lookups through the public API, including the query sequence.

use std::sync::Mutex;

use frankenlibc_nisplus_core::{
    Cookie, FailureCause, LookupError, MemoryTable, NisObject, NisResult, NssStatus, PortPolicy,
    RecordStore, TransportError, find_by_name, find_by_port,
};

const TABLE: &str = "services.org_dir.example.org.";

/// Records every indexed name it is asked for.
struct RecordingStore {
    inner: MemoryTable,
    queries: Mutex<Vec<String>>,
    down: bool,
}

impl RecordingStore {
    fn new(inner: MemoryTable) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
            down: false,
        }
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl RecordStore for RecordingStore {
    fn list(&self, indexed_name: &str) -> Result<NisResult, TransportError> {
        self.queries.lock().unwrap().push(indexed_name.to_string());
        if self.down {
            return Err(TransportError { errno: 113 });
        }
        self.inner.list(indexed_name)
    }

    fn first_entry(&self, table: &str) -> Result<NisResult, TransportError> {
        self.inner.first_entry(table)
    }

    fn next_entry(&self, table: &str, cookie: &Cookie) -> Result<NisResult, TransportError> {
        self.inner.next_entry(table, cookie)
    }
}

fn services() -> MemoryTable {
    MemoryTable::services(TABLE)
        .with_row(["http", "http", "tcp", "80"])
        .with_row(["http", "www", "tcp", "80"])
        .with_row(["http", "www-http", "tcp", "80"])
        .with_row(["kerberos", "kerberos", "udp", "88"])
        .with_row(["kerberos", "kerberos5 krb5", "udp", "88"])
}

#[test]
fn alias_lookup_queries_name_then_cname() {
    let store = RecordingStore::new(services());
    let mut buf = [0u8; 256];
    let entry = find_by_name(&store, TABLE, "www-http", "tcp", &mut buf, PortPolicy::default())
        .expect("alias hit");

    assert_eq!(entry.name(), b"http");
    let aliases: Vec<&[u8]> = entry.aliases().collect();
    assert_eq!(aliases, vec![&b"www"[..], &b"www-http"[..]]);
    assert_eq!(
        store.queries(),
        vec![
            format!("[name=www-http,proto=tcp],{TABLE}"),
            format!("[cname=http,proto=tcp],{TABLE}"),
        ]
    );
}

#[test]
fn miss_falls_back_to_cname_query() {
    let store = RecordingStore::new(services());
    let mut buf = [0u8; 256];
    let err = find_by_name(&store, TABLE, "gopher", "tcp", &mut buf, PortPolicy::default())
        .map(|e| e.port())
        .expect_err("not in table");
    assert_eq!(err, LookupError::NotFound);
    assert_eq!(err.nss_status(), NssStatus::NotFound);
    assert!(err.restores_errno());
    assert_eq!(
        store.queries(),
        vec![
            format!("[name=gopher,proto=tcp],{TABLE}"),
            format!("[cname=gopher,proto=tcp],{TABLE}"),
        ]
    );
}

#[test]
fn embedded_spaces_split_into_separate_aliases() {
    let store = RecordingStore::new(services());
    let mut buf = [0u8; 256];
    let entry = find_by_name(&store, TABLE, "kerberos", "udp", &mut buf, PortPolicy::default())
        .expect("hit");
    let aliases: Vec<&[u8]> = entry.aliases().collect();
    assert_eq!(aliases, vec![&b"kerberos5"[..], &b"krb5"[..]]);
}

#[test]
fn port_lookup_is_one_query() {
    let store = RecordingStore::new(services());
    let mut buf = [0u8; 256];
    let entry = find_by_port(&store, TABLE, 88, "udp", &mut buf, PortPolicy::default())
        .expect("hit");
    assert_eq!(entry.name(), b"kerberos");
    assert_eq!(entry.port_be(), 88u16.to_be());
    assert_eq!(store.queries(), vec![format!("[port=88,proto=udp],{TABLE}")]);
}

#[test]
fn transport_failure_is_transient() {
    let mut store = RecordingStore::new(services());
    store.down = true;
    let mut buf = [0u8; 256];
    let err = find_by_port(&store, TABLE, 80, "tcp", &mut buf, PortPolicy::default())
        .map(|e| e.port())
        .expect_err("store down");
    assert_eq!(
        err,
        LookupError::TransientStoreFailure {
            cause: FailureCause::Transport { errno: 113 }
        }
    );
    assert_eq!(err.nss_status(), NssStatus::TryAgain);
    assert_eq!(err.errno(), Some(113));
}

#[test]
fn strict_policy_rejects_garbage_port() {
    let table = MemoryTable::services(TABLE).with_row(["odd", "odd", "tcp", "80x"]);
    let store = RecordingStore::new(table);
    let mut buf = [0u8; 256];

    let lenient = find_by_name(&store, TABLE, "odd", "tcp", &mut buf, PortPolicy::AtoiCompatible)
        .map(|e| e.port());
    assert_eq!(lenient, Ok(80));

    let strict = find_by_name(&store, TABLE, "odd", "tcp", &mut buf, PortPolicy::Strict)
        .map(|e| e.port());
    assert_eq!(strict, Err(LookupError::NotFound));
}

#[test]
fn buffer_hint_is_sufficient() {
    let store = RecordingStore::new(services());
    let mut small = vec![0u8; 10];
    let err = find_by_name(&store, TABLE, "http", "tcp", &mut small, PortPolicy::default())
        .map(|e| e.port())
        .expect_err("too small");
    let LookupError::RetryWithLargerBuffer { needed } = err else {
        panic!("unexpected {err}");
    };
    // Alignment padding depends on the address, so leave room for it.
    let mut grown = vec![0u8; needed + std::mem::size_of::<usize>()];
    let capacity = grown.len();
    let entry = find_by_name(&store, TABLE, "http", "tcp", &mut grown, PortPolicy::default())
        .expect("fits");
    assert!(entry.packed_len() <= capacity);
    assert_eq!(entry.alias_count(), 2);
}

#[test]
fn non_utf8_canonical_name_is_a_miss() {
    let mut table = MemoryTable::services(TABLE);
    table.push_object(NisObject::entry(
        "services_tbl",
        [b"caf\xe9".to_vec(), b"cafe".to_vec(), b"tcp".to_vec(), b"80".to_vec()],
    ));
    let store = RecordingStore::new(table);
    let mut buf = [0u8; 256];
    let err = find_by_name(&store, TABLE, "cafe", "tcp", &mut buf, PortPolicy::default())
        .map(|e| e.port())
        .expect_err("cname cannot be queried");
    assert_eq!(err, LookupError::NotFound);
    assert!(err.restores_errno());
    // No second hop with a lossy stand-in for the canonical name.
    assert_eq!(store.queries(), vec![format!("[name=cafe,proto=tcp],{TABLE}")]);
}

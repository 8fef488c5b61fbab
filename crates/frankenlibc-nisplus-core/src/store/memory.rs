//! In-process table answering the [`RecordStore`] primitives.

use tracing::debug;

use super::dump::ColumnSpec;
use super::{RecordStore, TransportError};
use crate::nis::{Cookie, IndexedName, NisObject, NisResult, NisStatus};
use crate::servent::SERVICES_TABLE_TYPE;

const COOKIE_TAG: &[u8; 2] = b"MT";

/// One NIS+ table held in memory, rows in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTable {
    name: String,
    entry_type: Vec<u8>,
    columns: Vec<ColumnSpec>,
    rows: Vec<NisObject>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, entry_type: impl Into<Vec<u8>>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            entry_type: entry_type.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Empty `services_tbl` with the standard `cname name proto port` layout.
    pub fn services(name: impl Into<String>) -> Self {
        Self::new(name, SERVICES_TABLE_TYPE, ColumnSpec::services_layout())
    }

    /// Append an entry row of this table's type.
    pub fn push_row<C>(&mut self, columns: C) -> &mut Self
    where
        C: IntoIterator,
        C::Item: Into<Vec<u8>>,
    {
        let row = NisObject::entry(self.entry_type.clone(), columns);
        self.rows.push(row);
        self
    }

    pub fn with_row<C>(mut self, columns: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<Vec<u8>>,
    {
        self.push_row(columns);
        self
    }

    /// Append an arbitrary object (links, foreign entries, short rows).
    pub fn push_object(&mut self, object: NisObject) -> &mut Self {
        self.rows.push(object);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn rows(&self) -> &[NisObject] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn serves(&self, table: &str) -> bool {
        self.name.eq_ignore_ascii_case(table)
    }

    fn page(&self, index: usize) -> NisResult {
        match self.rows.get(index) {
            Some(row) => NisResult::success(vec![row.clone()], encode_cookie(index + 1)),
            None => NisResult::with_status(NisStatus::NotFound),
        }
    }
}

fn encode_cookie(position: usize) -> Cookie {
    let mut raw = COOKIE_TAG.to_vec();
    raw.extend_from_slice(&(position as u64).to_be_bytes());
    Cookie(raw)
}

fn decode_cookie(cookie: &Cookie) -> Option<usize> {
    let rest = cookie.0.strip_prefix(COOKIE_TAG.as_slice())?;
    let position = u64::from_be_bytes(rest.try_into().ok()?);
    usize::try_from(position).ok()
}

fn column_matches(spec: &ColumnSpec, stored: &[u8], wanted: &[u8]) -> bool {
    if spec.case_insensitive {
        stored.eq_ignore_ascii_case(wanted)
    } else {
        stored == wanted
    }
}

impl RecordStore for MemoryTable {
    fn list(&self, indexed_name: &str) -> Result<NisResult, TransportError> {
        let query = match IndexedName::parse(indexed_name) {
            Ok(query) => query,
            Err(err) => {
                debug!(%indexed_name, error = %err, "rejecting malformed indexed name");
                return Ok(NisResult::with_status(NisStatus::BadName));
            }
        };
        if !self.serves(&query.table) {
            return Ok(NisResult::with_status(NisStatus::NoSuchTable));
        }

        let mut criteria = Vec::with_capacity(query.criteria.len());
        for (column, value) in &query.criteria {
            let Some(idx) = self
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(column))
            else {
                return Ok(NisResult::with_status(NisStatus::BadAttribute));
            };
            criteria.push((idx, value.as_bytes()));
        }

        let objects: Vec<NisObject> = self
            .rows
            .iter()
            .filter(|row| {
                criteria.iter().all(|&(idx, wanted)| {
                    row.column_text(idx)
                        .is_some_and(|stored| column_matches(&self.columns[idx], stored, wanted))
                })
            })
            .cloned()
            .collect();

        if objects.is_empty() {
            return Ok(NisResult::with_status(NisStatus::NotFound));
        }
        Ok(NisResult::success(objects, Cookie::default()))
    }

    fn first_entry(&self, table: &str) -> Result<NisResult, TransportError> {
        if !self.serves(table) {
            return Ok(NisResult::with_status(NisStatus::NoSuchTable));
        }
        Ok(self.page(0))
    }

    fn next_entry(&self, table: &str, cookie: &Cookie) -> Result<NisResult, TransportError> {
        if !self.serves(table) {
            return Ok(NisResult::with_status(NisStatus::NoSuchTable));
        }
        match decode_cookie(cookie) {
            Some(position) => Ok(self.page(position)),
            None => Ok(NisResult::with_status(NisStatus::BadObject)),
        }
    }
}

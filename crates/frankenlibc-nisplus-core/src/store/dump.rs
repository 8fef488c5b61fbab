//! JSON table dumps.
//!
//! A dump names the table, its type tag and columns, and lists the entries.
//! Plain entries are arrays of column strings; objects of another kind (or
//! another type tag) use the long form:
//!
//! ```json
//! {
//!   "name": "services.org_dir.example.org.",
//!   "type": "services_tbl",
//!   "entries": [
//!     ["http", "http", "tcp", "80"],
//!     { "kind": "link", "columns": ["x", "x", "tcp", "1"] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::memory::MemoryTable;
use crate::nis::{NisObject, ObjectKind};

/// Column of a table, as declared in the table object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// `TA_CASE`: values compare without regard to ASCII case.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, case_insensitive: bool) -> Self {
        Self {
            name: name.into(),
            case_insensitive,
        }
    }

    /// `cname name proto port`; both name columns are case-insensitive.
    pub fn services_layout() -> Vec<Self> {
        vec![
            Self::new("cname", true),
            Self::new("name", true),
            Self::new("proto", false),
            Self::new("port", false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DumpEntry {
    Row(Vec<String>),
    Object {
        #[serde(default)]
        kind: ObjectKind,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        entry_type: Option<String>,
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDump {
    pub name: String,
    #[serde(rename = "type", default = "default_entry_type")]
    pub entry_type: String,
    #[serde(default = "ColumnSpec::services_layout")]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub entries: Vec<DumpEntry>,
}

fn default_entry_type() -> String {
    "services_tbl".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("cannot read table dump {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table dump: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableDump {
    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, DumpError> {
        let content = std::fs::read_to_string(path).map_err(|source| DumpError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn into_table(self) -> MemoryTable {
        let mut table = MemoryTable::new(self.name, self.entry_type.clone(), self.columns);
        for entry in self.entries {
            match entry {
                DumpEntry::Row(columns) => {
                    table.push_row(columns);
                }
                DumpEntry::Object {
                    kind,
                    entry_type,
                    columns,
                } => {
                    let mut object =
                        NisObject::entry(entry_type.unwrap_or_else(|| self.entry_type.clone()), columns);
                    object.kind = kind;
                    table.push_object(object);
                }
            }
        }
        table
    }
}

impl MemoryTable {
    pub fn from_dump_file(path: &Path) -> Result<Self, DumpError> {
        TableDump::from_file(path).map(TableDump::into_table)
    }
}

//! NIS+ indexed names: `[column=value,column=value],table.directory.`

use std::fmt;

/// Bytes that delimit an indexed name and cannot appear in an unquoted value.
pub const RESERVED_BYTES: &[u8] = b"[],=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedName {
    pub criteria: Vec<(String, String)>,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexedNameError {
    #[error("unterminated search criteria")]
    Unterminated,
    #[error("criterion without '=': {0:?}")]
    MissingEquals(String),
    #[error("empty column name in criterion")]
    EmptyColumn,
    #[error("missing ',' between criteria and table name")]
    MissingTableSeparator,
    #[error("empty table name")]
    EmptyTable,
}

impl IndexedName {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            criteria: Vec::new(),
            table: table.into(),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria.push((column.into(), value.into()));
        self
    }

    pub fn parse(text: &str) -> Result<Self, IndexedNameError> {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('[') else {
            if text.is_empty() {
                return Err(IndexedNameError::EmptyTable);
            }
            return Ok(Self::new(text));
        };

        let close = rest.find(']').ok_or(IndexedNameError::Unterminated)?;
        let (body, tail) = rest.split_at(close);
        let table = tail[1..]
            .strip_prefix(',')
            .ok_or(IndexedNameError::MissingTableSeparator)?
            .trim();
        if table.is_empty() {
            return Err(IndexedNameError::EmptyTable);
        }

        let mut criteria = Vec::new();
        for part in body.split(',').filter(|p| !p.trim().is_empty()) {
            let (column, value) = part
                .split_once('=')
                .ok_or_else(|| IndexedNameError::MissingEquals(part.to_string()))?;
            let column = column.trim();
            if column.is_empty() {
                return Err(IndexedNameError::EmptyColumn);
            }
            criteria.push((column.to_string(), value.to_string()));
        }

        Ok(Self {
            criteria,
            table: table.to_string(),
        })
    }
}

impl fmt::Display for IndexedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.criteria.is_empty() {
            f.write_str("[")?;
            for (idx, (column, value)) in self.criteria.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{column}={value}")?;
            }
            f.write_str("],")?;
        }
        f.write_str(&self.table)
    }
}

/// True when `value` can be placed in a criterion without quoting.
pub fn is_plain_value(value: &str) -> bool {
    !value.bytes().any(|b| RESERVED_BYTES.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_criteria_and_table() {
        let name = IndexedName::parse("[name=www,proto=tcp],services.org_dir.example.org.")
            .expect("well-formed name");
        assert_eq!(
            name.criteria,
            vec![
                ("name".to_string(), "www".to_string()),
                ("proto".to_string(), "tcp".to_string())
            ]
        );
        assert_eq!(name.table, "services.org_dir.example.org.");
    }

    #[test]
    fn bare_table_has_no_criteria() {
        let name = IndexedName::parse("services.org_dir.example.org.").expect("table name");
        assert!(name.criteria.is_empty());
    }

    #[test]
    fn display_matches_query_syntax() {
        let name = IndexedName::new("services.org_dir.x.")
            .with("port", "80")
            .with("proto", "udp");
        assert_eq!(name.to_string(), "[port=80,proto=udp],services.org_dir.x.");
        assert_eq!(IndexedName::parse(&name.to_string()), Ok(name));
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(
            IndexedName::parse("[name=www,proto=tcp"),
            Err(IndexedNameError::Unterminated)
        );
        assert_eq!(
            IndexedName::parse("[name=www]services"),
            Err(IndexedNameError::MissingTableSeparator)
        );
        assert_eq!(
            IndexedName::parse("[name],t."),
            Err(IndexedNameError::MissingEquals("name".to_string()))
        );
        assert_eq!(IndexedName::parse("[=x],t."), Err(IndexedNameError::EmptyColumn));
        assert_eq!(IndexedName::parse("[a=b],"), Err(IndexedNameError::EmptyTable));
        assert_eq!(IndexedName::parse(""), Err(IndexedNameError::EmptyTable));
    }

    #[test]
    fn plain_value_excludes_delimiters() {
        assert!(is_plain_value("http-alt"));
        assert!(!is_plain_value("a,b"));
        assert!(!is_plain_value("x=y"));
        assert!(!is_plain_value("[x"));
    }
}

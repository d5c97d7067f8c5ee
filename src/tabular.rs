//! Delimiter-separated input tables.
//!
//! The first record is the header; every following record becomes a [`Row`]
//! mapping header names to trimmed values. Rows may be shorter or longer than
//! the header, and a column missing from a row reads as an empty string.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Default field separator of exported work plans.
pub const DEFAULT_DELIMITER: u8 = b';';

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),
}

/// One data record keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// 1-based line of the record in its source.
    pub line: u64,
    fields: HashMap<String, String>,
}

impl Row {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Row { line, fields }
    }

    /// Value of `column`, or `""` when the row has no such column.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Value of `column` when present and non-empty.
    pub fn get_opt(&self, column: &str) -> Option<String> {
        let v = self.get(column);
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    }
}

/// Parse a table from any reader.
pub fn parse_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Row>, TabularError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(Row::new(line, fields));
    }
    Ok(rows)
}

/// Read and parse a table file.
pub fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Row>, TabularError> {
    let file = File::open(path).map_err(|source| TabularError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rows(file, delimiter)
}

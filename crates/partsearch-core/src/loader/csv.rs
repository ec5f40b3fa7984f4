//! CSV spreadsheet export loader
//!
//! Parses a spreadsheet CSV export row by row. Column 0 is the id,
//! column 1 the key, column 2 the label and column 3 the status. The first
//! non-blank row is a header and is always skipped.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::RecordSource;
use crate::error::{Error, Result};
use crate::record::Record;

/// Fallbacks for empty columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub default_label: String,
    pub default_status: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            default_label: "N/A".to_string(),
            default_status: "No result available".to_string(),
        }
    }
}

/// One parsed, non-blank source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number the row starts on
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
enum Origin {
    Path(PathBuf),
    Text { name: String, body: String },
}

/// A CSV export read from a file or from text already in memory.
#[derive(Debug, Clone)]
pub struct CsvSource {
    origin: Origin,
    options: CsvOptions,
}

impl CsvSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Path(path.into()),
            options: CsvOptions::default(),
        }
    }

    /// Use CSV text already fetched by the caller; `name` shows up in errors
    /// and logs.
    pub fn from_text(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            origin: Origin::Text {
                name: name.into(),
                body: body.into(),
            },
            options: CsvOptions::default(),
        }
    }

    /// Drain `reader` into memory. Read failures are fetch errors; bytes that
    /// are not UTF-8 are parse errors.
    pub fn from_reader<R: Read>(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let name = name.into();
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| Error::Fetch {
                source_name: name.clone(),
                source,
            })?;
        let body = decode(bytes)?;
        Ok(Self::from_text(name, body))
    }

    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    fn read_body(&self) -> Result<String> {
        match &self.origin {
            Origin::Path(path) => {
                let bytes = fs::read(path).map_err(|source| Error::Fetch {
                    source_name: path.display().to_string(),
                    source,
                })?;
                decode(bytes)
            }
            Origin::Text { body, .. } => Ok(body.clone()),
        }
    }
}

impl RecordSource for CsvSource {
    fn name(&self) -> String {
        match &self.origin {
            Origin::Path(path) => path.display().to_string(),
            Origin::Text { name, .. } => name.clone(),
        }
    }

    fn load_records(&self) -> Result<Vec<Record>> {
        let body = self.read_body()?;
        let rows = parse_rows(&body)?;
        let records = map_rows(rows, &self.options);
        debug!(source = %self.name(), records = records.len(), "parsed csv source");
        Ok(records)
    }
}

/// Read a CSV file with default options.
pub fn load_path(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    CsvSource::from_path(path.as_ref()).load_records()
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        Error::Parse {
            line,
            reason: "source is not valid UTF-8".to_string(),
        }
    })
}

/// Split CSV text into rows of trimmed fields.
///
/// Blank lines are skipped. Double quotes toggle quoting so commas and line
/// breaks inside quotes stay in the field; `""` inside a quoted field is a
/// literal quote. Input that ends inside quotes is a [`Error::Parse`] naming
/// the line the open row started on.
pub fn parse_rows(text: &str) -> Result<Vec<CsvRow>> {
    let mut rows = Vec::new();
    let mut row = RowBuilder::new(1);
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                row.current.push('"');
            }
            '"' => {
                in_quotes = !in_quotes;
                row.quoted = true;
            }
            ',' if !in_quotes => row.end_field(),
            // CRLF counts as one line break
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' if in_quotes => {
                line += 1;
                row.current.push('\n');
            }
            '\n' => {
                line += 1;
                let done = std::mem::replace(&mut row, RowBuilder::new(line));
                rows.extend(done.finish());
            }
            _ => row.current.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Parse {
            line: row.line,
            reason: "unterminated quoted field".to_string(),
        });
    }

    rows.extend(row.finish());
    Ok(rows)
}

/// Fields of the row being parsed
struct RowBuilder {
    line: usize,
    fields: Vec<String>,
    current: String,
    quoted: bool,
}

impl RowBuilder {
    fn new(line: usize) -> Self {
        Self {
            line,
            fields: Vec::new(),
            current: String::new(),
            quoted: false,
        }
    }

    fn end_field(&mut self) {
        self.fields.push(self.current.trim().to_string());
        self.current.clear();
    }

    /// The finished row, or `None` for a blank line.
    fn finish(mut self) -> Option<CsvRow> {
        self.end_field();
        let blank = !self.quoted && self.fields.len() == 1 && self.fields[0].is_empty();
        (!blank).then_some(CsvRow {
            line: self.line,
            fields: self.fields,
        })
    }
}

/// Map positional fields to records, skipping the header row.
///
/// Rows without a key are dropped. An empty id falls back to the 1-based
/// data row number; empty label and status fall back to `options`.
pub fn map_rows(rows: Vec<CsvRow>, options: &CsvOptions) -> Vec<Record> {
    let mut dropped = 0usize;
    let mut records = Vec::with_capacity(rows.len().saturating_sub(1));

    for (index, row) in rows.into_iter().skip(1).enumerate() {
        let field = |i: usize| row.fields.get(i).map(String::as_str).unwrap_or("");

        let key = field(1);
        if key.is_empty() {
            dropped += 1;
            debug!(line = row.line, "dropping row without key");
            continue;
        }

        let id = match field(0) {
            "" => (index + 1).to_string(),
            id => id.to_string(),
        };
        let label = match field(2) {
            "" => options.default_label.as_str(),
            label => label,
        };
        let status = match field(3) {
            "" => options.default_status.as_str(),
            status => status,
        };

        records.push(Record::new(id, key, label, status));
    }

    if dropped > 0 {
        warn!(dropped = dropped, "dropped rows without a key");
    }

    records
}

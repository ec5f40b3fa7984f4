//! Record sources
//!
//! The store does not know where records come from. A [`RecordSource`]
//! performs one fetch-and-parse attempt and either returns the full record
//! list or fails with [`Error::Fetch`](crate::Error::Fetch) /
//! [`Error::Parse`](crate::Error::Parse). There is no retry; callers reload
//! explicitly.

mod csv;

pub use csv::{load_path, map_rows, parse_rows, CsvOptions, CsvRow, CsvSource};

use crate::error::Result;
use crate::record::Record;

/// Something that can produce the full record set in one attempt.
pub trait RecordSource {
    /// Human-readable source name for logs and errors
    fn name(&self) -> String;

    /// Fetch and parse every record.
    fn load_records(&self) -> Result<Vec<Record>>;
}

/// A fixed record list, for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Record>,
}

impl StaticSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl RecordSource for StaticSource {
    fn name(&self) -> String {
        "static".to_string()
    }

    fn load_records(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

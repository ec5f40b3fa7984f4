//! Error types for loading and storing records.

use std::io;

use thiserror::Error;

/// Errors raised while acquiring, validating or configuring lookups.
///
/// Searching itself never fails: an empty query, an empty snapshot and a
/// query with nothing above the threshold are all ordinary empty results.
#[derive(Debug, Error)]
pub enum Error {
    /// A record with an empty key reached the store
    #[error("record {index} (id '{id}') has an empty key")]
    Validation { index: usize, id: String },

    /// The record source could not be read (missing file, unreadable stream, ...)
    #[error("failed to fetch records from {source_name}: {source}")]
    Fetch {
        source_name: String,
        #[source]
        source: io::Error,
    },

    /// The record source was read but its contents are malformed
    #[error("malformed source at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Invalid engine or loader configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for loader failures, which surface as a single "data unavailable"
    /// state until the caller reloads.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::Parse { .. })
    }
}

/// Result type alias using the partsearch [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

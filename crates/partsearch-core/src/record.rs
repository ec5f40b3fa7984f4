//! Record model

use serde::{Deserialize, Serialize};

/// One row of the source table.
///
/// `key` is the searchable part number. Records are immutable once loaded;
/// a reload replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Stable external identifier
    pub id: String,
    /// Searchable primary text, non-empty and trimmed
    pub key: String,
    /// Descriptive text
    pub label: String,
    /// Decision or category value (e.g. make/buy)
    pub status: String,
}

impl Record {
    /// Build a record, trimming `id` and `key`.
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into().trim().to_string(),
            key: key.into().trim().to_string(),
            label: label.into(),
            status: status.into(),
        }
    }

    /// Re-apply the trimming of [`Record::new`] to a record built field by
    /// field.
    pub fn trimmed(self) -> Self {
        Self::new(self.id, self.key, self.label, self.status)
    }

    /// Whether the key is usable for lookup.
    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }
}

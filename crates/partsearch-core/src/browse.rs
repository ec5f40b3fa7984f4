//! Record browser filter
//!
//! Plain case-insensitive containment over key, label and status, in
//! snapshot order. This is the table view's filter, not a ranked search.

use crate::record::Record;
use crate::store::Snapshot;

/// Records whose key, label or status contains `term`, ignoring case.
/// A blank term returns every record.
pub fn filter_records<'a>(term: &str, snapshot: &'a Snapshot) -> Vec<&'a Record> {
    let term = term.trim().to_lowercase();
    snapshot
        .entries()
        .iter()
        .filter(|entry| term.is_empty() || entry.contains_folded(&term))
        .map(|entry| entry.record())
        .collect()
}

/// One page of a filtered listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub records: Vec<&'a Record>,
    /// Matches before paging
    pub total: usize,
}

impl Page<'_> {
    pub fn has_more(&self) -> bool {
        self.records.len() < self.total
    }
}

/// The first `limit` records matching `term`.
pub fn filter_page<'a>(term: &str, snapshot: &'a Snapshot, limit: usize) -> Page<'a> {
    let mut records = filter_records(term, snapshot);
    let total = records.len();
    records.truncate(limit);
    Page { records, total }
}

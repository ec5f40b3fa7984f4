//! Immutable, pre-normalized record snapshot

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use ahash::{AHasher, RandomState};

use crate::error::{Error, Result};
use crate::fuzzy::{Normalization, Normalized};
use crate::record::Record;

/// A record plus everything search needs, computed once at load time.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    record: Record,
    key: Normalized,
    label: Normalized,
    // Case-folded only, punctuation kept
    literal_key: Normalized,
    literal_label: Normalized,
    // Lowercased key, label and status for the browse filter
    folded: [String; 3],
}

impl IndexedRecord {
    fn new(record: Record, normalization: &Normalization) -> Self {
        let key = normalization.apply(&record.key);
        let label = normalization.apply(&record.label);
        let case_only = Normalization::case_only();
        let literal_key = case_only.apply(&record.key);
        let literal_label = case_only.apply(&record.label);
        let folded = [
            record.key.to_lowercase(),
            record.label.to_lowercase(),
            record.status.to_lowercase(),
        ];
        Self {
            record,
            key,
            label,
            literal_key,
            literal_label,
            folded,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn normalized_key(&self) -> &Normalized {
        &self.key
    }

    pub fn normalized_label(&self) -> &Normalized {
        &self.label
    }

    /// Key folded for case only, whatever the snapshot's policy
    pub fn literal_key(&self) -> &Normalized {
        &self.literal_key
    }

    pub fn literal_label(&self) -> &Normalized {
        &self.literal_label
    }

    /// True if any of key, label or status contains `term_lower`.
    pub fn contains_folded(&self, term_lower: &str) -> bool {
        self.folded.iter().any(|field| field.contains(term_lower))
    }
}

/// The full record set of one load, in insertion order.
///
/// Snapshots are never mutated after construction; a reload builds a new
/// snapshot and swaps it in.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: Vec<IndexedRecord>,
    by_id: HashMap<String, usize, RandomState>,
    normalization: Normalization,
    generation: u64,
    fingerprint: String,
}

impl Snapshot {
    /// An empty snapshot (generation 0).
    pub fn empty(normalization: Normalization) -> Self {
        Self {
            entries: Vec::new(),
            by_id: HashMap::default(),
            normalization,
            generation: 0,
            fingerprint: fingerprint(&[]),
        }
    }

    /// Validate and index `records`.
    ///
    /// Ids and keys are trimmed. Fails with [`Error::Validation`] on the first
    /// record whose key is empty after trimming.
    pub fn build(records: Vec<Record>, normalization: Normalization) -> Result<Self> {
        let records: Vec<Record> = records.into_iter().map(Record::trimmed).collect();
        if let Some((index, record)) = records.iter().enumerate().find(|(_, r)| !r.has_key()) {
            return Err(Error::Validation {
                index,
                id: record.id.clone(),
            });
        }

        let fingerprint = fingerprint(&records);

        let mut by_id: HashMap<String, usize, RandomState> =
            HashMap::with_capacity_and_hasher(records.len(), RandomState::default());
        for (index, record) in records.iter().enumerate() {
            // Duplicate ids resolve to the earliest row
            by_id.entry(record.id.clone()).or_insert(index);
        }

        let entries = records
            .into_iter()
            .map(|record| IndexedRecord::new(record, &normalization))
            .collect();

        Ok(Self {
            entries,
            by_id,
            normalization,
            generation: 0,
            fingerprint,
        })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Records in insertion order
    pub fn records(&self) -> impl ExactSizeIterator<Item = &Record> + '_ {
        self.entries.iter().map(IndexedRecord::record)
    }

    pub fn entries(&self) -> &[IndexedRecord] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.entries.get(index).map(IndexedRecord::record)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id.trim()).and_then(|&index| self.get(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalization the keys were indexed with; queries must use the same.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Load counter of the store that produced this snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Content hash for change detection
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(records: &[Record]) -> String {
    let mut hasher = AHasher::default();
    records.len().hash(&mut hasher);
    for record in records {
        record.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new("1", "WX-100", "Widget", "Make"),
            Record::new("2", "WX-200", "Widget XL", "Buy"),
            Record::new("2", "WX-300", "Widget XXL", "Buy"),
        ]
    }

    #[test]
    fn test_build_preserves_order() {
        let snapshot = Snapshot::build(records(), Normalization::default()).unwrap();
        let keys: Vec<&str> = snapshot.records().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["WX-100", "WX-200", "WX-300"]);
        assert_eq!(snapshot.entries()[0].normalized_key().as_str(), "wx100");
    }

    #[test]
    fn test_build_rejects_empty_key() {
        let mut rows = records();
        rows[1].key = "  ".to_string();
        let err = Snapshot::build(rows, Normalization::default()).unwrap_err();
        assert!(matches!(err, Error::Validation { index: 1, ref id } if id == "2"));
    }

    #[test]
    fn test_build_trims_field_built_records() {
        let rows = vec![Record {
            id: " 9 ".to_string(),
            key: "  WX-900\t".to_string(),
            label: "Widget".to_string(),
            status: "Make".to_string(),
        }];
        let snapshot = Snapshot::build(rows, Normalization::default()).unwrap();
        assert_eq!(snapshot.get(0).unwrap().key, "WX-900");
        assert_eq!(snapshot.find_by_id("9").unwrap().key, "WX-900");
        assert_eq!(
            snapshot.fingerprint(),
            Snapshot::build(
                vec![Record::new("9", "WX-900", "Widget", "Make")],
                Normalization::default()
            )
            .unwrap()
            .fingerprint()
        );
    }

    #[test]
    fn test_literal_forms_keep_punctuation() {
        let snapshot = Snapshot::build(records(), Normalization::default()).unwrap();
        assert_eq!(snapshot.entries()[0].normalized_key().as_str(), "wx100");
        assert_eq!(snapshot.entries()[0].literal_key().as_str(), "wx-100");
    }

    #[test]
    fn test_find_by_id_first_wins() {
        let snapshot = Snapshot::build(records(), Normalization::default()).unwrap();
        assert_eq!(snapshot.find_by_id("2").unwrap().key, "WX-200");
        assert!(snapshot.find_by_id("9").is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Snapshot::build(records(), Normalization::default()).unwrap();
        let b = Snapshot::build(records(), Normalization::default()).unwrap();
        let mut changed = records();
        changed[0].status = "Buy".to_string();
        let c = Snapshot::build(changed, Normalization::default()).unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), Snapshot::empty(Normalization::default()).fingerprint());
    }

    #[test]
    fn test_contains_folded() {
        let snapshot = Snapshot::build(records(), Normalization::default()).unwrap();
        assert!(snapshot.entries()[1].contains_folded("widget xl"));
        assert!(snapshot.entries()[1].contains_folded("buy"));
        assert!(!snapshot.entries()[0].contains_folded("buy"));
    }
}

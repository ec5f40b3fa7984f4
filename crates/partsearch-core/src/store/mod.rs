//! Record storage
//!
//! [`RecordStore`] owns the current [`Snapshot`] behind a lock that is only
//! held long enough to swap an `Arc`. Readers take a cheap clone of the
//! snapshot and keep a consistent view even if a reload lands meanwhile; they
//! never observe a mix of old and new records.
//!
//! # Example
//!
//! ```rust
//! use partsearch_core::{Record, RecordStore};
//!
//! let store = RecordStore::new();
//! store
//!     .load(vec![Record::new("1", "WX-100", "Widget", "Make")])
//!     .unwrap();
//!
//! assert_eq!(store.len(), 1);
//! assert_eq!(store.find_by_id("1").unwrap().key, "WX-100");
//! ```

mod snapshot;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::fuzzy::Normalization;
use crate::record::Record;

pub use snapshot::{IndexedRecord, Snapshot};

/// Outcome of a successful [`RecordStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub record_count: usize,
    pub generation: u64,
    pub fingerprint: String,
    pub build_time_us: u64,
}

/// Thread-safe holder of the current record snapshot.
#[derive(Debug)]
pub struct RecordStore {
    current: RwLock<Arc<Snapshot>>,
    normalization: Normalization,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Create an empty store with the default normalization.
    pub fn new() -> Self {
        Self::with_normalization(Normalization::default())
    }

    /// Create an empty store whose snapshots are indexed with `normalization`.
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty(normalization))),
            normalization,
        }
    }

    /// Replace the contents wholesale.
    ///
    /// The new snapshot is validated and indexed before the swap; on error the
    /// previous snapshot stays in place.
    pub fn load(&self, records: Vec<Record>) -> Result<LoadStats> {
        let start = Instant::now();

        let snapshot = match Snapshot::build(records, self.normalization) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "rejected record load, keeping previous snapshot");
                return Err(e);
            }
        };

        let mut current = self.current.write();
        let generation = current.generation() + 1;
        let snapshot = Arc::new(snapshot.with_generation(generation));
        *current = Arc::clone(&snapshot);
        drop(current);

        let stats = LoadStats {
            record_count: snapshot.len(),
            generation,
            fingerprint: snapshot.fingerprint().to_string(),
            build_time_us: start.elapsed().as_micros() as u64,
        };

        info!(
            records = stats.record_count,
            generation = stats.generation,
            fingerprint = %stats.fingerprint,
            build_time_us = stats.build_time_us,
            "loaded record snapshot"
        );

        Ok(stats)
    }

    /// Current snapshot, insertion-ordered.
    pub fn all(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read())
    }

    pub fn find_by_id(&self, id: &str) -> Option<Record> {
        self.current.read().find_by_id(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Number of successful loads so far
    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    pub fn fingerprint(&self) -> String {
        self.current.read().fingerprint().to_string()
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }
}

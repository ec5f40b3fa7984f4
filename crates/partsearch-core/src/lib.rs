//! Partsearch Core
//!
//! Approximate lookup of records by a short identifying key (a part number)
//! in a small in-memory table loaded once from a spreadsheet export.
//!
//! # Features
//!
//! - `native` - Enable all native optimizations (SIMD, parallel)
//! - `simd` - SIMD-accelerated substring search via memchr
//! - `parallel` - Parallel scoring via rayon for large snapshots
//!
//! # Example
//!
//! ```rust
//! use partsearch_core::loader::{CsvSource, RecordSource};
//! use partsearch_core::{FuzzyEngine, RecordStore};
//!
//! let source = CsvSource::from_text(
//!     "inline",
//!     "ID,Part Number,Description,Make/Buy\n1,WX-100,Widget,Make\n2,WX-200,Widget XL,Buy\n",
//! );
//!
//! let store = RecordStore::new();
//! store.load(source.load_records().unwrap()).unwrap();
//!
//! let engine = FuzzyEngine::new();
//! let best = engine.best_match("wx-10", &store.all()).unwrap();
//! assert_eq!(best.record.key, "WX-100");
//! ```

pub mod browse;
pub mod error;
pub mod fuzzy;
pub mod loader;
pub mod record;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use fuzzy::{
    EngineConfig, FuzzyEngine, MatchField, MatchResult, MatchTier, Normalization,
    SimilarityMetric,
};
pub use loader::{CsvSource, RecordSource};
pub use record::Record;
pub use session::{DataStatus, Lookup, LookupSession, QueryGate, QueryTicket, ViewMode};
pub use store::{LoadStats, RecordStore, Snapshot};

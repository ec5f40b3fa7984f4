//! Fuzzy Matching Engine
//!
//! Ranks the records of a [`Snapshot`](crate::store::Snapshot) by how well
//! their key matches a free-text query.
//!
//! # Strategies (in order of specificity)
//!
//! 1. Exact match (score: 1.0)
//! 2. Prefix match (score: 0.8-0.9, shorter keys first)
//! 3. Substring match (score: 0.6-0.7, earlier positions first)
//! 4. Approximate match (score: below 0.6, normalized edit distance,
//!    excluded below `min_similarity`)
//!
//! A lower tier never outranks a higher one, whatever the raw scores. Among
//! exact matches, keys equal to the query with punctuation intact come first.
//!
//! # Example
//!
//! ```rust
//! use partsearch_core::fuzzy::{FuzzyEngine, MatchTier};
//! use partsearch_core::{Record, RecordStore};
//!
//! let store = RecordStore::new();
//! store
//!     .load(vec![
//!         Record::new("1", "WX-100", "Widget", "Make"),
//!         Record::new("2", "WX-200", "Widget XL", "Buy"),
//!     ])
//!     .unwrap();
//!
//! let engine = FuzzyEngine::new();
//! let best = engine.best_match("wx100", &store.all()).unwrap();
//! assert_eq!(best.record.id, "1");
//! assert_eq!(best.tier, MatchTier::Exact);
//! ```

mod engine;
mod normalize;
mod strategies;

pub use engine::{EngineConfig, FuzzyEngine, MatchField, MatchResult};
pub use normalize::{Normalization, Normalized};
pub use strategies::{MatchTier, SimilarityMetric};

//! FuzzyEngine - ranks snapshot records against a query

use std::cmp::Ordering;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::normalize::{Normalization, Normalized};
use super::strategies::{self, MatchTier, SimilarityMetric, StrategyMatch};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::{IndexedRecord, Snapshot};

/// Which field of the record matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Key,
    Label,
}

/// A ranked match result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub record: Record,
    pub score: f64,
    pub tier: MatchTier,
    pub field: MatchField,
    /// Char indices of the matched text in the original field, for
    /// highlighting. Empty for approximate matches.
    pub positions: Vec<usize>,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Approximate-tier similarity threshold (0.0-1.0)
    pub min_similarity: f64,
    /// Result count used by [`FuzzyEngine::top_matches`]
    pub max_results: usize,
    /// Queries shorter than this (in chars) skip the approximate tier; 0 = off
    pub min_fuzzy_length: usize,
    /// Snapshot size from which scoring runs on rayon (`parallel` feature)
    pub parallel_threshold: usize,
    /// Also score the label, taking the better of key and label
    pub match_label: bool,
    pub metric: SimilarityMetric,
    /// Normalization for stores built from this configuration
    pub normalization: Normalization,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            max_results: 20,
            min_fuzzy_length: 0,
            parallel_threshold: 1000,
            match_label: false,
            metric: SimilarityMetric::Levenshtein,
            normalization: Normalization::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `PARTSEARCH_*` environment variables.
    ///
    /// - `PARTSEARCH_MIN_SIMILARITY`: approximate threshold 0.0-1.0 (default: 0.6)
    /// - `PARTSEARCH_MAX_RESULTS`: default result count (default: 20)
    /// - `PARTSEARCH_MIN_FUZZY_LENGTH`: shortest query for edit distance (default: 0)
    /// - `PARTSEARCH_METRIC`: `levenshtein` or `jaro_winkler`
    /// - `PARTSEARCH_MATCH_LABEL`: also match labels (default: false)
    /// - `PARTSEARCH_STRIP_PUNCTUATION`: ignore punctuation in keys (default: true)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `var`.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = var("PARTSEARCH_MIN_SIMILARITY") {
            config.min_similarity = parse_var("PARTSEARCH_MIN_SIMILARITY", &v)?;
        }
        if let Some(v) = var("PARTSEARCH_MAX_RESULTS") {
            config.max_results = parse_var("PARTSEARCH_MAX_RESULTS", &v)?;
        }
        if let Some(v) = var("PARTSEARCH_MIN_FUZZY_LENGTH") {
            config.min_fuzzy_length = parse_var("PARTSEARCH_MIN_FUZZY_LENGTH", &v)?;
        }
        if let Some(v) = var("PARTSEARCH_METRIC") {
            config.metric = v.parse()?;
        }
        if let Some(v) = var("PARTSEARCH_MATCH_LABEL") {
            config.match_label = parse_flag("PARTSEARCH_MATCH_LABEL", &v)?;
        }
        if let Some(v) = var("PARTSEARCH_STRIP_PUNCTUATION") {
            config.normalization.strip_punctuation =
                parse_flag("PARTSEARCH_STRIP_PUNCTUATION", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(Error::Config(format!(
                "min_similarity must be within 0.0-1.0, got {}",
                self.min_similarity
            )));
        }
        if self.max_results == 0 {
            return Err(Error::Config("max_results must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: '{}'", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "invalid value for {}: '{}'",
            name, value
        ))),
    }
}

/// A scored snapshot entry before it is turned into a [`MatchResult`]
#[derive(Debug, Clone)]
struct Candidate {
    index: usize,
    field: MatchField,
    strategy: StrategyMatch,
}

impl Candidate {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.strategy
            .cmp_rank(&other.strategy)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Stateless fuzzy matcher.
///
/// Holds only its configuration; every call takes the snapshot to search, so
/// concurrent calls against different snapshots never interfere.
#[derive(Debug, Clone, Default)]
pub struct FuzzyEngine {
    config: EngineConfig,
}

impl FuzzyEngine {
    /// Create a new FuzzyEngine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rank `snapshot` against `query`, best first, at most `limit` results.
    ///
    /// A blank query yields no results. `limit` below 1 is treated as 1.
    pub fn search(&self, query: &str, snapshot: &Snapshot, limit: usize) -> Vec<MatchResult> {
        let start = Instant::now();
        let limit = limit.max(1);

        let query = SearchQuery::new(query, snapshot.normalization());
        if query.is_empty() {
            return Vec::new();
        }

        let entries = snapshot.entries();
        let mut candidates = self.match_entries(&query, entries);
        let matched = candidates.len();

        candidates.sort_by(Candidate::rank_cmp);
        candidates.truncate(limit);

        let results: Vec<MatchResult> = candidates
            .into_iter()
            .map(|c| {
                let entry = &entries[c.index];
                to_result(c, entry, query.literal_only)
            })
            .collect();

        debug!(
            query_len = query.compared().char_len(),
            literal_only = query.literal_only,
            candidates = entries.len(),
            matched = matched,
            returned = results.len(),
            search_time_us = start.elapsed().as_micros() as u64,
            "search complete"
        );

        results
    }

    /// The single best match, if any.
    pub fn best_match(&self, query: &str, snapshot: &Snapshot) -> Option<MatchResult> {
        self.search(query, snapshot, 1).into_iter().next()
    }

    /// [`FuzzyEngine::search`] with the configured `max_results`
    pub fn top_matches(&self, query: &str, snapshot: &Snapshot) -> Vec<MatchResult> {
        self.search(query, snapshot, self.config.max_results)
    }

    /// Match against entries - parallel for large snapshots with `parallel`
    #[cfg(feature = "parallel")]
    fn match_entries(&self, query: &SearchQuery, entries: &[IndexedRecord]) -> Vec<Candidate> {
        if entries.len() >= self.config.parallel_threshold {
            // Indexed collect keeps entry order
            entries
                .par_iter()
                .enumerate()
                .filter_map(|(index, entry)| self.score_entry(query, index, entry))
                .collect()
        } else {
            self.match_sequential(query, entries)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn match_entries(&self, query: &SearchQuery, entries: &[IndexedRecord]) -> Vec<Candidate> {
        self.match_sequential(query, entries)
    }

    fn match_sequential(&self, query: &SearchQuery, entries: &[IndexedRecord]) -> Vec<Candidate> {
        entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| self.score_entry(query, index, entry))
            .collect()
    }

    /// Score one entry; with label matching on, the better field wins and
    /// the key wins ties.
    fn score_entry(
        &self,
        query: &SearchQuery,
        index: usize,
        entry: &IndexedRecord,
    ) -> Option<Candidate> {
        let key = self
            .score_field(query, entry, MatchField::Key)
            .map(|m| (MatchField::Key, m));

        let best = if self.config.match_label {
            let label = self
                .score_field(query, entry, MatchField::Label)
                .map(|m| (MatchField::Label, m));
            match (key, label) {
                (Some(k), Some(l)) => {
                    if l.1.cmp_rank(&k.1) == Ordering::Less {
                        Some(l)
                    } else {
                        Some(k)
                    }
                }
                (k, l) => k.or(l),
            }
        } else {
            key
        };

        best.map(|(field, strategy)| Candidate {
            index,
            field,
            strategy,
        })
    }

    fn score_field(
        &self,
        query: &SearchQuery,
        entry: &IndexedRecord,
        field: MatchField,
    ) -> Option<StrategyMatch> {
        let literal = field_text(entry, field, true);
        let item = field_text(entry, field, query.literal_only);

        let mut m = strategies::score_match(
            query.compared(),
            item,
            self.config.min_fuzzy_length,
            self.config.metric,
            self.config.min_similarity,
        )?;
        if m.tier == MatchTier::Exact {
            m.verbatim = query.literal.as_str() == literal.as_str();
        }
        Some(m)
    }
}

/// A query in both the snapshot's normalization and plain case folding.
struct SearchQuery {
    normalized: Normalized,
    literal: Normalized,
    /// Nothing survives the snapshot's normalization (e.g. a query of only
    /// punctuation), so compare case-folded text instead
    literal_only: bool,
}

impl SearchQuery {
    fn new(raw: &str, normalization: Normalization) -> Self {
        let normalized = normalization.apply(raw);
        let literal = Normalization::case_only().apply(raw);
        let literal_only = normalized.is_empty();
        Self {
            normalized,
            literal,
            literal_only,
        }
    }

    fn is_empty(&self) -> bool {
        self.literal.is_empty()
    }

    fn compared(&self) -> &Normalized {
        if self.literal_only {
            &self.literal
        } else {
            &self.normalized
        }
    }
}

fn field_text(entry: &IndexedRecord, field: MatchField, literal: bool) -> &Normalized {
    match (field, literal) {
        (MatchField::Key, false) => entry.normalized_key(),
        (MatchField::Key, true) => entry.literal_key(),
        (MatchField::Label, false) => entry.normalized_label(),
        (MatchField::Label, true) => entry.literal_label(),
    }
}

fn to_result(candidate: Candidate, entry: &IndexedRecord, literal: bool) -> MatchResult {
    let text = field_text(entry, candidate.field, literal);
    let positions = candidate
        .strategy
        .span
        .map(|(start, end)| text.source_positions(start, end))
        .unwrap_or_default();

    MatchResult {
        record: entry.record().clone(),
        score: candidate.strategy.score,
        tier: candidate.strategy.tier,
        field: candidate.field,
        positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn snapshot(keys: &[&str]) -> Snapshot {
        let records = keys
            .iter()
            .enumerate()
            .map(|(i, key)| Record::new((i + 1).to_string(), *key, "", ""))
            .collect();
        Snapshot::build(records, Normalization::default()).unwrap()
    }

    fn keys(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|m| m.record.key.as_str()).collect()
    }

    #[test]
    fn test_exact_match() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["ABC123", "ABC1234", "XABC123"]);
        let results = engine.search("abc123", &snap, 10);
        assert_eq!(results[0].record.key, "ABC123");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].tier, MatchTier::Exact);
        assert_eq!(results[0].positions, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_tier_order() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["XABC123Y", "ABD", "ABC123", "ABC"]);
        let results = engine.search("abc", &snap, 10);
        assert_eq!(keys(&results), vec!["ABC", "ABC123", "XABC123Y", "ABD"]);
        let tiers: Vec<MatchTier> = results.iter().map(|m| m.tier).collect();
        assert_eq!(
            tiers,
            vec![
                MatchTier::Exact,
                MatchTier::Prefix,
                MatchTier::Substring,
                MatchTier::Approximate
            ]
        );
    }

    #[test]
    fn test_scores_descend() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["BOLT-1", "HEX BOLT", "BOLT-12345", "M-BOLT", "BOLX", "BOLT"]);
        let results = engine.search("bolt", &snap, 10);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_prefix_orders_by_length_then_position() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["AB-1234", "AB-12", "AB-99", "AB-1"]);
        let results = engine.search("ab", &snap, 10);
        assert_eq!(keys(&results), vec!["AB-1", "AB-12", "AB-99", "AB-1234"]);
    }

    #[test]
    fn test_substring_orders_by_position_then_length() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["XXKEY", "XKEYLONG", "XKEY", "YKEY"]);
        let results = engine.search("key", &snap, 10);
        assert_eq!(keys(&results), vec!["XKEY", "YKEY", "XKEYLONG", "XXKEY"]);
    }

    #[test]
    fn test_approximate_orders_by_similarity() {
        let engine = FuzzyEngine::new();
        // "wx108" is one edit from "wx100", "wx188" is two
        let snap = snapshot(&["WX-188", "WX-108"]);
        let results = engine.search("wx100", &snap, 10);
        assert_eq!(keys(&results), vec!["WX-108", "WX-188"]);
        assert!(results.iter().all(|m| m.tier == MatchTier::Approximate));
        assert!(results.iter().all(|m| m.positions.is_empty()));
    }

    #[test]
    fn test_limit() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["A1", "A2", "A3", "A4"]);
        assert_eq!(engine.search("a", &snap, 2).len(), 2);
        assert_eq!(engine.search("a", &snap, 0).len(), 1);
    }

    #[test]
    fn test_empty_and_blank_queries() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["ABC123"]);
        assert!(engine.search("", &snap, 5).is_empty());
        assert!(engine.search("   ", &snap, 5).is_empty());
        assert!(engine.search(" -- ", &snap, 5).is_empty());
        assert!(engine.best_match("", &snap).is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        let engine = FuzzyEngine::new();
        let snap = Snapshot::empty(Normalization::default());
        assert!(engine.search("abc", &snap, 5).is_empty());
    }

    #[test]
    fn test_threshold_exclusion() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["ABC123", "DEF456"]);
        assert!(engine.search("zzzzzzz", &snap, 5).is_empty());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let snap = snapshot(&["ABCDEF"]);
        // similarity 4/6
        let strict = FuzzyEngine::with_config(EngineConfig {
            min_similarity: 0.7,
            ..Default::default()
        });
        let loose = FuzzyEngine::with_config(EngineConfig {
            min_similarity: 0.5,
            ..Default::default()
        });
        assert!(strict.search("abcdxy", &snap, 5).is_empty());
        assert_eq!(loose.search("abcdxy", &snap, 5).len(), 1);
    }

    #[test]
    fn test_punctuation_policy() {
        let records = vec![Record::new("1", "WX-100", "", "")];
        let stripped = Snapshot::build(records.clone(), Normalization::default()).unwrap();
        let kept = Snapshot::build(records, Normalization::case_only()).unwrap();
        let engine = FuzzyEngine::new();

        let m = engine.best_match("wx100", &stripped).unwrap();
        assert_eq!(m.tier, MatchTier::Exact);
        assert_eq!(m.positions, vec![0, 1, 3, 4, 5]);

        let m = engine.best_match("wx100", &kept).unwrap();
        assert_eq!(m.tier, MatchTier::Approximate);
    }

    #[test]
    fn test_verbatim_key_beats_punctuation_equal_key() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["WX-100", "WX100"]);

        let results = engine.search("WX100", &snap, 10);
        assert_eq!(keys(&results), vec!["WX100", "WX-100"]);
        assert!(results.iter().all(|m| m.tier == MatchTier::Exact));

        let results = engine.search("wx-100", &snap, 10);
        assert_eq!(keys(&results), vec!["WX-100", "WX100"]);
    }

    #[test]
    fn test_punctuation_only_query_compares_literally() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["WX-100", "--", "A/B"]);

        let m = engine.best_match("--", &snap).unwrap();
        assert_eq!(m.record.key, "--");
        assert_eq!(m.tier, MatchTier::Exact);
        assert_eq!(m.positions, vec![0, 1]);

        let m = engine.best_match("/", &snap).unwrap();
        assert_eq!(m.record.key, "A/B");
        assert_eq!(m.tier, MatchTier::Substring);
        assert_eq!(m.positions, vec![1]);
    }

    #[test]
    fn test_short_query_approximate_match() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["AXB"]);
        let results = engine.search("ab", &snap, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tier, MatchTier::Approximate);

        let cutoff = FuzzyEngine::with_config(EngineConfig {
            min_fuzzy_length: 3,
            ..Default::default()
        });
        assert!(cutoff.search("ab", &snap, 5).is_empty());
    }

    #[test]
    fn test_match_result_json() {
        let snap = snapshot(&["WX-100"]);
        let m = FuzzyEngine::new().best_match("wx", &snap).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["record"]["key"], "WX-100");
        assert_eq!(json["tier"], "prefix");
        assert_eq!(json["field"], "key");
        assert_eq!(json["positions"], serde_json::json!([0, 1]));

        let back: MatchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.record, m.record);
        assert_eq!(back.positions, m.positions);
        assert!((back.score - m.score).abs() < 1e-12);
    }

    #[test]
    fn test_highlight_positions_for_substring() {
        let engine = FuzzyEngine::new();
        let snap = snapshot(&["XABC123Y"]);
        let m = engine.best_match("abc", &snap).unwrap();
        assert_eq!(m.positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_label_matching() {
        let records = vec![
            Record::new("1", "WX-100", "Hex bolt", ""),
            Record::new("2", "HB-7", "Widget", ""),
        ];
        let snap = Snapshot::build(records, Normalization::default()).unwrap();

        let key_only = FuzzyEngine::new();
        assert!(key_only.search("widget", &snap, 5).is_empty());

        let with_label = FuzzyEngine::with_config(EngineConfig {
            match_label: true,
            ..Default::default()
        });
        let results = with_label.search("widget", &snap, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "2");
        assert_eq!(results[0].field, MatchField::Label);
        assert_eq!(results[0].tier, MatchTier::Exact);
    }

    #[test]
    fn test_label_match_key_wins_ties() {
        let records = vec![Record::new("1", "ABC", "ABC", "")];
        let snap = Snapshot::build(records, Normalization::default()).unwrap();
        let engine = FuzzyEngine::with_config(EngineConfig {
            match_label: true,
            ..Default::default()
        });
        assert_eq!(engine.best_match("abc", &snap).unwrap().field, MatchField::Key);
    }

    #[test]
    fn test_duplicate_keys_keep_insertion_order() {
        let records = vec![
            Record::new("a", "DUP-1", "first", ""),
            Record::new("b", "OTHER", "", ""),
            Record::new("c", "DUP-1", "second", ""),
        ];
        let snap = Snapshot::build(records, Normalization::default()).unwrap();
        let results = FuzzyEngine::new().search("dup-1", &snap, 5);
        let ids: Vec<&str> = results.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_config_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PARTSEARCH_MIN_SIMILARITY", "0.75"),
            ("PARTSEARCH_MATCH_LABEL", "yes"),
            ("PARTSEARCH_STRIP_PUNCTUATION", "false"),
            ("PARTSEARCH_METRIC", "jaro_winkler"),
        ]);
        let config = EngineConfig::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.min_similarity, 0.75);
        assert!(config.match_label);
        assert!(!config.normalization.strip_punctuation);
        assert_eq!(config.metric, SimilarityMetric::JaroWinkler);
        assert_eq!(config.max_results, 20);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let out_of_range = EngineConfig::from_vars(|name| {
            (name == "PARTSEARCH_MIN_SIMILARITY").then(|| "1.5".to_string())
        });
        assert!(matches!(out_of_range, Err(Error::Config(_))));

        let garbage = EngineConfig::from_vars(|name| {
            (name == "PARTSEARCH_MAX_RESULTS").then(|| "lots".to_string())
        });
        assert!(matches!(garbage, Err(Error::Config(_))));
    }
}

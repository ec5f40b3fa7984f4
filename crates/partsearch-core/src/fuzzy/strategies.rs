//! Matching strategies
//!
//! Each strategy compares a normalized query with one normalized field and
//! reports the tier it matched in. Tiers never interleave: ordering is done on
//! [`StrategyMatch::cmp_rank`], and the float score bands are disjoint so that
//! the score is monotone in the rank.
//!
//! | tier        | score           |
//! |-------------|-----------------|
//! | exact       | 1.0             |
//! | prefix      | (0.8, 0.9)      |
//! | substring   | (0.6, 0.7]      |
//! | approximate | [0.0, 0.6)      |

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::normalize::Normalized;
use crate::error::Error;

/// Tier a match landed in, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Prefix,
    Substring,
    Approximate,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Prefix => "prefix",
            MatchTier::Substring => "substring",
            MatchTier::Approximate => "approximate",
        }
    }
}

/// Similarity measure used by the approximate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `1 - edit_distance / max(len)`, over chars
    #[default]
    Levenshtein,
    /// Jaro-Winkler similarity, favours shared prefixes
    JaroWinkler,
}

impl FromStr for SimilarityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levenshtein" => Ok(SimilarityMetric::Levenshtein),
            "jaro_winkler" | "jaro-winkler" => Ok(SimilarityMetric::JaroWinkler),
            other => Err(Error::Config(format!("unknown similarity metric '{}'", other))),
        }
    }
}

/// Match result from a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMatch {
    pub tier: MatchTier,
    pub score: f64,
    /// Char position of the query inside the item (substring tier)
    pub position: usize,
    /// Normalized item length in chars
    pub item_len: usize,
    /// Raw similarity (approximate tier), 1.0 otherwise
    pub similarity: f64,
    /// Matched normalized char range, if the match is contiguous
    pub span: Option<(usize, usize)>,
    /// Exact tier only: the texts are equal before punctuation is dropped
    pub verbatim: bool,
}

impl StrategyMatch {
    /// Order two matches best-first, ignoring where the records came from.
    ///
    /// Exact matches prefer verbatim equality; prefix matches prefer shorter
    /// items; substring matches prefer earlier positions, then shorter items;
    /// approximate matches prefer higher similarity.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.tier.cmp(&other.tier).then_with(|| match self.tier {
            MatchTier::Exact => other.verbatim.cmp(&self.verbatim),
            MatchTier::Prefix => self.item_len.cmp(&other.item_len),
            MatchTier::Substring => self
                .position
                .cmp(&other.position)
                .then_with(|| self.item_len.cmp(&other.item_len)),
            MatchTier::Approximate => other.similarity.total_cmp(&self.similarity),
        })
    }
}

/// Try exact match (score: 1.0)
#[inline]
pub fn exact_match(query: &Normalized, item: &Normalized) -> Option<StrategyMatch> {
    if query.as_str() == item.as_str() {
        Some(StrategyMatch {
            tier: MatchTier::Exact,
            score: 1.0,
            position: 0,
            item_len: item.char_len(),
            similarity: 1.0,
            span: Some((0, item.char_len())),
            verbatim: false,
        })
    } else {
        None
    }
}

/// Try prefix match (score: 0.8-0.9, shorter items score higher)
#[inline]
pub fn prefix_match(query: &Normalized, item: &Normalized) -> Option<StrategyMatch> {
    if item.char_len() > query.char_len() && item.as_str().starts_with(query.as_str()) {
        let coverage = query.char_len() as f64 / item.char_len() as f64;
        Some(StrategyMatch {
            tier: MatchTier::Prefix,
            score: 0.8 + 0.1 * coverage,
            position: 0,
            item_len: item.char_len(),
            similarity: 1.0,
            span: Some((0, query.char_len())),
            verbatim: false,
        })
    } else {
        None
    }
}

/// Try substring match (score: 0.6-0.7, earlier positions score higher)
/// Uses SIMD via memchr with the `simd` feature
#[inline]
pub fn substring_match(query: &Normalized, item: &Normalized) -> Option<StrategyMatch> {
    let byte_pos = find_bytes(query.as_str(), item.as_str())?;
    // Position 0 is the prefix tier
    if byte_pos == 0 {
        return None;
    }
    let position = item.as_str()[..byte_pos].chars().count();

    Some(StrategyMatch {
        tier: MatchTier::Substring,
        score: 0.6 + 0.2 / (1.0 + position as f64),
        position,
        item_len: item.char_len(),
        similarity: 1.0,
        span: Some((position, position + query.char_len())),
        verbatim: false,
    })
}

#[cfg(feature = "simd")]
#[inline]
fn find_bytes(needle: &str, haystack: &str) -> Option<usize> {
    memchr::memmem::find(haystack.as_bytes(), needle.as_bytes())
}

#[cfg(not(feature = "simd"))]
#[inline]
fn find_bytes(needle: &str, haystack: &str) -> Option<usize> {
    haystack.find(needle)
}

/// Try approximate match (score: 0.6 * similarity)
///
/// Items whose similarity falls below `min_similarity` are rejected. For the
/// Levenshtein metric the length difference is a lower bound on the edit
/// distance, so hopeless items are rejected without computing it.
#[inline]
pub fn approximate_match(
    query: &Normalized,
    item: &Normalized,
    metric: SimilarityMetric,
    min_similarity: f64,
) -> Option<StrategyMatch> {
    let max_len = query.char_len().max(item.char_len());
    if max_len == 0 {
        return None;
    }

    let similarity = match metric {
        SimilarityMetric::Levenshtein => {
            let min_distance = query.char_len().abs_diff(item.char_len());
            let best_possible = 1.0 - min_distance as f64 / max_len as f64;
            if best_possible < min_similarity {
                return None;
            }
            normalized_levenshtein(query.as_str(), item.as_str())
        }
        SimilarityMetric::JaroWinkler => jaro_winkler(query.as_str(), item.as_str()),
    };

    // Identical strings are handled by the exact tier
    if similarity < min_similarity || similarity >= 1.0 {
        return None;
    }

    Some(StrategyMatch {
        tier: MatchTier::Approximate,
        score: 0.6 * similarity,
        position: 0,
        item_len: item.char_len(),
        similarity,
        span: None,
        verbatim: false,
    })
}

/// Apply all strategies in order, return first match
pub fn score_match(
    query: &Normalized,
    item: &Normalized,
    min_fuzzy_length: usize,
    metric: SimilarityMetric,
    min_similarity: f64,
) -> Option<StrategyMatch> {
    if query.is_empty() || item.is_empty() {
        return None;
    }

    // 1. Exact match
    if let Some(m) = exact_match(query, item) {
        return Some(m);
    }

    // 2. Prefix match
    if let Some(m) = prefix_match(query, item) {
        return Some(m);
    }

    // 3. Substring match
    if let Some(m) = substring_match(query, item) {
        return Some(m);
    }

    // Optional cutoff for very short queries
    if query.char_len() < min_fuzzy_length {
        return None;
    }

    // 4. Approximate match
    approximate_match(query, item, metric, min_similarity)
}

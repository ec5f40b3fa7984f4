//! Query and key normalization
//!
//! Both sides of a comparison go through the same [`Normalization`]:
//! punctuation is optionally dropped, every char is lowercased, and leading
//! and trailing whitespace is trimmed. Internal whitespace is kept as-is.

use serde::{Deserialize, Serialize};

/// Normalization policy shared by a snapshot and the queries run against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    /// Drop chars that are neither alphanumeric nor whitespace, so that
    /// `"wx100"` and `"WX-100"` compare equal.
    pub strip_punctuation: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            strip_punctuation: true,
        }
    }
}

impl Normalization {
    /// Plain case folding and trimming, punctuation kept.
    pub fn case_only() -> Self {
        Self {
            strip_punctuation: false,
        }
    }

    /// Normalize `raw`, keeping a map from each output char back to the
    /// char index it came from in `raw`.
    pub fn apply(&self, raw: &str) -> Normalized {
        let mut folded: Vec<(char, usize)> = Vec::with_capacity(raw.len());

        for (idx, c) in raw.chars().enumerate() {
            if self.strip_punctuation && !c.is_alphanumeric() && !c.is_whitespace() {
                continue;
            }
            // Lowercasing may expand one char into several
            for lower in c.to_lowercase() {
                folded.push((lower, idx));
            }
        }

        let start = folded
            .iter()
            .position(|(c, _)| !c.is_whitespace())
            .unwrap_or(folded.len());
        let end = folded
            .iter()
            .rposition(|(c, _)| !c.is_whitespace())
            .map_or(start, |i| i + 1);
        let kept = &folded[start..end];

        Normalized {
            text: kept.iter().map(|(c, _)| *c).collect(),
            sources: kept.iter().map(|(_, idx)| *idx).collect(),
        }
    }
}

/// A normalized string plus its char provenance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Normalized {
    text: String,
    sources: Vec<usize>,
}

impl Normalized {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in chars
    pub fn char_len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Map the normalized char range `start..end` to char indices in the
    /// original text, ascending and without duplicates.
    pub fn source_positions(&self, start: usize, end: usize) -> Vec<usize> {
        let end = end.min(self.sources.len());
        let start = start.min(end);
        let mut positions: Vec<usize> = self.sources[start..end].to_vec();
        positions.dedup();
        positions
    }
}

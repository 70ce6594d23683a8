//! Precedence-ordered scoring of a query against one search surface row.
//!
//! Four signals, compared lexicographically so a higher-precedence signal
//! always dominates lower ones: an exact slug match beats any token overlap,
//! one verbatim token beats any number of phonetic hits, and a phonetic hit
//! beats any number of partial (substring / small-typo) hits.

use crate::models::SearchSurfaceRow;
use crate::phonetic::phonetic_keys;
use crate::tokenizer::tokenize_query;
use serde::Serialize;
use std::collections::HashSet;

/// Per-signal weight of the numeric score; counts are capped below the next
/// weight so the projection keeps the lexicographic order.
const SLUG_WEIGHT: f64 = 1_000_000.0;
const TOKEN_WEIGHT: f64 = 10_000.0;
const PHONETIC_WEIGHT: f64 = 100.0;
const PARTIAL_WEIGHT: f64 = 1.0;
const COUNT_CAP: u16 = 99;

/// Minimum query-token length for the partial signal
pub const MIN_PARTIAL_LEN: usize = 3;

/// Labeled signal explaining why a row matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    SlugExact,
    TokenMatch,
    PhoneticMatch,
    PartialMatch,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::SlugExact => "slug_exact",
            MatchReason::TokenMatch => "token_match",
            MatchReason::PhoneticMatch => "phonetic_match",
            MatchReason::PartialMatch => "partial_match",
        }
    }
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score tuple; derived Ord gives lexicographic comparison.
/// All components: higher = better.
///
/// Tuple order (most to least important):
/// 1. slug_exact: whole query equals the trip slug
/// 2. token_overlap: query tokens present verbatim in the row
/// 3. phonetic_hits: remaining query tokens whose sound keys the row shares
/// 4. partial_hits: remaining query tokens found as substring or near-miss
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchScore {
    pub slug_exact: bool,
    pub token_overlap: u16,
    pub phonetic_hits: u16,
    pub partial_hits: u16,
}

impl MatchScore {
    /// Monotonic numeric projection used for display and the relevance floor
    pub fn value(&self) -> f64 {
        let cap = |n: u16| n.min(COUNT_CAP) as f64;
        (self.slug_exact as u8) as f64 * SLUG_WEIGHT
            + cap(self.token_overlap) * TOKEN_WEIGHT
            + cap(self.phonetic_hits) * PHONETIC_WEIGHT
            + cap(self.partial_hits) * PARTIAL_WEIGHT
    }

    /// Query tokens that matched cleanly (verbatim or by sound)
    pub fn raw_overlap(&self) -> u16 {
        self.token_overlap.saturating_add(self.phonetic_hits)
    }

    /// Reasons in precedence order
    pub fn reasons(&self) -> Vec<MatchReason> {
        let mut reasons = Vec::with_capacity(4);
        if self.slug_exact {
            reasons.push(MatchReason::SlugExact);
        }
        if self.token_overlap > 0 {
            reasons.push(MatchReason::TokenMatch);
        }
        if self.phonetic_hits > 0 {
            reasons.push(MatchReason::PhoneticMatch);
        }
        if self.partial_hits > 0 {
            reasons.push(MatchReason::PartialMatch);
        }
        reasons
    }
}

/// A query parsed once and scored against many rows
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// Trimmed, lowercased raw query (for slug equality)
    pub raw_lower: String,
    pub tokens: Vec<String>,
    /// Phonetic keys per entry of `tokens`
    pub token_keys: Vec<Vec<String>>,
}

impl PreparedQuery {
    pub fn new(query: &str) -> Self {
        let tokens = tokenize_query(query);
        let token_keys = tokens.iter().map(|t| phonetic_keys(t)).collect();
        Self {
            raw_lower: query.trim().to_lowercase(),
            tokens,
            token_keys,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_lower.is_empty()
    }
}

/// Outcome of scoring one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatch {
    pub score: MatchScore,
    /// Row tokens that satisfied a signal, in query order, deduplicated
    pub matched_tokens: Vec<String>,
}

/// Score a prepared query against one row.
pub fn score_row(query: &PreparedQuery, row: &SearchSurfaceRow) -> RowMatch {
    let mut score = MatchScore {
        slug_exact: !query.raw_lower.is_empty() && query.raw_lower == row.slug.to_lowercase(),
        ..Default::default()
    };

    let row_tokens: Vec<&str> = row.token_list().collect();
    let token_set: HashSet<&str> = row_tokens.iter().copied().collect();
    let phonetic_set: HashSet<&str> = row.phonetic_list().collect();
    // Row token -> keys, only computed once a phonetic hit needs explaining
    let mut row_token_keys: Option<Vec<(&str, Vec<String>)>> = None;

    let mut matched: Vec<String> = Vec::new();

    for (qt, keys) in query.tokens.iter().zip(&query.token_keys) {
        if token_set.contains(qt.as_str()) {
            score.token_overlap = score.token_overlap.saturating_add(1);
            record(qt, &mut matched);
            continue;
        }

        if keys.iter().any(|k| phonetic_set.contains(k.as_str())) {
            score.phonetic_hits = score.phonetic_hits.saturating_add(1);
            let keyed = row_token_keys.get_or_insert_with(|| {
                row_tokens.iter().map(|t| (*t, phonetic_keys(t))).collect()
            });
            for (token, token_keys) in keyed.iter() {
                if token_keys.iter().any(|k| keys.contains(k)) {
                    record(token, &mut matched);
                }
            }
            continue;
        }

        if let Some(token) = find_partial(qt, &row_tokens) {
            score.partial_hits = score.partial_hits.saturating_add(1);
            record(token, &mut matched);
        }
    }

    RowMatch {
        score,
        matched_tokens: matched,
    }
}

fn record(token: &str, matched: &mut Vec<String>) {
    if !matched.iter().any(|m| m == token) {
        matched.push(token.to_string());
    }
}

/// First row token that shares a substring with, or is a near-miss of, `qt`.
fn find_partial<'a>(qt: &str, row_tokens: &[&'a str]) -> Option<&'a str> {
    let q_len = qt.chars().count();
    if q_len < MIN_PARTIAL_LEN {
        return None;
    }
    let max_typo = max_edit_distance(q_len);

    row_tokens.iter().copied().find(|t| {
        if t.contains(qt) {
            return true;
        }
        if t.chars().count() >= MIN_PARTIAL_LEN + 1 && qt.contains(t) {
            return true;
        }
        max_typo > 0 && edit_distance_bounded(qt, t, max_typo).is_some()
    })
}

/// Maximum allowed edit distance based on word length.
pub(crate) fn max_edit_distance(word_len: usize) -> u8 {
    if word_len < 5 {
        0
    } else if word_len <= 8 {
        1
    } else {
        2
    }
}

/// Damerau-Levenshtein edit distance (optimal string alignment) with threshold pruning.
/// Counts insertions, deletions, substitutions, and adjacent transpositions each as 1 edit.
/// Returns `Some(distance)` if distance <= max_dist, `None` otherwise.
pub fn edit_distance_bounded(a: &str, b: &str, max_dist: u8) -> Option<u8> {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();
    let max_d = max_dist as usize;

    if m.abs_diff(n) > max_d {
        return None;
    }

    let mut prev2 = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);

            if i >= 2 && j >= 2 && a_chars[i - 1] == b_chars[j - 2] && a_chars[i - 2] == b_chars[j - 1] {
                curr[j] = curr[j].min(prev2[j - 2] + 1);
            }

            row_min = row_min.min(curr[j]);
        }

        if row_min > max_d {
            return None;
        }

        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let result = prev[n];
    if result <= max_d {
        Some(result as u8)
    } else {
        None
    }
}

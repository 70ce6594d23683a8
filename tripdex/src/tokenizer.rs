//! Text normalization and tokenization shared by indexing and querying.
//!
//! The same rules run when a trip's search surface is built and when a query
//! is parsed, so a token produced on one side is always comparable with the
//! other. Everything here is pure.

use std::collections::BTreeSet;

/// Tokens shorter than this are dropped (unless they are all digits).
pub const MIN_TOKEN_LEN: usize = 2;

/// Lowercase, replace every non-alphanumeric char with a space, collapse whitespace.
///
/// `"Dublin, London & Stoneleigh"` → `"dublin london stoneleigh"`
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalize a list of values and join them with single spaces.
pub fn normalize_list<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| normalize_text(v.as_ref()))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a normalized word survives the noise filter.
fn keep_token(word: &str) -> bool {
    word.chars().count() >= MIN_TOKEN_LEN || word.chars().all(|c| c.is_ascii_digit())
}

/// Split already-normalized text into tokens, applying the length filter.
pub fn split_tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|w| !w.is_empty() && keep_token(w))
}

/// Raw text fields of a trip that feed the search surface.
#[derive(Debug, Clone, Default)]
pub struct TokenFields<'a> {
    pub trip_id: i64,
    pub name: &'a str,
    pub slug: &'a str,
    pub destinations: &'a str,
    pub traveler_names: &'a [String],
    pub traveler_emails: &'a [String],
}

/// Per-field normalized strings plus the combined token set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedFields {
    pub normalized_name: String,
    pub normalized_destinations: String,
    pub normalized_travelers: String,
    pub normalized_emails: String,
    /// Ordered so that serialization is byte-stable across refreshes.
    pub tokens: BTreeSet<String>,
}

impl TokenizedFields {
    pub fn tokens_joined(&self) -> String {
        self.tokens.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

/// Normalize every field and collect the deduplicated token set.
/// The trip id is always included so exact-id queries hit.
pub fn tokenize_fields(fields: &TokenFields<'_>) -> TokenizedFields {
    let normalized_name = normalize_text(fields.name);
    let normalized_slug = normalize_text(fields.slug);
    let normalized_destinations = normalize_text(fields.destinations);
    let normalized_travelers = normalize_list(fields.traveler_names);
    let normalized_emails = normalize_list(fields.traveler_emails);

    let mut tokens = BTreeSet::new();
    tokens.insert(fields.trip_id.to_string());
    for source in [
        &normalized_name,
        &normalized_slug,
        &normalized_destinations,
        &normalized_travelers,
        &normalized_emails,
    ] {
        tokens.extend(split_tokens(source).map(str::to_string));
    }

    TokenizedFields {
        normalized_name,
        normalized_destinations,
        normalized_travelers,
        normalized_emails,
        tokens,
    }
}

/// Tokenize a raw query with the indexing rules, keeping first-seen order.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let normalized = normalize_text(query);
    let mut seen = BTreeSet::new();
    split_tokens(&normalized)
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(
            normalize_text("European Adventure - Dublin, London & Stoneleigh"),
            "european adventure dublin london stoneleigh"
        );
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Cape\t\tTown \n "), "cape town");
        assert_eq!(normalize_text("---"), "");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_text("Steph.Chisholm@Example.com"), "steph chisholm example com");
    }

    #[test]
    fn test_short_tokens_dropped_but_digits_kept() {
        let tokens: Vec<&str> = split_tokens("a trip to x 7 rome").collect();
        assert_eq!(tokens, vec!["trip", "to", "7", "rome"]);
    }

    #[test]
    fn test_tokenize_fields_includes_trip_id() {
        let names = vec!["Stephanie Chisholm".to_string()];
        let emails = vec!["steph@example.com".to_string()];
        let out = tokenize_fields(&TokenFields {
            trip_id: 3,
            name: "Dublin Getaway",
            slug: "dublin-getaway-2025",
            destinations: "Dublin",
            traveler_names: &names,
            traveler_emails: &emails,
        });
        assert!(out.tokens.contains("3"));
        assert!(out.tokens.contains("dublin"));
        assert!(out.tokens.contains("2025"));
        assert!(out.tokens.contains("chisholm"));
        assert!(out.tokens.contains("steph"));
        assert_eq!(out.normalized_travelers, "stephanie chisholm");
        assert_eq!(out.normalized_emails, "steph example com");
    }

    #[test]
    fn test_tokens_joined_is_sorted_and_deduplicated() {
        let out = tokenize_fields(&TokenFields {
            trip_id: 10,
            name: "Rome Rome Paris",
            ..Default::default()
        });
        assert_eq!(out.tokens_joined(), "10 paris rome");
    }

    #[test]
    fn test_tokenize_query_matches_index_rules() {
        assert_eq!(tokenize_query("Chisolm, STONLEIGH!"), vec!["chisolm", "stonleigh"]);
        assert_eq!(tokenize_query("rome rome a"), vec!["rome"]);
        assert!(tokenize_query("   ").is_empty());
    }
}

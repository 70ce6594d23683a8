//! Fuzzy trip search over the materialized search surface.
//!
//! Every row is scored in parallel, rows under the relevance floor are
//! dropped, and the rest are ordered by score, then raw token overlap, then
//! trip id so equal inputs always produce the same ranking.

use crate::database::{Database, DatabaseResult};
use crate::interface::MatchResult;
use crate::models::SearchSurfaceRow;
use crate::ranking::{score_row, MatchScore, PreparedQuery, RowMatch};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;
pub const DEFAULT_MIN_SCORE: f64 = 1.0;

/// Query-time knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Requested result count; `None` or non-positive means the default
    pub limit: Option<i64>,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Relevance floor on the numeric score
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }

    /// Requested limit after defaulting and clamping
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(n) if n > 0 => (n as usize).min(self.max_limit),
            _ => self.default_limit.min(self.max_limit),
        }
    }
}

/// Rank all trips against `query`.
pub fn search(db: &Database, query: &str, options: &SearchOptions) -> DatabaseResult<Vec<MatchResult>> {
    let prepared = PreparedQuery::new(query);
    if prepared.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let rows = db.fetch_all_surface_rows()?;
    let fetched_ms = start.elapsed().as_secs_f64() * 1000.0;

    let results = rank_rows(&prepared, rows, options);

    debug!(
        query = %prepared.raw_lower,
        tokens = prepared.tokens.len(),
        returned = results.len(),
        fetch_ms = fetched_ms,
        total_ms = start.elapsed().as_secs_f64() * 1000.0,
        "search complete"
    );
    Ok(results)
}

/// Score, filter, order and truncate; split out so benches can skip the DB.
pub fn rank_rows(
    prepared: &PreparedQuery,
    rows: Vec<SearchSurfaceRow>,
    options: &SearchOptions,
) -> Vec<MatchResult> {
    let mut scored: Vec<(SearchSurfaceRow, RowMatch)> = rows
        .into_par_iter()
        .filter_map(|row| {
            let m = score_row(prepared, &row);
            (m.score.value() >= options.min_score).then_some((row, m))
        })
        .collect();

    scored.sort_unstable_by(|(ra, ma), (rb, mb)| compare_ranked(&ma.score, ra.trip_id, &mb.score, rb.trip_id));
    scored.truncate(options.effective_limit());

    scored
        .into_iter()
        .map(|(row, m)| MatchResult {
            trip_id: row.trip_id,
            trip_name: row.trip_name,
            slug: row.slug,
            score: m.score.value(),
            match_reasons: m.score.reasons(),
            matched_tokens: m.matched_tokens,
            traveler_count: row.traveler_count,
            traveler_names: row.traveler_names,
            traveler_emails: row.traveler_emails,
        })
        .collect()
}

/// Best first: score, then raw overlap, then lower trip id.
fn compare_ranked(a: &MatchScore, a_id: i64, b: &MatchScore, b_id: i64) -> Ordering {
    b.cmp(a)
        .then_with(|| b.raw_overlap().cmp(&a.raw_overlap()))
        .then_with(|| a_id.cmp(&b_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientAssignment, TripRecord};
    use crate::ranking::MatchReason;
    use crate::surface::refresh_trip;

    fn add_trip(db: &Database, name: &str, slug: &str, destinations: &str, primary: (&str, &str)) -> i64 {
        let id = db
            .insert_trip(&TripRecord {
                name: name.into(),
                slug: slug.into(),
                status: "proposal".into(),
                destinations: Some(destinations.into()),
                primary_contact_name: Some(primary.0.into()),
                primary_contact_email: Some(primary.1.into()),
                ..Default::default()
            })
            .unwrap();
        refresh_trip(db, id).unwrap();
        id
    }

    fn seeded() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let europe = add_trip(
            &db,
            "European Adventure - Dublin, London & Stoneleigh",
            "european-adventure-dublin-london-stoneleigh-2025",
            "Dublin, London, Stoneleigh",
            ("Stephanie Chisholm", "stephanie@example.com"),
        );
        db.insert_assignment(&ClientAssignment {
            trip_id: europe,
            ordinal: 1,
            ..Default::default()
        })
        .unwrap();
        refresh_trip(&db, europe).unwrap();

        let lisbon = add_trip(
            &db,
            "Lisbon Food Week",
            "lisbon-food-week-2025",
            "Lisbon",
            ("Marta Silva", "marta@example.com"),
        );
        let london = add_trip(
            &db,
            "London Theatre Weekend",
            "london-theatre-weekend",
            "London",
            ("Oliver Grant", "oliver@example.com"),
        );
        (db, europe, lisbon, london)
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let (db, ..) = seeded();
        assert!(search(&db, "", &SearchOptions::default()).unwrap().is_empty());
        assert!(search(&db, "   ", &SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_slug_match_ranks_first() {
        let (db, _, lisbon, _) = seeded();
        let results = search(&db, "lisbon-food-week-2025", &SearchOptions::default()).unwrap();
        assert_eq!(results[0].trip_id, lisbon);
        assert!(results[0].match_reasons.contains(&MatchReason::SlugExact));
        for other in &results[1..] {
            assert!(results[0].score > other.score);
        }
    }

    #[test]
    fn test_misspelled_names_find_trip() {
        let (db, europe, ..) = seeded();
        let results = search(&db, "Chisolm Stonleigh", &SearchOptions::default().with_limit(Some(3))).unwrap();
        assert_eq!(results[0].trip_id, europe);
        assert!(results[0].match_reasons.contains(&MatchReason::PhoneticMatch));
        assert!(results[0].matched_tokens.contains(&"chisholm".to_string()));
        assert!(results[0].matched_tokens.contains(&"stoneleigh".to_string()));
        assert_eq!(results[0].traveler_names, vec!["Stephanie Chisholm", "No Email 1"]);
        assert_eq!(results[0].traveler_count, 2);
    }

    #[test]
    fn test_ties_break_by_trip_id() {
        let (db, europe, _, london) = seeded();
        let results = search(&db, "london", &SearchOptions::default()).unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.trip_id).collect();
        assert_eq!(ids, vec![europe.min(london), europe.max(london)]);
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_results_below_floor_dropped() {
        let (db, ..) = seeded();
        assert!(search(&db, "reykjavik", &SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_limit_applies() {
        let (db, ..) = seeded();
        // "example" is in every trip's email tokens
        let all = search(&db, "example", &SearchOptions::default()).unwrap();
        assert_eq!(all.len(), 3);
        let one = search(&db, "example", &SearchOptions::default().with_limit(Some(1))).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].trip_id, all[0].trip_id);
    }

    #[test]
    fn test_effective_limit_clamps() {
        let opts = SearchOptions::default();
        assert_eq!(opts.with_limit(None).effective_limit(), 10);
        assert_eq!(opts.with_limit(Some(0)).effective_limit(), 10);
        assert_eq!(opts.with_limit(Some(-4)).effective_limit(), 10);
        assert_eq!(opts.with_limit(Some(25)).effective_limit(), 25);
        assert_eq!(opts.with_limit(Some(5_000)).effective_limit(), 100);
    }

    #[test]
    fn test_search_is_deterministic() {
        let (db, ..) = seeded();
        let a = search(&db, "london example", &SearchOptions::default()).unwrap();
        let b = search(&db, "london example", &SearchOptions::default()).unwrap();
        assert_eq!(a, b);
    }
}

//! Search surface synchronizer.
//!
//! Builds the denormalized `trip_search_surface` row for a trip and keeps the
//! table in step with source data by draining the dirty queue. Delivery is
//! at-least-once: an entry is only acknowledged after its trip refreshed (or
//! turned out to no longer exist), and a refresh is a full replace, so
//! processing the same entry twice is harmless.

use crate::database::{Database, DatabaseResult};
use crate::models::{SearchSurfaceRow, TripRecord};
use crate::phonetic::phonetic_tokens;
use crate::roster::{load_roster, traveler_emails, traveler_names};
use crate::tokenizer::{tokenize_fields, TokenFields};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What a single-trip refresh produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceRefresh {
    pub trip_name: String,
    pub tokens: Vec<String>,
    pub phonetic_tokens: Vec<String>,
}

/// Derive the surface row for a trip from its source records.
pub fn build_surface_row(db: &Database, trip: &TripRecord) -> DatabaseResult<SearchSurfaceRow> {
    let roster = load_roster(db, trip)?;
    let names = traveler_names(&roster);
    let emails = traveler_emails(&roster);

    let tokenized = tokenize_fields(&TokenFields {
        trip_id: trip.id,
        name: &trip.name,
        slug: &trip.slug,
        destinations: trip.destinations.as_deref().unwrap_or(""),
        traveler_names: &names,
        traveler_emails: &emails,
    });
    let phonetic = phonetic_tokens(tokenized.tokens.iter().map(String::as_str));

    Ok(SearchSurfaceRow {
        trip_id: trip.id,
        trip_name: trip.name.clone(),
        slug: trip.slug.clone(),
        status: trip.status.clone(),
        start_date: trip.start_date.clone(),
        end_date: trip.end_date.clone(),
        destinations: trip.destinations.clone(),
        primary_contact_name: trip.primary_contact_name.clone(),
        primary_contact_email: trip.primary_contact_email.clone(),
        search_tokens: tokenized.tokens_joined(),
        phonetic_tokens: phonetic.into_iter().collect::<Vec<_>>().join(" "),
        normalized_name: tokenized.normalized_name,
        normalized_destinations: tokenized.normalized_destinations,
        normalized_travelers: tokenized.normalized_travelers,
        normalized_emails: tokenized.normalized_emails,
        traveler_count: roster.len() as i64,
        traveler_names: names,
        traveler_emails: emails,
    })
}

/// Recompute and replace one trip's surface row.
/// Returns `None` without writing when the trip does not exist.
pub fn refresh_trip(db: &Database, trip_id: i64) -> DatabaseResult<Option<SurfaceRefresh>> {
    let Some(trip) = db.fetch_trip(trip_id)? else {
        debug!(trip_id, "surface refresh skipped: trip not found");
        return Ok(None);
    };

    let row = build_surface_row(db, &trip)?;
    db.replace_surface_row(&row)?;
    debug!(trip_id, tokens = row.token_list().count(), "search surface refreshed");

    Ok(Some(SurfaceRefresh {
        trip_name: row.trip_name.clone(),
        tokens: row.token_list().map(str::to_string).collect(),
        phonetic_tokens: row.phonetic_list().map(str::to_string).collect(),
    }))
}

/// Drain up to `limit` dirty entries (all when `None`).
///
/// Each distinct trip id is refreshed once, in queue order. Entries are
/// acknowledged for trips that refreshed and for trips that no longer exist;
/// a trip whose refresh fails keeps its entries for the next drain. Returns
/// how many trips were refreshed.
pub fn refresh_dirty(db: &Database, limit: Option<usize>) -> DatabaseResult<usize> {
    let entries = db.fetch_dirty(limit)?;
    if entries.is_empty() {
        return Ok(0);
    }

    // Distinct trip ids in first-seen order, with the highest seq read for each
    let mut order: Vec<i64> = Vec::new();
    let mut max_seq: HashMap<i64, i64> = HashMap::new();
    for entry in &entries {
        max_seq
            .entry(entry.trip_id)
            .and_modify(|s| *s = (*s).max(entry.seq))
            .or_insert_with(|| {
                order.push(entry.trip_id);
                entry.seq
            });
    }

    let mut refreshed = 0usize;
    let mut missing = 0usize;
    let mut failed = 0usize;
    for trip_id in order {
        let seq = max_seq[&trip_id];
        match refresh_trip(db, trip_id) {
            Ok(Some(_)) => {
                db.ack_dirty(trip_id, seq)?;
                refreshed += 1;
            }
            Ok(None) => {
                db.ack_dirty(trip_id, seq)?;
                missing += 1;
            }
            Err(e) => {
                warn!(trip_id, error = %e, "surface refresh failed; entry left queued");
                failed += 1;
            }
        }
    }

    info!(
        entries = entries.len(),
        refreshed, missing, failed, "dirty queue drained"
    );
    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientAssignment;

    fn scenario_trip(db: &Database) -> i64 {
        let id = db
            .insert_trip(&TripRecord {
                name: "European Adventure - Dublin, London & Stoneleigh".into(),
                slug: "european-adventure-dublin-london-stoneleigh-2025".into(),
                status: "proposal".into(),
                start_date: Some("2025-09-10".into()),
                end_date: Some("2025-09-20".into()),
                destinations: Some("Dublin, London, Stoneleigh".into()),
                primary_contact_name: Some("Stephanie Chisholm".into()),
                primary_contact_email: Some("stephanie@example.com".into()),
                ..Default::default()
            })
            .unwrap();
        db.insert_assignment(&ClientAssignment {
            trip_id: id,
            ordinal: 1,
            role: Some("traveler".into()),
            ..Default::default()
        })
        .unwrap();
        id
    }

    #[test]
    fn test_refresh_trip_builds_row() {
        let db = Database::open_in_memory().unwrap();
        let id = scenario_trip(&db);

        let out = refresh_trip(&db, id).unwrap().unwrap();
        assert_eq!(out.trip_name, "European Adventure - Dublin, London & Stoneleigh");
        assert!(out.tokens.contains(&"stoneleigh".to_string()));
        assert!(out.tokens.contains(&"chisholm".to_string()));
        assert!(out.tokens.contains(&id.to_string()));
        assert!(out.phonetic_tokens.contains(&"ksm".to_string()));
        assert!(out.phonetic_tokens.contains(&"stnl".to_string()));

        let row = db.fetch_surface_row(id).unwrap().unwrap();
        assert_eq!(row.traveler_names, vec!["Stephanie Chisholm", "No Email 1"]);
        assert_eq!(row.traveler_emails, vec!["stephanie@example.com"]);
        assert_eq!(row.traveler_count, 2);
        assert_eq!(row.normalized_destinations, "dublin london stoneleigh");
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id = scenario_trip(&db);
        refresh_trip(&db, id).unwrap();
        let first = db.fetch_surface_row(id).unwrap().unwrap();
        refresh_trip(&db, id).unwrap();
        let second = db.fetch_surface_row(id).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(db.count_surface_rows().unwrap(), 1);
    }

    #[test]
    fn test_refresh_missing_trip_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert!(refresh_trip(&db, 99).unwrap().is_none());
        assert_eq!(db.count_surface_rows().unwrap(), 0);
    }

    #[test]
    fn test_refresh_dirty_drains_distinct_trips() {
        let db = Database::open_in_memory().unwrap();
        let a = scenario_trip(&db);
        let b = db
            .insert_trip(&TripRecord { name: "Lisbon".into(), slug: "lisbon".into(), ..Default::default() })
            .unwrap();
        db.mark_dirty(a, Some("trip_created")).unwrap();
        db.mark_dirty(b, None).unwrap();
        db.mark_dirty(a, Some("assignment_added")).unwrap();

        assert_eq!(refresh_dirty(&db, None).unwrap(), 2);
        assert_eq!(db.count_dirty().unwrap(), 0);
        assert_eq!(db.count_surface_rows().unwrap(), 2);
    }

    #[test]
    fn test_refresh_dirty_acknowledges_deleted_trips() {
        let db = Database::open_in_memory().unwrap();
        db.mark_dirty(404, Some("trip_deleted")).unwrap();
        assert_eq!(refresh_dirty(&db, None).unwrap(), 0);
        assert_eq!(db.count_dirty().unwrap(), 0);
        assert_eq!(db.count_surface_rows().unwrap(), 0);
    }

    #[test]
    fn test_refresh_dirty_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        let a = scenario_trip(&db);
        let b = db
            .insert_trip(&TripRecord { name: "Lisbon".into(), slug: "lisbon".into(), ..Default::default() })
            .unwrap();
        db.mark_dirty(a, None).unwrap();
        db.mark_dirty(b, None).unwrap();

        assert_eq!(refresh_dirty(&db, Some(1)).unwrap(), 1);
        let pending = db.fetch_dirty(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].trip_id, b);
    }

    #[test]
    fn test_failed_refresh_stays_queued() {
        let db = Database::open_in_memory().unwrap();
        let id = scenario_trip(&db);
        db.mark_dirty(id, None).unwrap();
        db.execute_batch_for_test("DROP TABLE trip_search_surface").unwrap();

        assert_eq!(refresh_dirty(&db, None).unwrap(), 0);
        assert_eq!(db.count_dirty().unwrap(), 1);
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(refresh_dirty(&db, None).unwrap(), 0);
    }
}

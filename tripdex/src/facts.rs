//! Per-trip rollup metrics (the fact table).
//!
//! Every refresh recomputes the whole row from source tables and replaces the
//! stored one. Missing aggregates default to zero so a trip with no bookings
//! still produces a complete row.

use crate::database::{Database, DatabaseResult};
use crate::models::{FactRow, TripRecord};
use crate::roster::{load_roster, traveler_emails, traveler_names};
use chrono::Utc;
use tracing::debug;

/// Recompute and store the fact row for a trip.
/// Returns `None` (and writes nothing) when the trip does not exist.
pub fn refresh_trip_facts(db: &Database, trip_id: i64) -> DatabaseResult<Option<FactRow>> {
    let Some(trip) = db.fetch_trip(trip_id)? else {
        debug!(trip_id, "facts refresh skipped: trip not found");
        return Ok(None);
    };

    let facts = compute_facts(db, &trip)?;
    db.replace_fact_row(&facts)?;
    debug!(
        trip_id,
        nights = facts.total_nights,
        hotels = facts.total_hotels,
        activities = facts.total_activities,
        cost = facts.total_cost,
        travelers = facts.traveler_count,
        "trip facts refreshed"
    );
    Ok(Some(facts))
}

fn compute_facts(db: &Database, trip: &TripRecord) -> DatabaseResult<FactRow> {
    let total_nights = trip_nights(db, trip)?;
    let (total_hotels, total_activities, activity_cost) = db.fetch_activity_totals(trip.id)?;
    let line_item_cost = db.fetch_line_item_total(trip.id)?;
    let transit_minutes = db.fetch_transit_minutes(trip.id)?;
    let roster = load_roster(db, trip)?;

    Ok(FactRow {
        trip_id: trip.id,
        total_nights,
        total_hotels,
        total_activities,
        total_cost: activity_cost + line_item_cost,
        transit_minutes,
        traveler_count: roster.len() as i64,
        traveler_names: traveler_names(&roster),
        traveler_emails: traveler_emails(&roster),
        primary_contact_name: trip.primary_contact_name.clone(),
        primary_contact_email: trip.primary_contact_email.clone(),
        last_computed: Utc::now(),
    })
}

/// Nights from the trip's date range; without usable dates, the itinerary's
/// last day number stands in (day N means N-1 nights).
fn trip_nights(db: &Database, trip: &TripRecord) -> DatabaseResult<i64> {
    if let (Some(start), Some(end)) = (trip.parsed_start(), trip.parsed_end()) {
        return Ok((end - start).num_days().max(0));
    }
    let max_day = db.fetch_max_day_number(trip.id)?;
    Ok(max_day.map(|d| (d - 1).max(0)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityEntry, ActivityKind, ClientAssignment, LineItem, TripLeg};

    fn insert_trip(db: &Database, start: Option<&str>, end: Option<&str>) -> i64 {
        db.insert_trip(&TripRecord {
            name: "Kyoto Spring".into(),
            slug: "kyoto-spring".into(),
            status: "confirmed".into(),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            primary_contact_name: Some("Aiko Tanaka".into()),
            primary_contact_email: Some("aiko@example.com".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn activity(trip_id: i64, day: i64, kind: ActivityKind, cost: Option<f64>) -> ActivityEntry {
        ActivityEntry {
            trip_id,
            day_number: Some(day),
            kind,
            name: "entry".into(),
            cost,
        }
    }

    #[test]
    fn test_missing_trip_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(refresh_trip_facts(&db, 42).unwrap().is_none());
        assert!(db.fetch_fact_row(42).unwrap().is_none());
    }

    #[test]
    fn test_trip_without_bookings_is_all_zero() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_trip(&db, None, None);
        let facts = refresh_trip_facts(&db, id).unwrap().unwrap();
        assert_eq!(facts.total_cost, 0.0);
        assert_eq!(facts.total_hotels, 0);
        assert_eq!(facts.total_activities, 0);
        assert_eq!(facts.total_nights, 0);
        assert_eq!(facts.transit_minutes, 0);
        assert_eq!(facts.traveler_count, 1);
        assert_eq!(facts.traveler_names, vec!["Aiko Tanaka"]);
    }

    #[test]
    fn test_full_rollup() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_trip(&db, Some("2025-04-01"), Some("2025-04-06"));
        db.insert_activity(&activity(id, 1, ActivityKind::Hotel, Some(600.0))).unwrap();
        db.insert_activity(&activity(id, 4, ActivityKind::Hotel, Some(400.0))).unwrap();
        db.insert_activity(&activity(id, 2, ActivityKind::Activity, Some(80.0))).unwrap();
        db.insert_activity(&activity(id, 3, ActivityKind::Activity, None)).unwrap();
        db.insert_activity(&activity(id, 3, ActivityKind::Dining, Some(20.0))).unwrap();
        db.insert_line_item(&LineItem { trip_id: id, description: "Insurance".into(), amount: Some(100.0) })
            .unwrap();
        db.insert_leg(&TripLeg { trip_id: id, ordinal: 0, transit_minutes: Some(150) }).unwrap();
        db.insert_leg(&TripLeg { trip_id: id, ordinal: 1, transit_minutes: None }).unwrap();
        db.insert_leg(&TripLeg { trip_id: id, ordinal: 2, transit_minutes: Some(30) }).unwrap();
        db.insert_assignment(&ClientAssignment {
            trip_id: id,
            ordinal: 1,
            email: Some("ken@example.com".into()),
            name: Some("Ken Tanaka".into()),
            ..Default::default()
        })
        .unwrap();

        let facts = refresh_trip_facts(&db, id).unwrap().unwrap();
        assert_eq!(facts.total_nights, 5);
        assert_eq!(facts.total_hotels, 2);
        assert_eq!(facts.total_activities, 2);
        assert_eq!(facts.total_cost, 1200.0);
        assert_eq!(facts.transit_minutes, 180);
        assert_eq!(facts.traveler_count, 2);
        assert_eq!(facts.traveler_names, vec!["Aiko Tanaka", "Ken Tanaka"]);
        assert_eq!(facts.traveler_emails, vec!["aiko@example.com", "ken@example.com"]);

        let stored = db.fetch_fact_row(id).unwrap().unwrap();
        assert_eq!(stored.total_cost, 1200.0);
        assert_eq!(stored.traveler_names, facts.traveler_names);
    }

    #[test]
    fn test_nights_fall_back_to_itinerary_days() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_trip(&db, Some("2025-04-01"), None);
        db.insert_activity(&activity(id, 4, ActivityKind::Activity, None)).unwrap();
        let facts = refresh_trip_facts(&db, id).unwrap().unwrap();
        assert_eq!(facts.total_nights, 3);
    }

    #[test]
    fn test_reversed_dates_never_negative() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_trip(&db, Some("2025-04-06"), Some("2025-04-01"));
        let facts = refresh_trip_facts(&db, id).unwrap().unwrap();
        assert_eq!(facts.total_nights, 0);
    }

    #[test]
    fn test_refresh_replaces_previous_row() {
        let db = Database::open_in_memory().unwrap();
        let id = insert_trip(&db, None, None);
        refresh_trip_facts(&db, id).unwrap();
        db.insert_line_item(&LineItem { trip_id: id, description: "Fee".into(), amount: Some(25.0) })
            .unwrap();
        refresh_trip_facts(&db, id).unwrap();
        assert_eq!(db.fetch_fact_row(id).unwrap().unwrap().total_cost, 25.0);
    }
}

//! Core data models for tripdex
//!
//! Source records (`TripRecord`, `ClientAssignment`, ...) are owned by the
//! surrounding trip-management system and only read here. Derived rows
//! (`SearchSurfaceRow`, `FactRow`) are owned by this crate and always rebuilt
//! wholesale on refresh.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// SOURCE RECORDS (read-only inputs)
// ─────────────────────────────────────────────────────────────────────────────

/// A trip as stored by the trip-management system
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub status: String,
    /// ISO `YYYY-MM-DD`; may be missing or malformed on draft trips
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Free text, e.g. "Dublin, London & Stoneleigh"
    pub destinations: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
}

impl TripRecord {
    pub fn parsed_start(&self) -> Option<NaiveDate> {
        parse_iso_date(self.start_date.as_deref())
    }

    pub fn parsed_end(&self) -> Option<NaiveDate> {
        parse_iso_date(self.end_date.as_deref())
    }
}

fn parse_iso_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

/// Traveler assigned to a trip
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientAssignment {
    pub id: i64,
    pub trip_id: i64,
    pub ordinal: i64,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

/// Address-book entry used to resolve a traveler's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ContactRecord {
    /// "First Last", or whichever part exists
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Itinerary entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Hotel,
    Activity,
    Transfer,
    Dining,
    Flight,
    Note,
    Other,
}

impl ActivityKind {
    pub fn to_database_str(self) -> &'static str {
        match self {
            ActivityKind::Hotel => "hotel",
            ActivityKind::Activity => "activity",
            ActivityKind::Transfer => "transfer",
            ActivityKind::Dining => "dining",
            ActivityKind::Flight => "flight",
            ActivityKind::Note => "note",
            ActivityKind::Other => "other",
        }
    }

    pub fn from_database_str(s: &str) -> Self {
        match s {
            "hotel" => ActivityKind::Hotel,
            "activity" => ActivityKind::Activity,
            "transfer" => ActivityKind::Transfer,
            "dining" => ActivityKind::Dining,
            "flight" => ActivityKind::Flight,
            "note" => ActivityKind::Note,
            _ => ActivityKind::Other,
        }
    }
}

/// One itinerary entry with an optional cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub trip_id: i64,
    pub day_number: Option<i64>,
    pub kind: ActivityKind,
    pub name: String,
    pub cost: Option<f64>,
}

/// A priced line item that is not an itinerary entry (fees, insurance, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub trip_id: i64,
    pub description: String,
    pub amount: Option<f64>,
}

/// Travel time between two consecutive stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripLeg {
    pub trip_id: i64,
    pub ordinal: i64,
    pub transit_minutes: Option<i64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// DERIVED ROWS (owned by tripdex)
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved traveler: a display name is always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub name: String,
    pub email: Option<String>,
}

/// Denormalized per-trip row the ranker scores against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSurfaceRow {
    pub trip_id: i64,
    pub trip_name: String,
    pub slug: String,
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub destinations: Option<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub traveler_names: Vec<String>,
    pub traveler_emails: Vec<String>,
    pub normalized_name: String,
    pub normalized_destinations: String,
    pub normalized_travelers: String,
    pub normalized_emails: String,
    /// Space-joined, sorted, deduplicated
    pub search_tokens: String,
    /// Space-joined, sorted, deduplicated
    pub phonetic_tokens: String,
    pub traveler_count: i64,
}

impl SearchSurfaceRow {
    pub fn token_list(&self) -> impl Iterator<Item = &str> {
        self.search_tokens.split(' ').filter(|t| !t.is_empty())
    }

    pub fn phonetic_list(&self) -> impl Iterator<Item = &str> {
        self.phonetic_tokens.split(' ').filter(|t| !t.is_empty())
    }
}

/// Precomputed per-trip rollup metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub trip_id: i64,
    pub total_nights: i64,
    pub total_hotels: i64,
    pub total_activities: i64,
    pub total_cost: f64,
    pub transit_minutes: i64,
    pub traveler_count: i64,
    pub traveler_names: Vec<String>,
    pub traveler_emails: Vec<String>,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub last_computed: DateTime<Utc>,
}

/// "Derived rows for this trip may be stale"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyQueueEntry {
    /// Arrival order
    pub seq: i64,
    pub trip_id: i64,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_dates_parse() {
        let trip = TripRecord {
            start_date: Some("2025-06-01".into()),
            end_date: Some(" 2025-06-08 ".into()),
            ..Default::default()
        };
        assert_eq!(trip.parsed_start(), NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(trip.parsed_end(), NaiveDate::from_ymd_opt(2025, 6, 8));
    }

    #[test]
    fn test_malformed_dates_are_none() {
        let trip = TripRecord {
            start_date: Some("June 1st".into()),
            end_date: None,
            ..Default::default()
        };
        assert_eq!(trip.parsed_start(), None);
        assert_eq!(trip.parsed_end(), None);
    }

    #[test]
    fn test_contact_display_name() {
        let full = ContactRecord {
            email: "a@b.c".into(),
            first_name: Some("Stephanie".into()),
            last_name: Some("Chisholm".into()),
        };
        assert_eq!(full.display_name().as_deref(), Some("Stephanie Chisholm"));

        let first_only = ContactRecord {
            email: "a@b.c".into(),
            first_name: Some("Liam".into()),
            last_name: Some("  ".into()),
        };
        assert_eq!(first_only.display_name().as_deref(), Some("Liam"));

        let empty = ContactRecord { email: "a@b.c".into(), first_name: None, last_name: None };
        assert_eq!(empty.display_name(), None);
    }

    #[test]
    fn test_activity_kind_database_roundtrip() {
        for kind in [ActivityKind::Hotel, ActivityKind::Activity, ActivityKind::Flight] {
            assert_eq!(ActivityKind::from_database_str(kind.to_database_str()), kind);
        }
        assert_eq!(ActivityKind::from_database_str("spa"), ActivityKind::Other);
    }

    #[test]
    fn test_surface_token_lists_skip_empty() {
        let row = SearchSurfaceRow {
            trip_id: 1,
            trip_name: String::new(),
            slug: String::new(),
            status: String::new(),
            start_date: None,
            end_date: None,
            destinations: None,
            primary_contact_name: None,
            primary_contact_email: None,
            traveler_names: vec![],
            traveler_emails: vec![],
            normalized_name: String::new(),
            normalized_destinations: String::new(),
            normalized_travelers: String::new(),
            normalized_emails: String::new(),
            search_tokens: "1 rome".into(),
            phonetic_tokens: String::new(),
            traveler_count: 0,
        };
        assert_eq!(row.token_list().collect::<Vec<_>>(), vec!["1", "rome"]);
        assert_eq!(row.phonetic_list().count(), 0);
    }
}

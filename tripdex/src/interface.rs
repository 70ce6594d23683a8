//! Tripdex service interface.
//!
//! Result records returned by the three tool-facing operations, the error type
//! they share, and the trait the store implements.

use crate::models::FactRow;
use crate::ranking::MatchReason;
use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One ranked trip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub trip_id: i64,
    pub trip_name: String,
    pub slug: String,
    pub score: f64,
    /// Signals that fired, in precedence order
    pub match_reasons: Vec<MatchReason>,
    /// Row tokens that satisfied a signal (correct spellings for phonetic hits)
    pub matched_tokens: Vec<String>,
    pub traveler_names: Vec<String>,
    pub traveler_emails: Vec<String>,
    pub traveler_count: i64,
}

/// Search result container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub matches: Vec<MatchResult>,
    pub total: usize,
}

/// How a surface refresh selected its trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// One explicitly named trip
    Single,
    /// One configured batch from the dirty queue
    Drain,
    /// The dirty queue until empty
    DrainAll,
}

/// Outcome of `refresh_trip_search_surface`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub mode: RefreshMode,
}

/// Error type for Tripdex operations
#[derive(Debug, Error)]
pub enum TripdexError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Operations exposed to the tool layer.
pub trait TripSearchApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Refresh search surface rows. A given `trip_id` wins over `drain_all`;
    /// with neither, one batch of the dirty queue is drained.
    fn refresh_trip_search_surface(&self, trip_id: Option<i64>, drain_all: bool) -> Result<RefreshReport, TripdexError>;

    /// Recompute a trip's fact row. `None` when the trip does not exist.
    fn refresh_trip_facts(&self, trip_id: i64) -> Result<Option<FactRow>, TripdexError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ranked fuzzy search. Empty query returns no matches.
    fn search_trips(&self, query: &str, limit: Option<i64>) -> Result<SearchResponse, TripdexError>;
}

impl From<crate::database::DatabaseError> for TripdexError {
    fn from(e: crate::database::DatabaseError) -> Self {
        TripdexError::Database(e.to_string())
    }
}

impl From<crate::config::ConfigError> for TripdexError {
    fn from(e: crate::config::ConfigError) -> Self {
        TripdexError::Config(e.to_string())
    }
}

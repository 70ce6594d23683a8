//! TripStore - main API for the tool layer.
//!
//! Owns the pooled database and the configuration, and maps the three
//! tool-facing operations onto the synchronizer, the fact aggregator and
//! the ranker.

use crate::config::TripdexConfig;
use crate::database::Database;
use crate::facts;
use crate::interface::{RefreshMode, RefreshReport, SearchResponse, TripSearchApi, TripdexError};
use crate::models::FactRow;
use crate::search;
use crate::surface;
use std::sync::{Arc, Once};
use tracing::{info, info_span};

static RAYON_INIT: Once = Once::new();

/// Initialize the global Rayon pool used for scoring, leaving one core free.
fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let rayon_threads = num_threads.saturating_sub(1).max(1);

        // Err only when a global pool is already installed
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("tripdex-rayon-{}", i))
            .build_global();
    });
}

/// Thread-safe trip search store.
///
/// The database is an r2d2 pool, so concurrent readers never block each
/// other; surface and fact writes each run in their own transaction.
pub struct TripStore {
    db: Arc<Database>,
    config: TripdexConfig,
}

impl TripStore {
    /// Open (creating if needed) the database named by `config`.
    pub fn open(config: TripdexConfig) -> Result<Self, TripdexError> {
        config.validate()?;
        init_rayon();
        let db = Database::open(&config.database_path, config.pool_size)?;
        info!(path = %config.database_path.display(), pool_size = config.pool_size, "trip store opened");
        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    /// Create a store with an in-memory database (for testing)
    #[cfg(test)]
    pub(crate) fn new_in_memory() -> Result<Self, TripdexError> {
        init_rayon();
        Ok(Self {
            db: Arc::new(Database::open_in_memory()?),
            config: TripdexConfig::default(),
        })
    }

    /// Direct database access for writers of source records
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Queue a trip for surface refresh. Returns the entry's sequence number.
    pub fn mark_dirty(&self, trip_id: i64, reason: Option<&str>) -> Result<i64, TripdexError> {
        validate_trip_id(trip_id)?;
        Ok(self.db.mark_dirty(trip_id, reason)?)
    }
}

fn validate_trip_id(trip_id: i64) -> Result<(), TripdexError> {
    if trip_id <= 0 {
        return Err(TripdexError::InvalidInput(format!("trip id must be positive, got {}", trip_id)));
    }
    Ok(())
}

impl TripSearchApi for TripStore {
    fn refresh_trip_search_surface(&self, trip_id: Option<i64>, drain_all: bool) -> Result<RefreshReport, TripdexError> {
        let span = info_span!("refresh_surface", ?trip_id, drain_all);
        let _enter = span.enter();

        let report = match trip_id {
            Some(id) => {
                validate_trip_id(id)?;
                let refreshed = surface::refresh_trip(&self.db, id)?.map_or(0, |_| 1);
                RefreshReport { refreshed, mode: RefreshMode::Single }
            }
            None if drain_all => RefreshReport {
                refreshed: surface::refresh_dirty(&self.db, None)?,
                mode: RefreshMode::DrainAll,
            },
            None => RefreshReport {
                refreshed: surface::refresh_dirty(&self.db, Some(self.config.sync.dirty_batch_size))?,
                mode: RefreshMode::Drain,
            },
        };

        info!(refreshed = report.refreshed, mode = ?report.mode, "search surface refresh finished");
        Ok(report)
    }

    fn refresh_trip_facts(&self, trip_id: i64) -> Result<Option<FactRow>, TripdexError> {
        validate_trip_id(trip_id)?;
        Ok(facts::refresh_trip_facts(&self.db, trip_id)?)
    }

    fn search_trips(&self, query: &str, limit: Option<i64>) -> Result<SearchResponse, TripdexError> {
        let span = info_span!("search_trips", query, ?limit);
        let _enter = span.enter();

        let options = self.config.search.options(limit);
        let matches = search::search(&self.db, query, &options)?;
        Ok(SearchResponse {
            query: query.to_string(),
            total: matches.len(),
            matches,
        })
    }
}

//! SQLite database layer for trip source data and derived rows
//!
//! Source tables (`trips`, `client_assignments`, `contacts`, `trip_activities`,
//! `trip_line_items`, `trip_legs`) belong to the trip-management system; this
//! crate reads them and owns `trip_search_surface`, `trip_facts` and the
//! `trip_search_dirty` queue.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::models::{
    ActivityEntry, ClientAssignment, ContactRecord, DirtyQueueEntry, FactRow, LineItem,
    SearchSurfaceRow, TripLeg, TripRecord,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("List column encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid stored timestamp: {0:?}")]
    Timestamp(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse timestamp string from database to DateTime<Utc>
fn parse_db_timestamp(timestamp_str: &str) -> DatabaseResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .map_err(|_| DatabaseError::Timestamp(timestamp_str.to_string()))
}

fn format_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Per-connection setup shared by file and in-memory pools
const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA foreign_keys=ON;
    PRAGMA busy_timeout=5000;
";

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets readers proceed while a refresh holds the write lock.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        });

        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        });

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trips (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'draft',
                start_date TEXT,
                end_date TEXT,
                destinations TEXT,
                primary_contact_name TEXT,
                primary_contact_email TEXT
            );

            CREATE TABLE IF NOT EXISTS contacts (
                email TEXT PRIMARY KEY COLLATE NOCASE,
                first_name TEXT,
                last_name TEXT
            );

            CREATE TABLE IF NOT EXISTS client_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL DEFAULT 0,
                email TEXT,
                name TEXT,
                role TEXT
            );

            CREATE TABLE IF NOT EXISTS trip_activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
                day_number INTEGER,
                kind TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                cost REAL
            );

            CREATE TABLE IF NOT EXISTS trip_line_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
                description TEXT NOT NULL DEFAULT '',
                amount REAL
            );

            CREATE TABLE IF NOT EXISTS trip_legs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL DEFAULT 0,
                transit_minutes INTEGER
            );

            CREATE TABLE IF NOT EXISTS trip_search_surface (
                trip_id INTEGER PRIMARY KEY,
                trip_name TEXT NOT NULL,
                slug TEXT NOT NULL,
                status TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                destinations TEXT,
                primary_contact_name TEXT,
                primary_contact_email TEXT,
                traveler_names TEXT NOT NULL DEFAULT '[]',
                traveler_emails TEXT NOT NULL DEFAULT '[]',
                normalized_name TEXT NOT NULL DEFAULT '',
                normalized_destinations TEXT NOT NULL DEFAULT '',
                normalized_travelers TEXT NOT NULL DEFAULT '',
                normalized_emails TEXT NOT NULL DEFAULT '',
                search_tokens TEXT NOT NULL DEFAULT '',
                phonetic_tokens TEXT NOT NULL DEFAULT '',
                traveler_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS trip_facts (
                trip_id INTEGER PRIMARY KEY,
                total_nights INTEGER NOT NULL DEFAULT 0,
                total_hotels INTEGER NOT NULL DEFAULT 0,
                total_activities INTEGER NOT NULL DEFAULT 0,
                total_cost REAL NOT NULL DEFAULT 0,
                transit_minutes INTEGER NOT NULL DEFAULT 0,
                traveler_count INTEGER NOT NULL DEFAULT 0,
                traveler_names TEXT NOT NULL DEFAULT '[]',
                traveler_emails TEXT NOT NULL DEFAULT '[]',
                primary_contact_name TEXT,
                primary_contact_email TEXT,
                last_computed TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS trip_search_dirty (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                trip_id INTEGER NOT NULL,
                reason TEXT,
                queued_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assignments_trip ON client_assignments(trip_id, ordinal);
            CREATE INDEX IF NOT EXISTS idx_activities_trip ON trip_activities(trip_id);
            CREATE INDEX IF NOT EXISTS idx_line_items_trip ON trip_line_items(trip_id);
            CREATE INDEX IF NOT EXISTS idx_legs_trip ON trip_legs(trip_id);
            CREATE INDEX IF NOT EXISTS idx_dirty_trip ON trip_search_dirty(trip_id);
        "#,
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Source writes (mutation hooks of the trip-management system)
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a trip and return its ID. `trip.id` is ignored.
    pub fn insert_trip(&self, trip: &TripRecord) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO trips (name, slug, status, start_date, end_date, destinations, primary_contact_name, primary_contact_email)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                trip.name,
                trip.slug,
                trip.status,
                trip.start_date,
                trip.end_date,
                trip.destinations,
                trip.primary_contact_name,
                trip.primary_contact_email,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite the mutable fields of an existing trip
    pub fn update_trip(&self, trip: &TripRecord) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE trips SET name = ?1, slug = ?2, status = ?3, start_date = ?4, end_date = ?5,
                   destinations = ?6, primary_contact_name = ?7, primary_contact_email = ?8
               WHERE id = ?9"#,
            params![
                trip.name,
                trip.slug,
                trip.status,
                trip.start_date,
                trip.end_date,
                trip.destinations,
                trip.primary_contact_name,
                trip.primary_contact_email,
                trip.id,
            ],
        )?;
        Ok(())
    }

    /// Delete a trip (CASCADE handles its source children, not derived rows)
    pub fn delete_trip(&self, trip_id: i64) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM trips WHERE id = ?1", [trip_id])?;
        Ok(())
    }

    pub fn upsert_contact(&self, contact: &ContactRecord) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO contacts (email, first_name, last_name) VALUES (?1, ?2, ?3)",
            params![contact.email, contact.first_name, contact.last_name],
        )?;
        Ok(())
    }

    pub fn insert_assignment(&self, assignment: &ClientAssignment) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO client_assignments (trip_id, ordinal, email, name, role) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                assignment.trip_id,
                assignment.ordinal,
                assignment.email,
                assignment.name,
                assignment.role,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_activity(&self, activity: &ActivityEntry) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO trip_activities (trip_id, day_number, kind, name, cost) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                activity.trip_id,
                activity.day_number,
                activity.kind.to_database_str(),
                activity.name,
                activity.cost,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_line_item(&self, item: &LineItem) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO trip_line_items (trip_id, description, amount) VALUES (?1, ?2, ?3)",
            params![item.trip_id, item.description, item.amount],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_leg(&self, leg: &TripLeg) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO trip_legs (trip_id, ordinal, transit_minutes) VALUES (?1, ?2, ?3)",
            params![leg.trip_id, leg.ordinal, leg.transit_minutes],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Source reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn fetch_trip(&self, trip_id: i64) -> DatabaseResult<Option<TripRecord>> {
        let conn = self.get_conn()?;
        let trip = conn
            .query_row(
                r#"SELECT id, name, slug, status, start_date, end_date, destinations, primary_contact_name, primary_contact_email
                   FROM trips WHERE id = ?1"#,
                [trip_id],
                Self::row_to_trip,
            )
            .optional()?;
        Ok(trip)
    }

    /// Assignments for a trip in roster order
    pub fn fetch_assignments(&self, trip_id: i64) -> DatabaseResult<Vec<ClientAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, trip_id, ordinal, email, name, role FROM client_assignments WHERE trip_id = ?1 ORDER BY ordinal, id",
        )?;
        let rows = stmt
            .query_map([trip_id], |row| {
                Ok(ClientAssignment {
                    id: row.get(0)?,
                    trip_id: row.get(1)?,
                    ordinal: row.get(2)?,
                    email: row.get(3)?,
                    name: row.get(4)?,
                    role: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Contacts matching the given emails, keyed by lowercased email
    pub fn fetch_contacts_by_emails(&self, emails: &[&str]) -> DatabaseResult<HashMap<String, ContactRecord>> {
        if emails.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let placeholders = emails.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT email, first_name, last_name FROM contacts WHERE email IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let contacts = stmt
            .query_map(rusqlite::params_from_iter(emails.iter()), |row| {
                Ok(ContactRecord {
                    email: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(contacts
            .into_iter()
            .map(|c| (c.email.to_lowercase(), c))
            .collect())
    }

    /// Activity rollups for a trip: (hotel count, activity count, summed cost).
    /// Missing rows and NULL costs count as zero.
    pub fn fetch_activity_totals(&self, trip_id: i64) -> DatabaseResult<(i64, i64, f64)> {
        let conn = self.get_conn()?;
        let totals = conn.query_row(
            r#"SELECT COALESCE(SUM(CASE WHEN kind = 'hotel' THEN 1 ELSE 0 END), 0),
                      COALESCE(SUM(CASE WHEN kind = 'activity' THEN 1 ELSE 0 END), 0),
                      COALESCE(SUM(cost), 0.0)
               FROM trip_activities WHERE trip_id = ?1"#,
            [trip_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(totals)
    }

    pub fn fetch_line_item_total(&self, trip_id: i64) -> DatabaseResult<f64> {
        let conn = self.get_conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM trip_line_items WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn fetch_transit_minutes(&self, trip_id: i64) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(transit_minutes), 0) FROM trip_legs WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Highest itinerary day number, used when a trip has no usable dates
    pub fn fetch_max_day_number(&self, trip_id: i64) -> DatabaseResult<Option<i64>> {
        let conn = self.get_conn()?;
        let max_day = conn.query_row(
            "SELECT MAX(day_number) FROM trip_activities WHERE trip_id = ?1",
            [trip_id],
            |row| row.get(0),
        )?;
        Ok(max_day)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search surface
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the surface row for `row.trip_id` in one IMMEDIATE transaction,
    /// so concurrent refreshes of the same trip never interleave.
    pub fn replace_surface_row(&self, row: &SearchSurfaceRow) -> DatabaseResult<()> {
        let traveler_names = serde_json::to_string(&row.traveler_names)?;
        let traveler_emails = serde_json::to_string(&row.traveler_emails)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM trip_search_surface WHERE trip_id = ?1", [row.trip_id])?;
        tx.execute(
            r#"INSERT INTO trip_search_surface (
                   trip_id, trip_name, slug, status, start_date, end_date, destinations,
                   primary_contact_name, primary_contact_email, traveler_names, traveler_emails,
                   normalized_name, normalized_destinations, normalized_travelers, normalized_emails,
                   search_tokens, phonetic_tokens, traveler_count)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"#,
            params![
                row.trip_id,
                row.trip_name,
                row.slug,
                row.status,
                row.start_date,
                row.end_date,
                row.destinations,
                row.primary_contact_name,
                row.primary_contact_email,
                traveler_names,
                traveler_emails,
                row.normalized_name,
                row.normalized_destinations,
                row.normalized_travelers,
                row.normalized_emails,
                row.search_tokens,
                row.phonetic_tokens,
                row.traveler_count,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    const SURFACE_COLUMNS: &'static str = r#"trip_id, trip_name, slug, status, start_date, end_date, destinations,
        primary_contact_name, primary_contact_email, traveler_names, traveler_emails,
        normalized_name, normalized_destinations, normalized_travelers, normalized_emails,
        search_tokens, phonetic_tokens, traveler_count"#;

    pub fn fetch_surface_row(&self, trip_id: i64) -> DatabaseResult<Option<SearchSurfaceRow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM trip_search_surface WHERE trip_id = ?1",
            Self::SURFACE_COLUMNS
        );
        let raw = conn.query_row(&sql, [trip_id], Self::row_to_raw_surface).optional()?;
        raw.map(RawSurfaceRow::decode).transpose()
    }

    /// Every surface row, ordered by trip id
    pub fn fetch_all_surface_rows(&self) -> DatabaseResult<Vec<SearchSurfaceRow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM trip_search_surface ORDER BY trip_id",
            Self::SURFACE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], Self::row_to_raw_surface)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawSurfaceRow::decode).collect()
    }

    pub fn count_surface_rows(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trip_search_surface", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Facts
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the fact row for `facts.trip_id` in one IMMEDIATE transaction
    pub fn replace_fact_row(&self, facts: &FactRow) -> DatabaseResult<()> {
        let traveler_names = serde_json::to_string(&facts.traveler_names)?;
        let traveler_emails = serde_json::to_string(&facts.traveler_emails)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM trip_facts WHERE trip_id = ?1", [facts.trip_id])?;
        tx.execute(
            r#"INSERT INTO trip_facts (
                   trip_id, total_nights, total_hotels, total_activities, total_cost, transit_minutes,
                   traveler_count, traveler_names, traveler_emails, primary_contact_name,
                   primary_contact_email, last_computed)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                facts.trip_id,
                facts.total_nights,
                facts.total_hotels,
                facts.total_activities,
                facts.total_cost,
                facts.transit_minutes,
                facts.traveler_count,
                traveler_names,
                traveler_emails,
                facts.primary_contact_name,
                facts.primary_contact_email,
                format_db_timestamp(facts.last_computed),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn fetch_fact_row(&self, trip_id: i64) -> DatabaseResult<Option<FactRow>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"SELECT trip_id, total_nights, total_hotels, total_activities, total_cost, transit_minutes,
                          traveler_count, traveler_names, traveler_emails, primary_contact_name,
                          primary_contact_email, last_computed
                   FROM trip_facts WHERE trip_id = ?1"#,
                [trip_id],
                |row| {
                    let names: String = row.get(7)?;
                    let emails: String = row.get(8)?;
                    let last_computed: String = row.get(11)?;
                    Ok((
                        FactRow {
                            trip_id: row.get(0)?,
                            total_nights: row.get(1)?,
                            total_hotels: row.get(2)?,
                            total_activities: row.get(3)?,
                            total_cost: row.get(4)?,
                            transit_minutes: row.get(5)?,
                            traveler_count: row.get(6)?,
                            traveler_names: Vec::new(),
                            traveler_emails: Vec::new(),
                            primary_contact_name: row.get(9)?,
                            primary_contact_email: row.get(10)?,
                            last_computed: DateTime::<Utc>::MIN_UTC,
                        },
                        names,
                        emails,
                        last_computed,
                    ))
                },
            )
            .optional()?;

        match raw {
            Some((mut facts, names, emails, last_computed)) => {
                facts.last_computed = parse_db_timestamp(&last_computed)?;
                facts.traveler_names = serde_json::from_str(&names)?;
                facts.traveler_emails = serde_json::from_str(&emails)?;
                Ok(Some(facts))
            }
            None => Ok(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dirty queue
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a trip for refresh. Duplicates are allowed.
    pub fn mark_dirty(&self, trip_id: i64, reason: Option<&str>) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO trip_search_dirty (trip_id, reason, queued_at) VALUES (?1, ?2, ?3)",
            params![trip_id, reason, format_db_timestamp(Utc::now())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Pending entries in arrival order, at most `limit` when given
    pub fn fetch_dirty(&self, limit: Option<usize>) -> DatabaseResult<Vec<DirtyQueueEntry>> {
        let conn = self.get_conn()?;
        // LIMIT -1 means "no limit" in SQLite
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT seq, trip_id, reason FROM trip_search_dirty ORDER BY seq ASC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map([limit], |row| {
                Ok(DirtyQueueEntry {
                    seq: row.get(0)?,
                    trip_id: row.get(1)?,
                    reason: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Acknowledge a trip's entries up to and including `max_seq`.
    /// Entries queued after the batch was read stay pending.
    pub fn ack_dirty(&self, trip_id: i64, max_seq: i64) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM trip_search_dirty WHERE trip_id = ?1 AND seq <= ?2",
            params![trip_id, max_seq],
        )?;
        Ok(deleted)
    }

    pub fn count_dirty(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trip_search_dirty", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Run arbitrary SQL, for tests that need to break the schema
    #[cfg(test)]
    pub(crate) fn execute_batch_for_test(&self, sql: &str) -> DatabaseResult<()> {
        self.get_conn()?.execute_batch(sql)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Row mapping
    // ─────────────────────────────────────────────────────────────────────────

    fn row_to_trip(row: &rusqlite::Row) -> rusqlite::Result<TripRecord> {
        Ok(TripRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            status: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            destinations: row.get(6)?,
            primary_contact_name: row.get(7)?,
            primary_contact_email: row.get(8)?,
        })
    }

    fn row_to_raw_surface(row: &rusqlite::Row) -> rusqlite::Result<RawSurfaceRow> {
        Ok(RawSurfaceRow {
            row: SearchSurfaceRow {
                trip_id: row.get(0)?,
                trip_name: row.get(1)?,
                slug: row.get(2)?,
                status: row.get(3)?,
                start_date: row.get(4)?,
                end_date: row.get(5)?,
                destinations: row.get(6)?,
                primary_contact_name: row.get(7)?,
                primary_contact_email: row.get(8)?,
                traveler_names: Vec::new(),
                traveler_emails: Vec::new(),
                normalized_name: row.get(11)?,
                normalized_destinations: row.get(12)?,
                normalized_travelers: row.get(13)?,
                normalized_emails: row.get(14)?,
                search_tokens: row.get(15)?,
                phonetic_tokens: row.get(16)?,
                traveler_count: row.get(17)?,
            },
            traveler_names: row.get(9)?,
            traveler_emails: row.get(10)?,
        })
    }
}

/// Surface row with its JSON list columns not yet decoded
struct RawSurfaceRow {
    row: SearchSurfaceRow,
    traveler_names: String,
    traveler_emails: String,
}

impl RawSurfaceRow {
    fn decode(self) -> DatabaseResult<SearchSurfaceRow> {
        let mut row = self.row;
        row.traveler_names = serde_json::from_str(&self.traveler_names)?;
        row.traveler_emails = serde_json::from_str(&self.traveler_emails)?;
        Ok(row)
    }
}

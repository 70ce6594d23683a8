//! Tripdex - fuzzy trip search for a travel-planning backend
//!
//! Keeps a denormalized search surface and a per-trip fact table in step with
//! the source tables (trips, travelers, itinerary, costs), and ranks trips
//! against free-text queries with exact, token, phonetic and partial signals.
//!
//! Storage is SQLite behind an r2d2 pool; scoring runs on rayon.

pub mod config;
pub mod database;
pub mod facts;
pub mod interface;
pub mod models;
pub mod phonetic;
pub mod ranking;
pub mod roster;
pub mod search;
mod store;
pub mod surface;
pub mod tokenizer;

pub use config::TripdexConfig;
pub use interface::*;
pub use store::TripStore;

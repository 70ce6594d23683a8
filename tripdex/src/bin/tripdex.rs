//! Command-line front end for the trip search store.
//!
//! Usage:
//!     tripdex [--config tripdex.json] [--database trips.sqlite3] <command>
//!
//! Every command prints its result as JSON on stdout; logs go to stderr and
//! follow `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tripdex::{TripSearchApi, TripStore, TripdexConfig};

#[derive(Parser, Debug)]
#[command(name = "tripdex", about = "Fuzzy trip search over a travel-planning database")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config and environment)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh search surface rows (one trip, one queue batch, or the whole queue)
    Refresh {
        #[arg(long)]
        trip_id: Option<i64>,
        #[arg(long)]
        drain_all: bool,
    },
    /// Recompute a trip's rollup facts
    Facts { trip_id: i64 },
    /// Ranked fuzzy search
    Search {
        query: String,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Queue a trip for surface refresh
    MarkDirty {
        trip_id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Serialize)]
struct MarkDirtyOutput {
    trip_id: i64,
    seq: i64,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = TripdexConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    let store = TripStore::open(config).context("opening trip store")?;

    match cli.command {
        Command::Refresh { trip_id, drain_all } => {
            let report = store.refresh_trip_search_surface(trip_id, drain_all)?;
            print_json(&report, cli.pretty)
        }
        Command::Facts { trip_id } => {
            let facts = store.refresh_trip_facts(trip_id)?;
            print_json(&facts, cli.pretty)
        }
        Command::Search { query, limit } => {
            let response = store.search_trips(&query, limit)?;
            print_json(&response, cli.pretty)
        }
        Command::MarkDirty { trip_id, reason } => {
            let seq = store.mark_dirty(trip_id, reason.as_deref())?;
            print_json(&MarkDirtyOutput { trip_id, seq }, cli.pretty)
        }
    }
}

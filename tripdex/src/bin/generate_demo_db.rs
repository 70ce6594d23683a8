//! Generate a demo trip database.
//!
//! Creates the SQLite file through the library's own `Database`, so the
//! schema always matches. Seeds one hand-written scenario trip ("European
//! Adventure") plus randomly assembled trips with travelers, itinerary
//! entries, line items and legs, and queues every trip as dirty.
//!
//! Usage:
//!     cargo run --release --bin generate-demo-db -- [output_path] [--trips N] [--seed S]
//!
//! Default output: demo-data/tripdex_demo.sqlite3

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tripdex::database::Database;
use tripdex::models::{ActivityEntry, ActivityKind, ClientAssignment, ContactRecord, LineItem, TripLeg, TripRecord};
use tripdex::tokenizer::normalize_text;

#[derive(Parser, Debug)]
#[command(name = "generate-demo-db")]
struct Args {
    /// Output SQLite file (replaced if it exists)
    output: Option<PathBuf>,

    /// Number of random trips on top of the scenario trip
    #[arg(long, default_value_t = 500)]
    trips: usize,

    /// RNG seed for reproducible data
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

const DESTINATIONS: &[&str] = &[
    "Dublin", "London", "Stoneleigh", "Lisbon", "Porto", "Kyoto", "Osaka", "Reykjavik", "Marrakesh",
    "Edinburgh", "Galway", "Seville", "Florence", "Vienna", "Prague", "Queenstown", "Cusco", "Hanoi",
];

const THEMES: &[&str] = &[
    "Adventure", "Food Week", "Honeymoon", "Family Escape", "Golf Tour", "Art Weekend", "Hiking Trip",
    "Wine Country", "Anniversary", "Spring Break",
];

const FIRST_NAMES: &[&str] = &[
    "Stephanie", "Liam", "Aoife", "Marta", "Oliver", "Aiko", "Ken", "Siobhan", "Niamh", "Diego", "Priya",
    "Catherine", "Kathryn", "Jon", "Sean",
];

const LAST_NAMES: &[&str] = &[
    "Chisholm", "Byrne", "Silva", "Grant", "Tanaka", "McLoughlin", "Featherstonehaugh", "Knight", "Ramirez",
    "Okafor", "Schmidt", "Nguyen", "Kavanagh",
];

const STATUSES: &[&str] = &["draft", "proposal", "confirmed", "completed"];

const ACTIVITY_NAMES: &[&str] = &[
    "City walking tour", "Cooking class", "Museum pass", "Boat cruise", "Castle visit", "Tasting dinner",
];

fn scenario_trip(db: &Database) -> Result<i64> {
    let id = db.insert_trip(&TripRecord {
        name: "European Adventure - Dublin, London & Stoneleigh".into(),
        slug: "european-adventure-dublin-london-stoneleigh-2025".into(),
        status: "proposal".into(),
        start_date: Some("2025-09-10".into()),
        end_date: Some("2025-09-20".into()),
        destinations: Some("Dublin, London, Stoneleigh".into()),
        primary_contact_name: Some("Stephanie Chisholm".into()),
        primary_contact_email: Some("stephanie.chisholm@example.com".into()),
        ..Default::default()
    })?;
    db.insert_assignment(&ClientAssignment {
        trip_id: id,
        ordinal: 1,
        role: Some("traveler".into()),
        ..Default::default()
    })?;
    db.insert_activity(&ActivityEntry {
        trip_id: id,
        day_number: Some(1),
        kind: ActivityKind::Hotel,
        name: "The Merrion".into(),
        cost: Some(1_450.0),
    })?;
    db.insert_activity(&ActivityEntry {
        trip_id: id,
        day_number: Some(6),
        kind: ActivityKind::Hotel,
        name: "Stoneleigh Abbey Lodge".into(),
        cost: Some(980.0),
    })?;
    db.insert_leg(&TripLeg { trip_id: id, ordinal: 0, transit_minutes: Some(75) })?;
    db.insert_leg(&TripLeg { trip_id: id, ordinal: 1, transit_minutes: Some(110) })?;
    db.mark_dirty(id, Some("trip_created"))?;
    Ok(id)
}

fn random_trip(db: &Database, rng: &mut StdRng, index: usize) -> Result<i64> {
    let stops = rng.gen_range(1..=3);
    let picked: Vec<&str> = DESTINATIONS.choose_multiple(rng, stops).copied().collect();
    let theme = THEMES[rng.gen_range(0..THEMES.len())];
    let name = format!("{} {}", picked.join(" & "), theme);
    let slug = format!("{}-{}", normalize_text(&name).replace(' ', "-"), index);

    let (first, last) = (
        FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
        LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())],
    );
    let primary_email = format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), index);

    let month = rng.gen_range(1..=12);
    let start_day = rng.gen_range(1..=18);
    let nights = rng.gen_range(2..=9);
    let has_dates = rng.gen_bool(0.8);

    let id = db.insert_trip(&TripRecord {
        name,
        slug,
        status: STATUSES[rng.gen_range(0..STATUSES.len())].into(),
        start_date: has_dates.then(|| format!("2025-{:02}-{:02}", month, start_day)),
        end_date: has_dates.then(|| format!("2025-{:02}-{:02}", month, start_day + nights)),
        destinations: Some(picked.join(", ")),
        primary_contact_name: Some(format!("{} {}", first, last)),
        primary_contact_email: Some(primary_email),
        ..Default::default()
    })?;

    for ordinal in 1..=rng.gen_range(0..=3) {
        let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        let email = rng
            .gen_bool(0.7)
            .then(|| format!("{}.{}.{}@example.com", first.to_lowercase(), last.to_lowercase(), id));
        if let Some(email) = &email {
            // Names for half the companions come from the contact book only
            if rng.gen_bool(0.5) {
                db.upsert_contact(&ContactRecord {
                    email: email.clone(),
                    first_name: Some(first.into()),
                    last_name: Some(last.into()),
                })?;
            }
        }
        let name = (email.is_none() || rng.gen_bool(0.5)).then(|| format!("{} {}", first, last));
        db.insert_assignment(&ClientAssignment {
            trip_id: id,
            ordinal,
            email,
            name,
            role: Some("traveler".into()),
            ..Default::default()
        })?;
    }

    for day in 1..=nights + 1 {
        if day <= nights && rng.gen_bool(0.4) {
            db.insert_activity(&ActivityEntry {
                trip_id: id,
                day_number: Some(day),
                kind: ActivityKind::Hotel,
                name: format!("Hotel night {}", day),
                cost: Some(rng.gen_range(120.0..450.0_f64).round()),
            })?;
        }
        if rng.gen_bool(0.5) {
            db.insert_activity(&ActivityEntry {
                trip_id: id,
                day_number: Some(day),
                kind: ActivityKind::Activity,
                name: ACTIVITY_NAMES[rng.gen_range(0..ACTIVITY_NAMES.len())].into(),
                cost: rng.gen_bool(0.8).then(|| rng.gen_range(20.0..200.0_f64).round()),
            })?;
        }
    }

    if rng.gen_bool(0.6) {
        db.insert_line_item(&LineItem {
            trip_id: id,
            description: "Travel insurance".into(),
            amount: Some(rng.gen_range(40.0..180.0_f64).round()),
        })?;
    }

    for ordinal in 0..stops as i64 {
        db.insert_leg(&TripLeg {
            trip_id: id,
            ordinal,
            transit_minutes: rng.gen_bool(0.9).then(|| rng.gen_range(30..=600)),
        })?;
    }

    db.mark_dirty(id, Some("trip_created"))?;
    Ok(id)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let output_path = args.output.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demo-data").join("tripdex_demo.sqlite3")
    });

    if output_path.exists() {
        std::fs::remove_file(&output_path)
            .with_context(|| format!("removing existing database {}", output_path.display()))?;
    }

    println!("Generating demo trip database...");
    println!("Output: {}", output_path.display());

    let db = Database::open(&output_path, 2).context("creating database")?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let scenario = scenario_trip(&db)?;
    for i in 0..args.trips {
        random_trip(&db, &mut rng, i)?;
        if (i + 1) % 100 == 0 {
            println!("  Generated {}/{} trips...", i + 1, args.trips);
        }
    }

    println!();
    println!("Database created: {}", output_path.display());
    println!("  Scenario trip id: {}", scenario);
    println!("  Trips: {}", args.trips + 1);
    println!("  Dirty entries: {}", db.count_dirty()?);
    println!("Run `tripdex --database {} refresh --drain-all` to build the search surface.", output_path.display());
    Ok(())
}

//! # Seed Data Generator
//!
//! Populates the database with a demo fleet for development.
//!
//! ## Usage
//! ```bash
//! # Use FLEETDESK_DATABASE_PATH (or ./fleetdesk.db)
//! cargo run -p fleetdesk-service --bin seed
//!
//! # Specify database path
//! cargo run -p fleetdesk-service --bin seed -- --db ./data/fleetdesk.db
//! ```
//!
//! ## Generated Units
//! One unit per (model, plate) pair across four classes:
//! - Vans (hourly and daily rates)
//! - Cars (hourly and daily rates)
//! - Bikes (hourly only)
//! - Scooters (hourly only)
//!
//! Every unit starts active and available.

use chrono::Utc;
use fleetdesk_core::{RentableUnit, UnitStatus};
use fleetdesk_db::repository::unit;
use fleetdesk_db::Database;
use fleetdesk_service::{init_tracing, ServiceConfig};
use std::env;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// (class, models, hourly cents, daily cents)
const FLEET: &[(&str, &[&str], i64, Option<i64>)] = &[
    ("VAN", &["Transit", "Sprinter", "Vivaro"], 8_000, Some(50_000)),
    ("CAR", &["Golf", "Corolla", "Clio", "Model 3"], 4_500, Some(30_000)),
    ("BIK", &["Trek FX", "Brompton"], 1_200, None),
    ("SCO", &["Vespa", "Niu N1"], 1_800, None),
];

/// Units generated per model.
const PER_MODEL: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServiceConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fleetdesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $FLEETDESK_DATABASE_PATH or ./fleetdesk.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing(&config.log_filter);

    println!("Fleetdesk Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.acquire().await?;
    let existing = unit::count_units(&mut conn).await?;
    if existing > 0 {
        println!("⚠ Database already has {} units", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating units...");

    let start = std::time::Instant::now();
    let mut generated = 0;

    for (class, models, hourly, daily) in FLEET {
        for model in models.iter() {
            for n in 1..=PER_MODEL {
                let unit = generate_unit(class, model, n, *hourly, *daily);

                if let Err(e) = unit::insert_unit(&mut conn, &unit).await {
                    eprintln!("Failed to insert {}: {}", unit.name, e);
                    continue;
                }
                generated += 1;
            }
        }
        println!("  {} done ({} units so far)", class, generated);
    }

    info!(generated, elapsed_ms = start.elapsed().as_millis() as u64, "Seed complete");

    println!();
    println!("✓ Generated {} units in {:?}", generated, start.elapsed());

    drop(conn);
    db.close().await;
    Ok(())
}

/// Builds one available, active unit named `{model} #{n} ({class})`.
fn generate_unit(class: &str, model: &str, n: usize, hourly: i64, daily: Option<i64>) -> RentableUnit {
    let now = Utc::now();

    // Later units of a model are a little cheaper (older stock)
    let discount = (n as i64 - 1) * 100;

    RentableUnit {
        id: Uuid::new_v4().to_string(),
        name: format!("{} #{} ({})", model, n, class),
        price_per_hour_cents: hourly - discount,
        price_per_day_cents: daily.map(|d| d - discount * 6),
        is_active: true,
        status: UnitStatus::Available,
        created_at: now,
        updated_at: now,
    }
}

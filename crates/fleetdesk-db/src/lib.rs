//! # fleetdesk-db: Database Layer for Fleetdesk
//!
//! SQLite persistence for reservations, their lines, and the units they book.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fleetdesk Data Flow                              │
//! │                                                                         │
//! │  ReservationService::create / cancel / staff_transition                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   fleetdesk-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  repository   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ reservation   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ unit          │    │ 0001_reser-  │  │   │
//! │  │   │ begin()       │    │ conflict      │    │ vations.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys, busy timeout)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use fleetdesk_db::{Database, DbConfig};
//! use fleetdesk_db::repository::reservation;
//!
//! let db = Database::new(DbConfig::new("./fleetdesk.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let r = reservation::lock_for_update(&mut *tx, &id).await?;
//! reservation::update_status(&mut *tx, &r.id, ReservationStatus::Confirmed, now).await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::conflict::{ConflictScan, ScanMode};
pub use repository::reservation::{NewLine, NewReservation};

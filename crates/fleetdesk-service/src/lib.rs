//! # fleetdesk-service: Reservation Facade
//!
//! The single entry point the HTTP layer uses to create, read, cancel and
//! move reservations through their lifecycle.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler (customer / staff)                                        │
//! │       │  caller id, staff flag, request DTO                             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               fleetdesk-service (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ReservationService ──► lifecycle::apply                       │   │
//! │  │        │   timeout, transaction, ServiceError                   │   │
//! │  │        │                                                        │   │
//! │  │   Clock (system / fixed)   ServiceConfig   init_tracing         │   │
//! │  └────────┼────────────────────────────────────────────────────────┘   │
//! │           │                                                             │
//! │     ┌─────┴──────────┐         ┌────────────────┐                      │
//! │     │ fleetdesk-core │         │  fleetdesk-db  │                      │
//! │     │ rules, pricing │         │ SQLite, locks  │                      │
//! │     └────────────────┘         └────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use fleetdesk_service::{init_tracing, ReservationService, ServiceConfig};
//!
//! let config = ServiceConfig::load()?;
//! init_tracing(&config.log_filter);
//!
//! let service = ReservationService::connect(&config).await?;
//! let reservation = service.create(&customer_id, request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod error;
mod lifecycle;
mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use service::ReservationService;
pub use telemetry::init_tracing;

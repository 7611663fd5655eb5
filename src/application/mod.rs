//! Application layer orchestrating the domain.
//!
//! Services consume repository traits and each other through explicit
//! injection; HTTP handlers only talk to services.
//!
//! # Modules
//!
//! - [`services::EntryService`] - Entry lifecycle (create, resolve, expire)
//! - [`services::StatsService`] - Global and per-domain statistics queries
//! - [`expiration`] - Volatile timers and durable reminders
//! - [`observers`] - Observer registry and statistics aggregators

pub mod expiration;
pub mod observers;
pub mod services;

//! Domain layer containing entities, events and repository contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Data access trait definitions
//! - [`events`] - Lifecycle events and scheduler signals
//! - [`expiration_worker`] - Background loop delivering scheduler signals
//!
//! # Expiration Flow
//!
//! 1. A timer or durable reminder fires and sends an [`events::ExpirationSignal`]
//! 2. [`expiration_worker::run_expiration_worker`] receives it from the channel
//! 3. The entry service checks the signal ticket and runs the expiration path
//! 4. An "expired" [`events::LifecycleEvent`] fans out to the statistics observers

pub mod entities;
pub mod events;
pub mod expiration_worker;
pub mod repositories;

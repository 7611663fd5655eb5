//! Business logic services for the application layer.

pub mod entry_service;
pub mod stats_service;

pub use entry_service::{CreatedLink, EntryService};
pub use stats_service::StatsService;

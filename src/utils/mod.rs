//! Helper functions shared across layers.
//!
//! - [`code_generator`] - Short code and scheduler ticket generation
//! - [`url_normalizer`] - URL validation and normalization
//! - [`extract_domain`] - Canonical domain keys for statistics lookups

pub mod code_generator;
pub mod extract_domain;
pub mod url_normalizer;

//! DTOs for link shortening endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::CreatedLink;

/// Upper bound accepted for `ttl_seconds` (one year).
pub const MAX_TTL_SECONDS: i64 = 31_536_000;

/// Warning attached to responses for plain-HTTP targets.
pub const INSECURE_TARGET_WARNING: &str = "Target URL uses plain HTTP";

/// Request to shorten a single URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The URL to shorten. Scheme and host are checked by the entry service.
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    /// Retire the link after its first successful resolution.
    #[serde(default)]
    pub one_shot: bool,

    /// Lifetime in seconds. Missing or `0` selects the default of 60 seconds.
    #[validate(range(min = 0, max = 31_536_000, message = "ttl_seconds out of range"))]
    pub ttl_seconds: Option<i64>,
}

/// Successful shortening result.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub code: String,
    pub target_url: String,
    pub domain: String,
    pub one_shot: bool,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<CreatedLink> for ShortenResponse {
    fn from(link: CreatedLink) -> Self {
        Self {
            warning: link.insecure.then(|| INSECURE_TARGET_WARNING.to_string()),
            short_url: link.short_url,
            code: link.code,
            target_url: link.target_url,
            domain: link.domain,
            one_shot: link.one_shot,
            expires_at: link.expires_at,
        }
    }
}

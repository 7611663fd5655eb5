//! Short code generation.
//!
//! Codes come from OS entropy, never from the URL, so they cannot be guessed
//! from a dictionary of targets.

use base64::Engine as _;
use rand::RngCore;

use crate::error::LifecycleError;
use crate::utils::url_normalizer::{NormalizedUrl, UrlNormalizationError, normalize_url};

/// Length of random bytes before base64 encoding.
const CODE_LENGTH_BYTES: usize = 9;

/// Result of issuing a code for a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub target: NormalizedUrl,
}

/// Generates a random short code.
///
/// Uses `getrandom` for entropy and encodes the result as URL-safe base64
/// without padding, producing a 12-character code. Falls back to the thread
/// RNG if the OS source is unavailable.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code();
/// assert_eq!(code.len(), 12);
/// ```
pub fn generate_code() -> String {
    let mut buffer = [0u8; CODE_LENGTH_BYTES];

    if let Err(e) = getrandom::fill(&mut buffer) {
        tracing::warn!(error = %e, "OS entropy unavailable, using thread RNG");
        rand::rng().fill_bytes(&mut buffer);
    }

    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer)
}

/// Random ticket identifying one scheduler arming.
pub fn generate_ticket() -> u64 {
    rand::random::<u64>()
}

/// Validates and normalizes a target URL.
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidUrl`] if `target` is not an absolute URL
/// with a host.
pub fn prepare_target(target: &str) -> Result<NormalizedUrl, LifecycleError> {
    normalize_url(target).map_err(|e| match e {
        UrlNormalizationError::InvalidFormat(reason) => LifecycleError::InvalidUrl(reason),
        other => LifecycleError::InvalidUrl(other.to_string()),
    })
}

/// Validates and normalizes `target` and issues a fresh code for it.
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidUrl`] if `target` is not an absolute URL
/// with a host.
pub fn issue_code(target: &str) -> Result<IssuedCode, LifecycleError> {
    let target = prepare_target(target)?;

    Ok(IssuedCode {
        code: generate_code(),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();

        assert_eq!(code.len(), 12);
        assert!(!code.contains('='));
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_code_produces_unique_codes() {
        let codes: HashSet<_> = (0..1000).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_issue_code_normalizes_and_flags() {
        let issued = issue_code("HTTP://Example.com/Docs").unwrap();

        assert_eq!(issued.target.url, "http://example.com/Docs");
        assert_eq!(issued.target.host, "example.com");
        assert!(issued.target.insecure);
        assert_eq!(issued.code.len(), 12);
    }

    #[test]
    fn test_issue_code_is_not_derived_from_url() {
        let a = issue_code("https://example.com").unwrap();
        let b = issue_code("https://example.com").unwrap();

        assert_ne!(a.code, b.code);
        assert!(!a.target.insecure);
    }

    #[test]
    fn test_issue_code_rejects_invalid() {
        for input in ["", "nope", "/relative/path", "mailto:a@b.c"] {
            assert!(matches!(
                issue_code(input),
                Err(LifecycleError::InvalidUrl(_))
            ));
        }
    }
}

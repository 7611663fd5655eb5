//! URL validation and normalization.
//!
//! Produces the canonical form stored with an entry, its domain, and the
//! insecure-scheme flag.

use url::Url;

/// Errors that can occur during URL normalization.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// A URL in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Canonical serialization.
    pub url: String,
    /// Lowercased host, used as the statistics domain.
    pub host: String,
    /// Set when the canonical form uses plain `http://`.
    pub insecure: bool,
}

/// Normalizes an absolute URL.
///
/// # Normalization Rules
///
/// 1. **Scheme**: any scheme is accepted, lowercased by the parser
/// 2. **Host**: required, converted to lowercase
/// 3. **Default ports**: removed (80 for HTTP, 443 for HTTPS)
/// 4. **Fragments**: removed
/// 5. **Path and query**: preserved, case-sensitive
///
/// # Errors
///
/// Returns [`UrlNormalizationError::InvalidFormat`] for relative or malformed input.
/// Returns [`UrlNormalizationError::MissingHost`] for URLs without an authority
/// (`mailto:`, `data:`, `file:///...`).
///
/// # Examples
///
/// ```ignore
/// let n = normalize_url("HTTP://Example.COM:80/Path#top").unwrap();
/// assert_eq!(n.url, "http://example.com/Path");
/// assert_eq!(n.host, "example.com");
/// assert!(n.insecure);
/// ```
pub fn normalize_url(input: &str) -> Result<NormalizedUrl, UrlNormalizationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlNormalizationError::InvalidFormat("empty input".to_string()));
    }

    let mut url =
        Url::parse(trimmed).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
        _ => return Err(UrlNormalizationError::MissingHost),
    };

    url.set_host(Some(&host)).map_err(|_| {
        UrlNormalizationError::NormalizationFailed("Failed to set normalized host".to_string())
    })?;

    url.set_fragment(None);

    let is_default_port = matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        url.set_port(None).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("Failed to remove default port".to_string())
        })?;
    }

    let url = url.to_string();
    let insecure = url.starts_with("http://");

    Ok(NormalizedUrl {
        url,
        host,
        insecure,
    })
}

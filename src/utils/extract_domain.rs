//! Domain keys used to scope statistics.

/// Canonical domain key for a user-supplied domain string.
///
/// Trims, lowercases and strips a trailing `:port`. IPv6 literals keep their
/// brackets (`[::1]:8080` becomes `[::1]`). Returns `None` for blank input.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(domain_key("Example.COM:8080").as_deref(), Some("example.com"));
/// ```
pub fn domain_key(input: &str) -> Option<String> {
    let host = input.trim();
    if host.is_empty() {
        return None;
    }

    let domain = if host.starts_with('[') {
        match host.find(']') {
            Some(end_bracket) => &host[..=end_bracket],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };

    if domain.is_empty() {
        return None;
    }

    Some(domain.to_ascii_lowercase())
}

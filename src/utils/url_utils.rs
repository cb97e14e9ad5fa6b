//! URL and host manipulation utilities.
//!
//! This module provides functions for working with URLs in the context of
//! link classification, normalization, and cache keying.

use url::Url;

/// Extract the host from a URL string, normalized for comparison.
///
/// Hosts are lowercased and a leading `www.` is stripped so
/// `https://www.Example.com` and `https://example.com` compare equal.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(normalize_host)
}

/// Normalize a bare host string: lowercase, `www.` stripped
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    lower
        .strip_prefix("www.")
        .filter(|rest| !rest.is_empty())
        .map_or(lower.clone(), ToString::to_string)
}

/// Check whether two hosts refer to the same site after normalization
#[must_use]
pub fn same_host(a: &str, b: &str) -> bool {
    normalize_host(a) == normalize_host(b)
}

/// Check whether a reference uses a scheme the pipeline will touch at all.
///
/// Script, data, and blob URLs are execution vectors and are dropped
/// during extraction rather than classified.
#[must_use]
pub fn is_safe_scheme(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    !(lower.starts_with("javascript:")
        || lower.starts_with("data:")
        || lower.starts_with("blob:")
        || lower.starts_with("vbscript:"))
}

/// Normalize the path portion of an internal URL.
///
/// Collapses duplicate slashes and drops the trailing slash (except for
/// the root path). Default ports are already elided by `url::Url`, which
/// never prints `:80`/`:443` for http/https.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                collapsed.push('/');
            }
            prev_slash = true;
        } else {
            collapsed.push(ch);
            prev_slash = false;
        }
    }
    if collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    collapsed
}

/// Render an internal URL in normalized form: scheme://host + normalized
/// path, preserving query and fragment.
#[must_use]
pub fn normalize_internal_url(parsed: &Url) -> String {
    let mut out = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default()
    );
    if let Some(port) = parsed.port() {
        // Url::port() is None for default ports, so anything here is real
        out.push_str(&format!(":{port}"));
    }
    out.push_str(&normalize_path(parsed.path()));
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_normalization() {
        assert_eq!(extract_host("https://www.Example.com/a"), Some("example.com".into()));
        assert_eq!(extract_host("https://sub.example.com"), Some("sub.example.com".into()));
        assert!(same_host("www.example.com", "EXAMPLE.com"));
        assert!(!same_host("example.com", "example.org"));
    }

    #[test]
    fn unsafe_schemes_rejected() {
        assert!(!is_safe_scheme("javascript:alert(1)"));
        assert!(!is_safe_scheme("  DATA:text/html,x"));
        assert!(!is_safe_scheme("blob:https://example.com/x"));
        assert!(is_safe_scheme("https://example.com"));
        assert!(is_safe_scheme("./relative.md"));
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path("//docs///setup/"), "/docs/setup");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        let parsed = Url::parse("https://example.com:443//a//b/?q=1").unwrap();
        assert_eq!(normalize_internal_url(&parsed), "https://example.com/a/b?q=1");
    }
}

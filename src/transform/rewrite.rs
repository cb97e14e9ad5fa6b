//! Per-category URL rewriting rules
//!
//! Each rule takes the raw reference and returns the rewritten URL, or the
//! original string unchanged when the input is malformed. Rules never
//! fail; degradation is signalled by the returned flag so the caller can
//! log it.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::PipelineConfig;
use crate::schema::DocumentContext;
use crate::utils::constants::DOWNLOAD_QUERY_FLAG;
use crate::utils::url_utils::{extract_host, normalize_internal_url};

/// Fragment identifier shape: letter, then letters/digits/underscore/hyphen
static ANCHOR_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap_or_else(|e| panic!("anchor regex: {e}"))
});

/// Basic `local@domain` shape check
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

/// Outcome of one rewrite rule
pub struct Rewritten {
    pub url: String,
    /// The rule could not make sense of the input and passed it through
    pub degraded: bool,
    /// The fragment did not match the identifier shape (anchor links only)
    pub unresolved_fragment: bool,
}

impl Rewritten {
    fn ok(url: String) -> Self {
        Self {
            url,
            degraded: false,
            unresolved_fragment: false,
        }
    }

    fn pass_through(url: &str) -> Self {
        Self {
            url: url.to_string(),
            degraded: true,
            unresolved_fragment: false,
        }
    }
}

/// Resolve a relative reference against the document's base URL
#[must_use]
pub fn rewrite_relative(raw: &str, config: &PipelineConfig, context: &DocumentContext) -> Rewritten {
    let base = format!("{}{}", config.base_url(), ensure_leading_slash(&context.path));
    let Ok(base) = Url::parse(&base) else {
        return Rewritten::pass_through(raw);
    };
    match base.join(raw) {
        Ok(resolved) => Rewritten::ok(normalize_internal_url(&resolved)),
        Err(_) => Rewritten::pass_through(raw),
    }
}

/// Resolve a root-relative reference against the site origin
#[must_use]
pub fn rewrite_absolute(raw: &str, config: &PipelineConfig) -> Rewritten {
    let Ok(base) = Url::parse(config.base_url()) else {
        return Rewritten::pass_through(raw);
    };
    match base.join(raw) {
        Ok(resolved) => Rewritten::ok(normalize_internal_url(&resolved)),
        Err(_) => Rewritten::pass_through(raw),
    }
}

/// Normalize an internal scheme-qualified URL: default ports stripped,
/// duplicate slashes collapsed, trailing slash dropped (except root)
#[must_use]
pub fn rewrite_internal(raw: &str) -> Rewritten {
    match Url::parse(raw) {
        Ok(parsed) => Rewritten::ok(normalize_internal_url(&parsed)),
        Err(_) => Rewritten::pass_through(raw),
    }
}

/// Upgrade scheme and append tracking parameters for external URLs on the
/// configured allow-lists
#[must_use]
pub fn rewrite_external(raw: &str, config: &PipelineConfig) -> Rewritten {
    let Ok(mut parsed) = Url::parse(raw) else {
        return Rewritten::pass_through(raw);
    };
    let Some(host) = extract_host(raw) else {
        return Rewritten::pass_through(raw);
    };

    if parsed.scheme() == "http"
        && config
            .https_upgrade_hosts()
            .iter()
            .any(|h| crate::utils::same_host(h, &host))
    {
        // set_scheme only rejects cross-category changes; http→https is fine
        let _ = parsed.set_scheme("https");
    }

    if config
        .tracking_hosts()
        .iter()
        .any(|h| crate::utils::same_host(h, &host))
    {
        let existing: Vec<String> = parsed
            .query_pairs()
            .map(|(k, _)| k.into_owned())
            .collect();
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in config.tracking_params() {
            if !existing.iter().any(|k| k == key) {
                pairs.append_pair(key, value);
            }
        }
        drop(pairs);
    }

    Rewritten::ok(parsed.to_string())
}

/// Validate the fragment shape; unresolved fragments pass through flagged
#[must_use]
pub fn rewrite_anchor(raw: &str) -> Rewritten {
    let fragment = raw.trim_start_matches('#');
    if ANCHOR_ID_RE.is_match(fragment) {
        Rewritten::ok(raw.to_string())
    } else {
        Rewritten {
            url: raw.to_string(),
            degraded: false,
            unresolved_fragment: true,
        }
    }
}

/// Validate the address shape and inject the default subject if absent
#[must_use]
pub fn rewrite_email(raw: &str, config: &PipelineConfig) -> Rewritten {
    let payload = raw.trim_start_matches("mailto:");
    let (address, query) = match payload.split_once('?') {
        Some((address, query)) => (address, Some(query)),
        None => (payload, None),
    };
    if !EMAIL_RE.is_match(address) {
        return Rewritten::pass_through(raw);
    }

    let has_subject = query.is_some_and(|q| {
        q.split('&').any(|pair| {
            pair.split_once('=')
                .is_some_and(|(k, _)| k.eq_ignore_ascii_case("subject"))
        })
    });
    let url = if has_subject {
        raw.to_string()
    } else {
        let subject: String =
            url::form_urlencoded::byte_serialize(config.email_default_subject().as_bytes())
                .collect();
        match query {
            Some(q) if !q.is_empty() => format!("mailto:{address}?{q}&subject={subject}"),
            _ => format!("mailto:{address}?subject={subject}"),
        }
    };
    Rewritten::ok(url)
}

/// Strip everything except a leading `+` and digits
#[must_use]
pub fn rewrite_phone(raw: &str) -> Rewritten {
    let payload = raw.trim_start_matches("tel:");
    let mut number = String::with_capacity(payload.len());
    for (i, ch) in payload.chars().enumerate() {
        if ch.is_ascii_digit() || (ch == '+' && i == 0) {
            number.push(ch);
        }
    }
    if number.chars().filter(char::is_ascii_digit).count() == 0 {
        return Rewritten::pass_through(raw);
    }
    Rewritten::ok(format!("tel:{number}"))
}

/// Append the forced-download flag for extensions on the download list
#[must_use]
pub fn rewrite_file(raw: &str, extension: &str, config: &PipelineConfig) -> Rewritten {
    let force_download = config
        .download_extensions()
        .iter()
        .any(|e| e.eq_ignore_ascii_case(extension));
    if !force_download || raw.contains(DOWNLOAD_QUERY_FLAG) {
        return Rewritten::ok(raw.to_string());
    }
    let separator = if raw.contains('?') { '&' } else { '?' };
    Rewritten::ok(format!("{raw}{separator}{DOWNLOAD_QUERY_FLAG}"))
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .base_url("https://example.com")
            .https_upgrade_hosts(vec!["trusted.org".into()])
            .tracking_hosts(vec!["partner.net".into()])
            .tracking_params(vec![("ref".into(), "linkpipe".into())])
            .build()
            .expect("config")
    }

    #[test]
    fn relative_resolves_against_document_path() {
        let config = config();
        let context = crate::schema::DocumentContext::new(
            "/docs/setup/index",
            crate::config::DifficultyTier::Basic,
        );
        let out = rewrite_relative("../install.md", &config, &context);
        assert!(!out.degraded);
        assert_eq!(out.url, "https://example.com/docs/install.md");
    }

    #[test]
    fn internal_normalization() {
        let out = rewrite_internal("https://example.com:443//docs//a/");
        assert_eq!(out.url, "https://example.com/docs/a");
        let root = rewrite_internal("https://example.com/");
        assert_eq!(root.url, "https://example.com/");
    }

    #[test]
    fn external_upgrade_and_tracking() {
        let config = config();
        let out = rewrite_external("http://trusted.org/page", &config);
        assert_eq!(out.url, "https://trusted.org/page");

        let tracked = rewrite_external("https://partner.net/a?x=1", &config);
        assert!(tracked.url.contains("ref=linkpipe"));
        assert!(tracked.url.contains("x=1"));

        // Existing parameter of the same name is not duplicated
        let patched = rewrite_external("https://partner.net/a?ref=mine", &config);
        assert_eq!(patched.url.matches("ref=").count(), 1);

        // Hosts off the allow-list stay on http
        let kept = rewrite_external("http://other.com/x", &config);
        assert_eq!(kept.url, "http://other.com/x");
    }

    #[test]
    fn anchor_fragment_validation() {
        assert!(!rewrite_anchor("#intro").unresolved_fragment);
        assert!(!rewrite_anchor("#section-2_a").unresolved_fragment);
        assert!(rewrite_anchor("#2fast").unresolved_fragment);
        assert!(rewrite_anchor("#").unresolved_fragment);
    }

    #[test]
    fn email_subject_injection() {
        let config = config();
        let out = rewrite_email("mailto:a@b.com", &config);
        assert_eq!(out.url, "mailto:a@b.com?subject=Hello");

        let kept = rewrite_email("mailto:a@b.com?subject=Hi", &config);
        assert_eq!(kept.url, "mailto:a@b.com?subject=Hi");

        let merged = rewrite_email("mailto:a@b.com?cc=c@d.com", &config);
        assert_eq!(merged.url, "mailto:a@b.com?cc=c@d.com&subject=Hello");

        let bad = rewrite_email("mailto:notanaddress", &config);
        assert!(bad.degraded);
        assert_eq!(bad.url, "mailto:notanaddress");
    }

    #[test]
    fn email_subject_is_form_encoded() {
        let config = PipelineConfig::builder()
            .base_url("https://example.com")
            .email_default_subject("Question about this page")
            .build()
            .expect("config");
        let out = rewrite_email("mailto:a@b.com", &config);
        assert_eq!(out.url, "mailto:a@b.com?subject=Question+about+this+page");
    }

    #[test]
    fn phone_stripping() {
        assert_eq!(rewrite_phone("tel:+1 (234) 567-8900").url, "tel:+12345678900");
        assert_eq!(rewrite_phone("tel:12 34").url, "tel:1234");
        assert!(rewrite_phone("tel:ext").degraded);
    }

    #[test]
    fn file_download_flag() {
        let config = config();
        assert_eq!(
            rewrite_file("guide.pdf", "pdf", &config).url,
            "guide.pdf?download=1"
        );
        assert_eq!(
            rewrite_file("guide.pdf?v=2", "pdf", &config).url,
            "guide.pdf?v=2&download=1"
        );
        // Not on the forced-download list
        assert_eq!(rewrite_file("data.csv", "csv", &config).url, "data.csv");
    }
}

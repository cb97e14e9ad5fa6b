//! Category-aware link reachability validation
//!
//! External and internal links get a network probe; anchors are checked
//! against the current page's generated anchor set; email and phone
//! references are pure format checks. Probe outcomes, success or failure,
//! are cached so a failing target is not hammered with re-probes; local
//! checks are cheap and rerun every time.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::{debug, warn};
use regex::Regex;
use url::Url;

use crate::batch::{BatchExecutor, BatchOptions, ErrorStrategy};
use crate::cache::CacheManager;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::schema::{LinkCategory, ValidationResult};
use crate::transform::classify;
use crate::utils::constants::MIN_PHONE_DIGITS;

/// Basic `local@domain` shape check
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

/// Phone payload: optional leading `+`, then digits with common separators
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9 ().\-]+$").unwrap_or_else(|e| panic!("phone regex: {e}"))
});

/// Probe statuses that mean "the method was rejected, not the resource":
/// these trigger the ranged-GET fallback instead of an invalid verdict.
const BLOCKED_STATUSES: &[u16] = &[403, 405, 429, 999];

/// Category-aware link validator with per-outcome caching
#[derive(Clone)]
pub struct LinkValidator {
    client: reqwest::Client,
    cache: Arc<CacheManager>,
    config: Arc<PipelineConfig>,
}

impl LinkValidator {
    /// Build a validator sharing the given cache manager.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: Arc<PipelineConfig>,
        cache: Arc<CacheManager>,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| PipelineError::Validation(format!("HTTP client construction: {e}")))?;
        Ok(Self {
            client,
            cache,
            config,
        })
    }

    /// Validate one URL with the default cache lifetime.
    ///
    /// Anchor references validate by format only here; callers holding the
    /// current page's anchor set should use [`Self::validate_in_page`].
    pub async fn validate(&self, url: &str, timeout: Duration) -> ValidationResult {
        self.validate_in_page(url, timeout, None).await
    }

    /// Validate one URL, checking anchors against the current page
    pub async fn validate_in_page(
        &self,
        url: &str,
        timeout: Duration,
        page_anchors: Option<&HashSet<String>>,
    ) -> ValidationResult {
        self.validate_cached(url, timeout, page_anchors, self.config.validation_ttl())
            .await
    }

    /// Validate with an explicit (tier-derived) cache lifetime.
    ///
    /// Anchor, email, and phone checks are local and never cached: anchor
    /// validity depends on the surrounding page, so a shared URL-keyed
    /// entry would leak between documents. Relative references resolve
    /// against the site origin before the cache lookup, so a root-relative
    /// reference and its absolute form share one entry and domain-scoped
    /// invalidation can match the key's host.
    pub async fn validate_cached(
        &self,
        url: &str,
        timeout: Duration,
        page_anchors: Option<&HashSet<String>>,
        ttl: Duration,
    ) -> ValidationResult {
        let category = classify(
            url,
            self.config.base_host(),
            self.config.file_extensions(),
        );
        match category {
            LinkCategory::Anchor => {
                return Self::check_anchor(url.trim_start_matches('#'), page_anchors);
            }
            LinkCategory::Email => return Self::check_email(url),
            LinkCategory::Phone => return Self::check_phone(url),
            _ => {}
        }

        let target = match category {
            // Root-relative, explicit relative, and file references probe
            // as internal under their resolved form
            LinkCategory::Absolute | LinkCategory::Relative | LinkCategory::File => {
                match Url::parse(self.config.base_url()).and_then(|base| base.join(url)) {
                    Ok(resolved) => resolved.to_string(),
                    Err(e) => {
                        return ValidationResult::invalid(
                            None,
                            0,
                            format!("unresolvable: {e}"),
                        );
                    }
                }
            }
            _ => url.to_string(),
        };

        if let Some(cached) = self.cache.get_validation_result(&target).await {
            debug!(target: "linkpipe::validate", "Cache hit for {target}");
            return cached;
        }

        let result = match category {
            LinkCategory::External => self.check_external(&target, timeout).await,
            _ => self.check_internal(&target, timeout).await,
        };
        self.cache
            .cache_validation_result_ttl(&target, result.clone(), ttl)
            .await;
        result
    }

    /// Existence probe for external URLs: HEAD, then a ranged GET when the
    /// probe is rejected with a method/bot-blocking status
    async fn check_external(&self, url: &str, timeout: Duration) -> ValidationResult {
        let started = Instant::now();
        let response = self.client.head(url).timeout(timeout).send().await;
        let elapsed = started.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let redirect = redirect_target(url, resp.url());
                if status.is_success() {
                    let mut result = ValidationResult::valid(Some(status.as_u16()), elapsed);
                    result.redirect_url = redirect;
                    return result;
                }
                if BLOCKED_STATUSES.contains(&status.as_u16()) {
                    debug!(
                        target: "linkpipe::validate",
                        "HEAD to {url} blocked with {status}, falling back to ranged GET"
                    );
                    return self.ranged_get_fallback(url, timeout, started).await;
                }
                let mut result = ValidationResult::invalid(
                    Some(status.as_u16()),
                    elapsed,
                    format!("status {status}"),
                );
                result.redirect_url = redirect;
                result
            }
            Err(e) if e.is_timeout() => ValidationResult::invalid(
                None,
                elapsed,
                format!("timeout after {}ms", timeout.as_millis()),
            ),
            Err(e) => ValidationResult::invalid(None, elapsed, format!("request failed: {e}")),
        }
    }

    /// Fallback probe for hosts that reject HEAD: any HTTP response at all
    /// counts as reachable, a transport error does not
    async fn ranged_get_fallback(
        &self,
        url: &str,
        timeout: Duration,
        started: Instant,
    ) -> ValidationResult {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::RANGE, "bytes=0-0")
            .timeout(timeout)
            .send()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;

        match response {
            Ok(resp) => {
                let mut result = ValidationResult::valid(Some(resp.status().as_u16()), elapsed);
                result.redirect_url = redirect_target(url, resp.url());
                result
            }
            Err(e) if e.is_timeout() => ValidationResult::invalid(
                None,
                elapsed,
                format!("timeout after {}ms", timeout.as_millis()),
            ),
            Err(e) => {
                ValidationResult::invalid(None, elapsed, format!("fallback failed: {e}"))
            }
        }
    }

    /// Same-origin probe: success iff the response status is a success
    async fn check_internal(&self, url: &str, timeout: Duration) -> ValidationResult {
        let started = Instant::now();
        let response = self.client.head(url).timeout(timeout).send().await;
        let elapsed = started.elapsed().as_millis() as u64;

        match response {
            Ok(resp) if resp.status().is_success() => {
                ValidationResult::valid(Some(resp.status().as_u16()), elapsed)
            }
            Ok(resp) => ValidationResult::invalid(
                Some(resp.status().as_u16()),
                elapsed,
                format!("status {}", resp.status()),
            ),
            Err(e) if e.is_timeout() => ValidationResult::invalid(
                None,
                elapsed,
                format!("timeout after {}ms", timeout.as_millis()),
            ),
            Err(e) => ValidationResult::invalid(None, elapsed, format!("request failed: {e}")),
        }
    }

    /// Anchor exists iff the page's generated anchor set contains it.
    /// Without a page, only the identifier shape is checked.
    fn check_anchor(fragment: &str, page_anchors: Option<&HashSet<String>>) -> ValidationResult {
        match page_anchors {
            Some(anchors) => {
                if anchors.contains(fragment) {
                    ValidationResult::valid(None, 0)
                } else {
                    ValidationResult::invalid(None, 0, format!("no element with id '{fragment}'"))
                }
            }
            None => {
                if fragment.is_empty() {
                    ValidationResult::invalid(None, 0, "empty fragment")
                } else {
                    ValidationResult::valid(None, 0)
                }
            }
        }
    }

    fn check_email(url: &str) -> ValidationResult {
        let payload = url.trim_start_matches("mailto:");
        let address = payload.split('?').next().unwrap_or(payload);
        if EMAIL_RE.is_match(address) {
            ValidationResult::valid(None, 0)
        } else {
            ValidationResult::invalid(None, 0, format!("malformed email address '{address}'"))
        }
    }

    fn check_phone(url: &str) -> ValidationResult {
        let payload = url.trim_start_matches("tel:");
        let digits = payload.chars().filter(char::is_ascii_digit).count();
        if PHONE_RE.is_match(payload) && digits >= MIN_PHONE_DIGITS {
            ValidationResult::valid(None, 0)
        } else {
            ValidationResult::invalid(
                None,
                0,
                format!("malformed phone number '{payload}' ({digits} digits)"),
            )
        }
    }

    /// Validate many URLs with bounded concurrency.
    ///
    /// One failing chunk never aborts the others (continue strategy);
    /// per-URL failures are ordinary invalid results, not chunk failures.
    pub async fn validate_batch(
        &self,
        urls: Vec<String>,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Vec<(String, ValidationResult)> {
        let executor = BatchExecutor::new();
        let validator = self.clone();
        let options = BatchOptions {
            batch_size: 5,
            max_concurrency: max_concurrent.max(1),
            error_strategy: ErrorStrategy::Continue,
            ..BatchOptions::default()
        };

        let outcome = executor
            .process(
                urls,
                move |chunk: Vec<String>| {
                    let validator = validator.clone();
                    async move {
                        let mut results = Vec::with_capacity(chunk.len());
                        for url in chunk {
                            let result = validator.validate(&url, timeout).await;
                            results.push((url, result));
                        }
                        Ok(results)
                    }
                },
                options,
            )
            .await;

        match outcome {
            Ok(outcome) => outcome.results,
            Err(e) => {
                // Continue strategy never fails a chunk; only abort or a
                // misuse error lands here
                warn!(target: "linkpipe::validate", "Batch validation ended early: {e}");
                Vec::new()
            }
        }
    }

    /// Warm the validation cache in the background.
    ///
    /// Priority URLs validate first at low concurrency; the remainder is
    /// scheduled after a short delay at even lower concurrency. Best-effort
    /// work that never blocks the caller.
    pub fn prevalidate(
        &self,
        urls: Vec<String>,
        priority: Vec<String>,
    ) -> tokio::task::JoinHandle<()> {
        let validator = self.clone();
        let timeout = self.config.request_timeout();
        tokio::spawn(async move {
            let priority_set: HashSet<String> = priority.iter().cloned().collect();
            let rest: Vec<String> = urls
                .into_iter()
                .filter(|u| !priority_set.contains(u))
                .collect();

            if !priority.is_empty() {
                let n = validator.validate_batch(priority, 2, timeout).await.len();
                debug!(target: "linkpipe::validate", "Prevalidated {n} priority URLs");
            }
            if !rest.is_empty() {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let n = validator.validate_batch(rest, 1, timeout).await.len();
                debug!(target: "linkpipe::validate", "Prevalidated {n} background URLs");
            }
        })
    }
}

fn redirect_target(requested: &str, final_url: &Url) -> Option<String> {
    let final_str = final_url.as_str();
    // reqwest follows redirects; a different final URL means at least one hop
    (final_str.trim_end_matches('/') != requested.trim_end_matches('/'))
        .then(|| final_str.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format_check() {
        assert!(LinkValidator::check_email("mailto:a@b.com").is_valid);
        assert!(LinkValidator::check_email("mailto:a@b.com?subject=Hi").is_valid);
        assert!(!LinkValidator::check_email("mailto:not-an-address").is_valid);
        assert!(!LinkValidator::check_email("mailto:a b@c.com").is_valid);
    }

    #[test]
    fn phone_format_check() {
        assert!(LinkValidator::check_phone("tel:+1 (234) 567-8900").is_valid);
        assert!(LinkValidator::check_phone("tel:1234567").is_valid);
        // Too few digits
        assert!(!LinkValidator::check_phone("tel:123456").is_valid);
        assert!(!LinkValidator::check_phone("tel:abc").is_valid);
    }

    #[test]
    fn anchor_check_against_page() {
        let mut anchors = HashSet::new();
        anchors.insert("intro".to_string());
        assert!(LinkValidator::check_anchor("intro", Some(&anchors)).is_valid);
        assert!(!LinkValidator::check_anchor("missing", Some(&anchors)).is_valid);
        assert!(LinkValidator::check_anchor("intro", None).is_valid);
        assert!(!LinkValidator::check_anchor("", None).is_valid);
    }
}

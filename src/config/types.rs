//! Core configuration types for the link pipeline
//!
//! This module contains the main `PipelineConfig` struct that defines the
//! configuration parameters for link processing, validation, and caching.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::tier::{DifficultyTier, TierPolicy};
use crate::utils::constants::{
    DEFAULT_EMAIL_SUBJECT, DEFAULT_MAX_CACHE_ENTRIES, DEFAULT_PROCESSING_TTL_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_VALIDATION_TTL_SECS,
    DOWNLOAD_EXTENSIONS, EXTERNAL_LINK_MARKER, FILE_EXTENSIONS, PROBE_USER_AGENT,
};

/// Main configuration struct for the link pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Origin of the site whose documents are processed.
    ///
    /// **INVARIANT:** Always an absolute http(s) URL (validated in the
    /// builder). Relative and root-relative references resolve against it,
    /// and host comparison against it splits Internal from External.
    pub(crate) base_url: String,

    /// Normalized host of `base_url`, derived in the builder
    pub(crate) base_host: String,

    /// Directory for the persistent cache tier.
    ///
    /// `None` disables the slow tier entirely; the cache degrades to
    /// fast-tier-only behavior.
    pub(crate) cache_dir: Option<PathBuf>,

    /// Fast-tier capacity before least-recently-used eviction
    pub(crate) max_cache_entries: usize,

    /// Default lifetime for cached validation results, in seconds
    pub(crate) validation_ttl_secs: u64,

    /// Default lifetime for cached processing results, in seconds
    pub(crate) processing_ttl_secs: u64,

    /// Interval between background expiry sweeps, in seconds
    pub(crate) sweep_interval_secs: u64,

    /// Default probe timeout, in seconds
    pub(crate) request_timeout_secs: u64,

    /// User agent sent with validation probes
    pub(crate) user_agent: String,

    /// Hosts whose `http` links are upgraded to `https` during rewriting
    pub(crate) https_upgrade_hosts: Vec<String>,

    /// Hosts that get the configured tracking parameters appended
    pub(crate) tracking_hosts: Vec<String>,

    /// Fixed query parameters appended to links on `tracking_hosts`
    pub(crate) tracking_params: Vec<(String, String)>,

    /// Extension allow-list that classifies a reference as a file link
    pub(crate) file_extensions: Vec<String>,

    /// Extensions that get the forced-download query flag
    pub(crate) download_extensions: Vec<String>,

    /// Subject injected into `mailto:` links that carry none
    pub(crate) email_default_subject: String,

    /// Marker appended to external link display text
    pub(crate) external_marker: String,

    /// Per-tier policy overrides; tiers without an entry use the built-in
    /// table from [`TierPolicy::for_tier`]
    #[serde(default)]
    pub(crate) tier_overrides: HashMap<DifficultyTier, TierPolicy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            base_host: "localhost".to_string(),
            cache_dir: None,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            validation_ttl_secs: DEFAULT_VALIDATION_TTL_SECS,
            processing_ttl_secs: DEFAULT_PROCESSING_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: PROBE_USER_AGENT.to_string(),
            https_upgrade_hosts: Vec::new(),
            tracking_hosts: Vec::new(),
            tracking_params: Vec::new(),
            file_extensions: FILE_EXTENSIONS.iter().map(ToString::to_string).collect(),
            download_extensions: DOWNLOAD_EXTENSIONS.iter().map(ToString::to_string).collect(),
            email_default_subject: DEFAULT_EMAIL_SUBJECT.to_string(),
            external_marker: EXTERNAL_LINK_MARKER.to_string(),
            tier_overrides: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Start building a config; `base_url` is required before `build()`
    #[must_use]
    pub fn builder() -> super::builder::PipelineConfigBuilder<()> {
        super::builder::PipelineConfigBuilder::default()
    }

    /// Effective policy for a tier: override if present, built-in otherwise
    #[must_use]
    pub fn tier_policy(&self, tier: DifficultyTier) -> TierPolicy {
        self.tier_overrides
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| TierPolicy::for_tier(tier))
    }
}

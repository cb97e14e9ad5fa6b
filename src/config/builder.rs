//! Type-safe builder for `PipelineConfig` using the typestate pattern
//!
//! This module provides a fluent builder interface with compile-time
//! validation ensuring that the site origin is set before building a
//! `PipelineConfig`.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;

use url::Url;

use super::tier::{DifficultyTier, TierPolicy};
use super::types::PipelineConfig;
use crate::error::PipelineError;
use crate::utils::url_utils::normalize_host;

// Type states for the builder
pub struct WithBaseUrl;

pub struct PipelineConfigBuilder<State = ()> {
    pub(crate) base_url: Option<String>,
    pub(crate) cache_dir: Option<PathBuf>,
    pub(crate) max_cache_entries: Option<usize>,
    pub(crate) validation_ttl_secs: Option<u64>,
    pub(crate) processing_ttl_secs: Option<u64>,
    pub(crate) sweep_interval_secs: Option<u64>,
    pub(crate) request_timeout_secs: Option<u64>,
    pub(crate) user_agent: Option<String>,
    pub(crate) https_upgrade_hosts: Vec<String>,
    pub(crate) tracking_hosts: Vec<String>,
    pub(crate) tracking_params: Vec<(String, String)>,
    pub(crate) file_extensions: Option<Vec<String>>,
    pub(crate) download_extensions: Option<Vec<String>>,
    pub(crate) email_default_subject: Option<String>,
    pub(crate) external_marker: Option<String>,
    pub(crate) tier_overrides: HashMap<DifficultyTier, TierPolicy>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for PipelineConfigBuilder<()> {
    fn default() -> Self {
        Self {
            base_url: None,
            cache_dir: None,
            max_cache_entries: None,
            validation_ttl_secs: None,
            processing_ttl_secs: None,
            sweep_interval_secs: None,
            request_timeout_secs: None,
            user_agent: None,
            https_upgrade_hosts: Vec::new(),
            tracking_hosts: Vec::new(),
            tracking_params: Vec::new(),
            file_extensions: None,
            download_extensions: None,
            email_default_subject: None,
            external_marker: None,
            tier_overrides: HashMap::new(),
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfigBuilder<()> {
    /// Set the site origin. Required before `build()` is available.
    #[must_use]
    pub fn base_url(self, base_url: impl Into<String>) -> PipelineConfigBuilder<WithBaseUrl> {
        PipelineConfigBuilder {
            base_url: Some(base_url.into()),
            cache_dir: self.cache_dir,
            max_cache_entries: self.max_cache_entries,
            validation_ttl_secs: self.validation_ttl_secs,
            processing_ttl_secs: self.processing_ttl_secs,
            sweep_interval_secs: self.sweep_interval_secs,
            request_timeout_secs: self.request_timeout_secs,
            user_agent: self.user_agent,
            https_upgrade_hosts: self.https_upgrade_hosts,
            tracking_hosts: self.tracking_hosts,
            tracking_params: self.tracking_params,
            file_extensions: self.file_extensions,
            download_extensions: self.download_extensions,
            email_default_subject: self.email_default_subject,
            external_marker: self.external_marker,
            tier_overrides: self.tier_overrides,
            _phantom: PhantomData,
        }
    }
}

// Methods available in every builder state
impl<State> PipelineConfigBuilder<State> {
    /// Directory for the persistent cache tier (`None` = fast tier only)
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn max_cache_entries(mut self, max: usize) -> Self {
        self.max_cache_entries = Some(max);
        self
    }

    #[must_use]
    pub fn validation_ttl_secs(mut self, secs: u64) -> Self {
        self.validation_ttl_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn processing_ttl_secs(mut self, secs: u64) -> Self {
        self.processing_ttl_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Hosts whose `http` links are upgraded to `https` during rewriting
    #[must_use]
    pub fn https_upgrade_hosts(mut self, hosts: Vec<String>) -> Self {
        self.https_upgrade_hosts = hosts;
        self
    }

    /// Hosts that get the configured tracking parameters appended
    #[must_use]
    pub fn tracking_hosts(mut self, hosts: Vec<String>) -> Self {
        self.tracking_hosts = hosts;
        self
    }

    /// Fixed query parameters appended to links on tracking hosts
    #[must_use]
    pub fn tracking_params(mut self, params: Vec<(String, String)>) -> Self {
        self.tracking_params = params;
        self
    }

    #[must_use]
    pub fn file_extensions(mut self, extensions: Vec<String>) -> Self {
        self.file_extensions = Some(extensions);
        self
    }

    #[must_use]
    pub fn download_extensions(mut self, extensions: Vec<String>) -> Self {
        self.download_extensions = Some(extensions);
        self
    }

    #[must_use]
    pub fn email_default_subject(mut self, subject: impl Into<String>) -> Self {
        self.email_default_subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn external_marker(mut self, marker: impl Into<String>) -> Self {
        self.external_marker = Some(marker.into());
        self
    }

    /// Override the built-in policy for one tier
    #[must_use]
    pub fn tier_policy(mut self, tier: DifficultyTier, policy: TierPolicy) -> Self {
        self.tier_overrides.insert(tier, policy);
        self
    }
}

impl PipelineConfigBuilder<WithBaseUrl> {
    /// Validate settings and build the final `PipelineConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Misuse`] if the base URL is not an
    /// absolute http(s) URL or if numeric settings are out of range
    /// (zero capacity or TTL).
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let base_url = self
            .base_url
            .ok_or_else(|| PipelineError::Misuse("base_url is required".to_string()))?;

        let parsed = Url::parse(&base_url)
            .map_err(|e| PipelineError::Misuse(format!("invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PipelineError::Misuse(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        let base_host = parsed
            .host_str()
            .map(normalize_host)
            .ok_or_else(|| PipelineError::Misuse(format!("base URL '{base_url}' has no host")))?;

        let defaults = PipelineConfig::default();

        let max_cache_entries = self.max_cache_entries.unwrap_or(defaults.max_cache_entries);
        if max_cache_entries == 0 {
            return Err(PipelineError::Misuse(
                "max_cache_entries must be greater than zero".to_string(),
            ));
        }

        let validation_ttl_secs = self
            .validation_ttl_secs
            .unwrap_or(defaults.validation_ttl_secs);
        let processing_ttl_secs = self
            .processing_ttl_secs
            .unwrap_or(defaults.processing_ttl_secs);
        if validation_ttl_secs == 0 || processing_ttl_secs == 0 {
            return Err(PipelineError::Misuse(
                "cache TTLs must be greater than zero".to_string(),
            ));
        }

        Ok(PipelineConfig {
            // Keep the origin without a trailing slash so joins are uniform
            base_url: base_url.trim_end_matches('/').to_string(),
            base_host,
            cache_dir: self.cache_dir,
            max_cache_entries,
            validation_ttl_secs,
            processing_ttl_secs,
            sweep_interval_secs: self
                .sweep_interval_secs
                .unwrap_or(defaults.sweep_interval_secs),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            https_upgrade_hosts: self.https_upgrade_hosts,
            tracking_hosts: self.tracking_hosts,
            tracking_params: self.tracking_params,
            file_extensions: self.file_extensions.unwrap_or(defaults.file_extensions),
            download_extensions: self
                .download_extensions
                .unwrap_or(defaults.download_extensions),
            email_default_subject: self
                .email_default_subject
                .unwrap_or(defaults.email_default_subject),
            external_marker: self.external_marker.unwrap_or(defaults.external_marker),
            tier_overrides: self.tier_overrides,
        })
    }
}

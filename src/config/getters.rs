//! Getter methods for `PipelineConfig`
//!
//! This module provides all the accessor methods for retrieving
//! configuration values from a `PipelineConfig` instance.

use std::path::Path;
use std::time::Duration;

use super::types::PipelineConfig;

impl PipelineConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    #[must_use]
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    #[must_use]
    pub fn max_cache_entries(&self) -> usize {
        self.max_cache_entries
    }

    #[must_use]
    pub fn validation_ttl(&self) -> Duration {
        Duration::from_secs(self.validation_ttl_secs)
    }

    #[must_use]
    pub fn processing_ttl(&self) -> Duration {
        Duration::from_secs(self.processing_ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn https_upgrade_hosts(&self) -> &[String] {
        &self.https_upgrade_hosts
    }

    #[must_use]
    pub fn tracking_hosts(&self) -> &[String] {
        &self.tracking_hosts
    }

    #[must_use]
    pub fn tracking_params(&self) -> &[(String, String)] {
        &self.tracking_params
    }

    #[must_use]
    pub fn file_extensions(&self) -> &[String] {
        &self.file_extensions
    }

    #[must_use]
    pub fn download_extensions(&self) -> &[String] {
        &self.download_extensions
    }

    #[must_use]
    pub fn email_default_subject(&self) -> &str {
        &self.email_default_subject
    }

    #[must_use]
    pub fn external_marker(&self) -> &str {
        &self.external_marker
    }
}

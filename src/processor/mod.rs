//! Link processing orchestrator.
//!
//! Drives one reference through transform, tier-gated validation, and the
//! cache, with a per-key in-flight map so identical concurrent requests
//! share one execution. Document-level processing extracts references and
//! fans them out through the batch executor under the tier policy.

pub mod anchors;
pub mod extract;
pub mod stats;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, warn};

use crate::batch::{BatchExecutor, BatchOptions, ErrorStrategy};
use crate::cache::CacheManager;
use crate::config::{PipelineConfig, TierPolicy};
use crate::error::PipelineError;
use crate::schema::{DocumentContext, LinkStats, ProcessedLink};
use crate::transform::LinkTransformer;
use crate::validate::LinkValidator;

pub use anchors::{Anchor, anchor_id_set, generate_anchors};
pub use extract::{ExtractedLink, extract_links};

type PendingLink = Shared<BoxFuture<'static, ProcessedLink>>;

/// Everything produced for one document pass
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Records in extraction order
    pub links: Vec<ProcessedLink>,
    pub stats: LinkStats,
    /// Content hash key the result was cached under
    pub content_key: String,
}

/// Orchestrates transform, validation, and caching for links.
///
/// One instance is built by the composition root and shared by reference;
/// there is no global processor.
pub struct LinkProcessor {
    config: Arc<PipelineConfig>,
    cache: Arc<CacheManager>,
    validator: LinkValidator,
    /// In-flight executions keyed by link cache key. Sole source of truth
    /// for request deduplication.
    in_flight: DashMap<String, PendingLink>,
}

impl LinkProcessor {
    /// Build a processor on top of an existing cache manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the validator's HTTP client cannot be built.
    pub fn new(config: Arc<PipelineConfig>, cache: Arc<CacheManager>) -> anyhow::Result<Self> {
        let validator = LinkValidator::new(Arc::clone(&config), Arc::clone(&cache))?;
        Ok(Self {
            config,
            cache,
            validator,
            in_flight: DashMap::new(),
        })
    }

    #[must_use]
    pub fn validator(&self) -> &LinkValidator {
        &self.validator
    }

    /// Process a single reference under the given document context.
    ///
    /// Cached results return immediately; concurrent calls for the same
    /// (context, url) pair share one execution. A processing error degrades
    /// to an invalid record, it never propagates.
    pub async fn process_link(&self, url: &str, context: &DocumentContext) -> ProcessedLink {
        self.process_link_inner(url, "", context, None).await
    }

    async fn process_link_inner(
        &self,
        url: &str,
        display_text: &str,
        context: &DocumentContext,
        page_anchors: Option<Arc<HashSet<String>>>,
    ) -> ProcessedLink {
        let key = context.link_cache_key(url);

        if let Some(cached) = self.cache.get_processing_result(&key).await {
            if let Some(link) = cached.into_iter().next() {
                debug!(target: "linkpipe::processor", "Cache hit for {key}");
                return link;
            }
        }

        let pending = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(target: "linkpipe::processor", "Joining in-flight request for {key}");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let fut = Self::drive(
                    Arc::clone(&self.config),
                    Arc::clone(&self.cache),
                    self.validator.clone(),
                    url.to_string(),
                    display_text.to_string(),
                    context.clone(),
                    key.clone(),
                    page_anchors,
                )
                .boxed()
                .shared();
                entry.insert(fut.clone());
                fut
            }
        };

        let link = pending.clone().await;
        self.clear_in_flight(&key, &pending);
        link
    }

    /// Clear the in-flight marker, but only if it still belongs to the
    /// awaited execution. A slow joiner must not delete a newer pending
    /// future registered under the same key after a cache eviction.
    fn clear_in_flight(&self, key: &str, finished: &PendingLink) {
        self.in_flight
            .remove_if(key, |_, current| current.ptr_eq(finished));
    }

    /// The actual transform/validate/cache sequence for one link
    #[allow(clippy::too_many_arguments)]
    async fn drive(
        config: Arc<PipelineConfig>,
        cache: Arc<CacheManager>,
        validator: LinkValidator,
        url: String,
        display_text: String,
        context: DocumentContext,
        key: String,
        page_anchors: Option<Arc<HashSet<String>>>,
    ) -> ProcessedLink {
        if url.trim().is_empty() {
            let error = PipelineError::Transform {
                url: url.clone(),
                reason: "empty reference".to_string(),
            };
            return ProcessedLink::failed(&url, &display_text, error.to_string());
        }

        let policy = config.tier_policy(context.difficulty);
        let transformer = LinkTransformer::new(Arc::clone(&config));
        let mut link = transformer.transform(&url, &display_text, &context);

        if stats::validation_enabled(link.category, &policy) {
            let timeout = Duration::from_secs(policy.request_timeout_secs);
            let ttl = Duration::from_secs(policy.validation_ttl_secs);
            let result = validator
                .validate_cached(&link.url, timeout, page_anchors.as_deref(), ttl)
                .await;

            link.is_valid = result.is_valid;
            if let Some(error) = result.error {
                warn!(
                    target: "linkpipe::processor",
                    "Validation failed for {}: {error}", link.url
                );
                link.error = Some(error);
            }
            if let Some(redirect) = result.redirect_url {
                link.metadata
                    .attributes
                    .insert("redirect_url".to_string(), redirect);
            }
        }

        cache
            .cache_processing_result_ttl(
                &key,
                vec![link.clone()],
                Duration::from_secs(policy.processing_ttl_secs),
            )
            .await;

        link
    }

    /// Extract every reference from a document and process them in batches.
    ///
    /// Chunk size, concurrency, inter-chunk delay, and deep detection all
    /// come from the context's tier policy. Output order matches extraction
    /// order. A repeated pass over unchanged content is served from cache.
    pub async fn process_document(
        self: &Arc<Self>,
        content: &str,
        context: &DocumentContext,
    ) -> ProcessedDocument {
        let policy = self.config.tier_policy(context.difficulty);
        let content_key = CacheManager::content_key(content);
        let document_key = context.link_cache_key(&content_key);

        if let Some(links) = self.cache.get_processing_result(&document_key).await {
            debug!(target: "linkpipe::processor", "Document cache hit for {document_key}");
            let stats = stats::compute(&links, &policy);
            return ProcessedDocument {
                links,
                stats,
                content_key,
            };
        }

        let references = extract::extract_links(content, policy.deep_link_detection);
        let page_anchors = Arc::new(anchors::anchor_id_set(content));
        debug!(
            target: "linkpipe::processor",
            "Extracted {} references from {} ({} anchors)",
            references.len(),
            context.path,
            page_anchors.len()
        );

        let links = self
            .run_batches(references, context, &policy, page_anchors)
            .await;

        let stats = stats::compute(&links, &policy);
        self.cache
            .cache_processing_result_ttl(
                &document_key,
                links.clone(),
                Duration::from_secs(policy.processing_ttl_secs),
            )
            .await;

        ProcessedDocument {
            links,
            stats,
            content_key,
        }
    }

    async fn run_batches(
        self: &Arc<Self>,
        references: Vec<ExtractedLink>,
        context: &DocumentContext,
        policy: &TierPolicy,
        page_anchors: Arc<HashSet<String>>,
    ) -> Vec<ProcessedLink> {
        if references.is_empty() {
            return Vec::new();
        }

        let executor = BatchExecutor::new();
        let options = BatchOptions {
            batch_size: policy.batch_size,
            max_concurrency: policy.max_concurrent_validations,
            batch_delay: Duration::from_millis(policy.batch_delay_ms),
            error_strategy: ErrorStrategy::Continue,
            ..BatchOptions::default()
        };

        let processor = Arc::clone(self);
        let ctx = context.clone();
        let outcome = executor
            .process(
                references,
                move |chunk: Vec<ExtractedLink>| {
                    let processor = Arc::clone(&processor);
                    let ctx = ctx.clone();
                    let page_anchors = Arc::clone(&page_anchors);
                    async move {
                        let mut out = Vec::with_capacity(chunk.len());
                        for reference in chunk {
                            let link = processor
                                .process_link_inner(
                                    &reference.url,
                                    &reference.text,
                                    &ctx,
                                    Some(Arc::clone(&page_anchors)),
                                )
                                .await;
                            out.push(link);
                        }
                        Ok(out)
                    }
                },
                options,
            )
            .await;

        match outcome {
            Ok(outcome) => outcome.results,
            Err(e) => {
                // Per-link failures degrade to invalid records inside the
                // chunk, so only abort or executor misuse lands here
                warn!(target: "linkpipe::processor", "Document batch ended early: {e}");
                Vec::new()
            }
        }
    }
}

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod processor;
pub mod schema;
pub mod transform;
pub mod utils;
pub mod validate;

pub use batch::{BatchExecutor, BatchOptions, BatchOutcome, BatchStats, ErrorStrategy};
pub use cache::{CacheManager, CacheStats, MemoryStore, PersistentStore, SqliteStore};
pub use config::{DifficultyTier, PipelineConfig, PipelineConfigBuilder, TierPolicy};
pub use error::PipelineError;
pub use processor::{LinkProcessor, ProcessedDocument, extract_links, generate_anchors};
pub use schema::{
    DocumentContext, LinkCategory, LinkMetadata, LinkStats, ProcessedLink, ValidationResult,
};
pub use transform::LinkTransformer;
pub use validate::LinkValidator;

// Test-accessible modules
pub use batch::gate::ConcurrencyGate;
pub use processor::anchors;

/// Convenience wrapper for one-shot document processing.
///
/// Builds a fast-tier-only cache and processes the document under the
/// context's tier policy. Long-lived callers should construct a
/// [`LinkProcessor`] themselves and reuse it.
pub async fn process_document(
    config: std::sync::Arc<PipelineConfig>,
    content: &str,
    context: &DocumentContext,
) -> anyhow::Result<ProcessedDocument> {
    let cache = std::sync::Arc::new(CacheManager::new(
        config.max_cache_entries(),
        config.validation_ttl(),
        config.processing_ttl(),
        None,
    ));
    let processor = std::sync::Arc::new(LinkProcessor::new(config, cache)?);
    Ok(processor.process_document(content, context).await)
}

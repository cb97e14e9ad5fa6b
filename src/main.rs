// Link pipeline CLI
//
// Processes one document file: extracts references, rewrites and validates
// them under the chosen difficulty tier, and prints the resulting records
// and statistics. The on-disk cache persists between runs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use linkpipe::cache::{CacheManager, SqliteStore};
use linkpipe::config::{DifficultyTier, PipelineConfig};
use linkpipe::processor::LinkProcessor;
use linkpipe::schema::DocumentContext;

struct Args {
    file: PathBuf,
    base_url: String,
    tier: DifficultyTier,
    cache_dir: Option<PathBuf>,
}

const USAGE: &str = "Usage: linkpipe <file> [--base-url URL] [--tier basic|intermediate|advanced] [--cache-dir DIR]";

fn parse_args(mut argv: std::env::Args) -> anyhow::Result<Args> {
    let _program = argv.next();
    let mut file = None;
    let mut base_url = "https://localhost".to_string();
    let mut tier = DifficultyTier::Basic;
    let mut cache_dir = None;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--base-url" => {
                base_url = argv.next().context("--base-url requires a value")?;
            }
            "--tier" => {
                let value = argv.next().context("--tier requires a value")?;
                tier = DifficultyTier::parse(&value)
                    .with_context(|| format!("unknown tier '{value}'"))?;
            }
            "--cache-dir" => {
                cache_dir = Some(PathBuf::from(
                    argv.next().context("--cache-dir requires a value")?,
                ));
            }
            "--help" | "-h" => anyhow::bail!("{USAGE}"),
            other if file.is_none() => file = Some(PathBuf::from(other)),
            other => anyhow::bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }

    Ok(Args {
        file: file.with_context(|| format!("missing input file\n{USAGE}"))?,
        base_url,
        tier,
        cache_dir,
    })
}

async fn run(args: Args) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let config = Arc::new(
        PipelineConfig::builder()
            .base_url(&args.base_url)
            .build()
            .context("invalid configuration")?,
    );

    let store = match &args.cache_dir {
        Some(dir) => Some(
            SqliteStore::open(dir)
                .await
                .map(|s| Arc::new(s) as Arc<dyn linkpipe::cache::PersistentStore>)
                .context("failed to open cache store")?,
        ),
        None => None,
    };
    let cache = Arc::new(CacheManager::new(
        config.max_cache_entries(),
        config.validation_ttl(),
        config.processing_ttl(),
        store,
    ));
    let sweeper = cache.start_sweeper(config.sweep_interval());
    let processor = Arc::new(LinkProcessor::new(Arc::clone(&config), Arc::clone(&cache))?);

    let path = format!("/{}", args.file.file_stem().unwrap_or_default().to_string_lossy());
    let context = DocumentContext::new(path, args.tier);

    info!(
        "Processing {} at tier {}",
        args.file.display(),
        args.tier.as_str()
    );
    let report = processor.process_document(&content, &context).await;

    for link in &report.links {
        let mark = if link.is_valid { "ok " } else { "BAD" };
        match &link.error {
            Some(error) => println!("{mark} [{}] {} ({error})", link.category, link.url),
            None => println!("{mark} [{}] {}", link.category, link.url),
        }
    }

    let stats = &report.stats;
    println!();
    println!(
        "{} links: {} valid, {} invalid, {} pending ({} external, {} internal)",
        stats.total, stats.valid, stats.invalid, stats.pending, stats.external, stats.internal
    );

    let cache_stats = cache.stats().await;
    info!(
        "Cache: {} memory hits, {} memory misses, hit rate {:.2}",
        cache_stats.memory_hits, cache_stats.memory_misses, cache_stats.hit_rate
    );

    sweeper.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

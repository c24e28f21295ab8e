use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lightbox::{
    config::Config,
    gallery::{ContextProfile, GalleryService, InitialLoad},
    models::{Artwork, SearchStatus},
    remote::{ContentService, HttpContentService, SampleContentService},
    search::SearchService,
};
use tiered_store::TierManager;

#[derive(Parser)]
#[command(name = "lightbox")]
#[command(version = "0.1.0")]
#[command(about = "Cached, paginated browsing engine for a photography portfolio")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "lightbox.toml")]
    config: String,

    /// Collection to browse
    #[arg(short = 'C', long, default_value = "wildlife")]
    collection: String,

    /// Pages to load before printing the feed
    #[arg(short, long, default_value_t = 3)]
    pages: u32,

    /// Search the collection instead of browsing it
    #[arg(short, long)]
    query: Option<String>,

    /// Browse the built-in sample catalogue instead of a remote service
    #[arg(long)]
    sample: bool,

    /// Drop cached entries under the given key prefix, then exit
    #[arg(long, value_name = "PREFIX")]
    invalidate: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("lightbox={0},tiered_store={0}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lightbox v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    let cache = match &config.cache.base_directory {
        Some(dir) => TierManager::open(dir, config.expiry_policy()).await,
        None => TierManager::memory_only(config.expiry_policy()),
    };
    if !cache.has_durable_tier() {
        info!("No cache directory configured, state will not survive restarts");
    }

    if let Some(prefix) = cli.invalidate {
        cache.invalidate_prefix(&prefix).await;
        info!("Invalidated cached entries under '{prefix}'");
        return Ok(());
    }

    let service: Arc<dyn ContentService> = if cli.sample {
        info!("Browsing the built-in sample catalogue");
        Arc::new(SampleContentService::new())
    } else {
        info!("Using content service at {}", config.remote.base_url);
        Arc::new(HttpContentService::new(
            &config.remote.base_url,
            config.remote.connect_timeout,
        )?)
    };

    let profile = ContextProfile::public(&config, &cli.collection);
    match cli.query {
        Some(query) => run_search(service, cache, profile, &config, &query).await,
        None => run_browse(service, cache, profile, cli.pages).await,
    }
}

async fn run_browse(
    service: Arc<dyn ContentService>,
    cache: TierManager,
    profile: ContextProfile,
    pages: u32,
) -> Result<()> {
    let gallery = GalleryService::new(service, cache, profile);

    if gallery.load_initial().await? == InitialLoad::Restored {
        info!("Feed restored from cache without a network call");
    }
    // Stand in for the host scrolling to the end of the list.
    for _ in 1..pages {
        if !gallery.notify_end_reached().await? {
            break;
        }
    }

    let snapshot = gallery.snapshot().await;
    let records: usize = snapshot.artworks.iter().map(Artwork::record_count).sum();
    println!(
        "{} entries ({} records) over {} page(s), more available: {}",
        snapshot.entries.len(),
        records,
        snapshot.page.current_page,
        snapshot.page.has_more
    );
    for entry in &snapshot.entries {
        match &entry.series {
            Some(context) => println!(
                "  [{}/{}] {}  ({})",
                context.series_index, context.series_total, entry.record.title, context.series.title
            ),
            None => println!("        {}", entry.record.title),
        }
    }
    Ok(())
}

async fn run_search(
    service: Arc<dyn ContentService>,
    cache: TierManager,
    profile: ContextProfile,
    config: &Config,
    query: &str,
) -> Result<()> {
    let search = SearchService::new(service, cache, profile, config.search.debounce);
    search.set_query(query).await;

    let deadline = tokio::time::Instant::now() + config.search.debounce + Duration::from_secs(5);
    while search.status().await != SearchStatus::Loaded {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("Search for '{query}' timed out");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let snapshot = search.snapshot().await;
    println!("{} result(s) for '{query}'", snapshot.entries.len());
    for entry in &snapshot.entries {
        println!("  {:>4} likes  {}", entry.record.like_count, entry.record.title);
    }
    Ok(())
}

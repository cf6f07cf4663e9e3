//! Reads and prints any RSS/Atom feed, then polls it a second time to
//! demonstrate conditional-GET support: a server that honors validators
//! answers the second poll with "unchanged" instead of a full body.

use anyhow::{Context, Result};
use clap::Parser;
use feedpoll::{FetchEvent, FetcherConfig, FetcherEngine, MemoryFeedInfoCache};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "feedread", about = "Fetch a feed twice to test conditional GET support")]
struct Args {
    /// URL of the feed to read
    url: Url,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cache = Arc::new(MemoryFeedInfoCache::new());
    let engine = FetcherEngine::with_config(
        cache,
        FetcherConfig::default().timeout_secs(args.timeout),
    )
    .context("failed to build fetch client")?;

    engine.add_listener(Arc::new(|event: &FetchEvent| match event {
        FetchEvent::Polled { url } => eprintln!("\tEVENT: Feed Polled. URL = {url}"),
        FetchEvent::Retrieved { url } => eprintln!("\tEVENT: Feed Retrieved. URL = {url}"),
        FetchEvent::Unchanged { url } => eprintln!("\tEVENT: Feed Unchanged. URL = {url}"),
        FetchEvent::Error { url, error } => eprintln!("\tEVENT: Error. URL = {url}: {error}"),
    }));

    eprintln!("Retrieving feed {}", args.url);
    let feed = engine
        .retrieve_feed(&args.url)
        .await
        .with_context(|| format!("failed to retrieve {}", args.url))?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "(untitled)".to_string());
    eprintln!(
        "{} has a title: {} and contains {} entries.",
        args.url,
        title,
        feed.entries.len()
    );

    eprintln!("Polling {} again to test conditional get support.", args.url);
    engine.retrieve_feed(&args.url).await?;
    eprintln!("If a \"Feed Unchanged\" event fired then the server supports conditional gets.");

    Ok(())
}

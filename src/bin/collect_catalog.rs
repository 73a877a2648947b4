#![forbid(unsafe_code)]

//! Lists every upload of one or more channels through the YouTube Data API and
//! writes the flat record set consumed by `download_audio`.

use anyhow::{Context, Result, bail};
use channel_audio_tools::catalog::{CatalogApi, YouTubeClient};
use channel_audio_tools::collector::{CatalogCollector, CollectionReport};
use channel_audio_tools::config::{Settings, SettingsOverrides, resolve_settings};
use channel_audio_tools::logging;
use channel_audio_tools::records::write_document;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "collect_catalog",
    about = "Collect video metadata for YouTube channels"
)]
struct CollectArgs {
    /// Channel ids (UC...), @handles or channel URLs. Defaults to CHANNEL_IDS.
    channels: Vec<String>,

    /// Where to write the record set (default: youtube_channel_videos.json).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YouTube Data API key (default: YOUTUBE_API_KEY).
    #[arg(long)]
    api_key: Option<String>,

    /// Seconds to wait after each channel.
    #[arg(long)]
    pause_secs: Option<u64>,

    /// Alternate .env file.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl CollectArgs {
    fn into_overrides(self) -> SettingsOverrides {
        SettingsOverrides {
            api_key: self.api_key,
            channel_ids: Some(self.channels),
            catalog_output: self.output,
            channel_pause_secs: self.pause_secs,
            env_path: self.env_file,
            ..SettingsOverrides::default()
        }
    }
}

fn main() -> Result<()> {
    logging::init()?;
    let settings = resolve_settings(CollectArgs::parse().into_overrides())?;
    if settings.channel_ids.is_empty() {
        bail!("no channels given; pass identifiers or set CHANNEL_IDS");
    }
    let client = YouTubeClient::from_api_key(settings.api_key.as_deref())?;

    println!("===================================");
    println!("YouTube Catalog Collector");
    println!("===================================");
    println!("Channels: {}", settings.channel_ids.join(", "));
    println!("Output: {}", settings.catalog_output.display());
    println!();

    let report = collect(client, &settings)?;

    println!();
    println!("===================================");
    println!("Collection complete!");
    println!("===================================");
    println!(
        "Channels: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    println!("Videos: {}", report.records.len());
    println!("Data saved to {}", settings.catalog_output.display());

    Ok(())
}

/// Runs the collector and writes its output, whatever the per-channel results.
fn collect<C: CatalogApi>(catalog: C, settings: &Settings) -> Result<CollectionReport> {
    let collector = CatalogCollector::new(catalog, settings.collector_config());
    let report = collector.collect(&settings.channel_ids);

    write_document(&settings.catalog_output, &report.records)
        .with_context(|| format!("saving {}", settings.catalog_output.display()))?;

    if let Some(sample) = report.records.first() {
        tracing::debug!(?sample, "Sample video");
    }
    Ok(report)
}

#![forbid(unsafe_code)]

//! Catalog collection: channel identifiers in, one flat list of
//! [`VideoRecord`]s out.

use std::collections::{HashSet, VecDeque};
use std::thread;
use std::time::Duration;

use crate::catalog::{CatalogApi, ChannelLookup, MAX_PAGE_SIZE};
use crate::config::DEFAULT_CHANNEL_PAUSE_SECS;
use crate::error::CatalogError;
use crate::records::VideoRecord;

pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Pause after every channel, successful or not.
    pub channel_pause: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            channel_pause: Duration::from_secs(DEFAULT_CHANNEL_PAUSE_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub id: String,
    pub display_name: String,
    /// Uploads playlist reported by the same lookup, if any.
    pub uploads_playlist: Option<String>,
}

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL_BASE}{video_id}")
}

/// Resolves an identifier to the canonical id and a display name. Handles use
/// the handle text as display name; ids use the provider's title.
pub fn resolve_channel<C>(catalog: &C, identifier: &str) -> Result<ResolvedChannel, CatalogError>
where
    C: CatalogApi + ?Sized,
{
    let lookup = ChannelLookup::parse(identifier)?;
    let item = catalog
        .channels(&lookup)?
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::ChannelNotFound(identifier.to_string()))?;

    let display_name = match lookup {
        ChannelLookup::Handle(handle) => handle,
        ChannelLookup::Id(_) => item.snippet.title,
    };
    Ok(ResolvedChannel {
        id: item.id,
        display_name,
        uploads_playlist: item
            .content_details
            .related_playlists
            .uploads
            .filter(|uploads| !uploads.is_empty()),
    })
}

/// Looks up the channel's uploads playlist and returns a lazy iterator over
/// its video ids in provider order.
pub fn list_uploaded_video_ids<'a, C>(
    catalog: &'a C,
    channel_id: &str,
) -> Result<UploadIds<'a, C>, CatalogError>
where
    C: CatalogApi + ?Sized,
{
    let playlist_id = catalog
        .channels(&ChannelLookup::Id(channel_id.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::ChannelNotFound(channel_id.to_string()))?
        .content_details
        .related_playlists
        .uploads
        .filter(|uploads| !uploads.is_empty())
        .ok_or_else(|| CatalogError::MissingUploads(channel_id.to_string()))?;
    Ok(list_playlist_video_ids(catalog, playlist_id))
}

/// Lazy iterator over an already known uploads playlist.
pub fn list_playlist_video_ids<C>(catalog: &C, playlist_id: impl Into<String>) -> UploadIds<'_, C>
where
    C: CatalogApi + ?Sized,
{
    UploadIds::new(catalog, playlist_id.into())
}

/// Page-by-page walk over a playlist. Finite and not restartable: after the
/// last page, or after the first error, it only yields `None`.
pub struct UploadIds<'a, C: ?Sized> {
    catalog: &'a C,
    playlist_id: String,
    buffered: VecDeque<String>,
    next_page: Option<String>,
    started: bool,
    finished: bool,
}

impl<'a, C: CatalogApi + ?Sized> UploadIds<'a, C> {
    fn new(catalog: &'a C, playlist_id: String) -> Self {
        Self {
            catalog,
            playlist_id,
            buffered: VecDeque::new(),
            next_page: None,
            started: false,
            finished: false,
        }
    }
}

impl<C: CatalogApi + ?Sized> Iterator for UploadIds<'_, C> {
    type Item = Result<String, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.buffered.pop_front() {
                return Some(Ok(id));
            }
            if self.finished {
                return None;
            }

            let token = if self.started {
                self.next_page.take()
            } else {
                None
            };
            self.started = true;

            let page = match self.catalog.playlist_items(&self.playlist_id, token.as_deref()) {
                Ok(page) => page,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            self.buffered.extend(
                page.items
                    .into_iter()
                    .map(|item| item.content_details.video_id)
                    .filter(|id| !id.is_empty()),
            );
            self.next_page = page.next_page_token.filter(|token| !token.is_empty());
            if self.next_page.is_none() {
                self.finished = true;
            }
        }
    }
}

/// Fetches details in batches of at most [`MAX_PAGE_SIZE`]. Batches follow the
/// input order; records inside a batch follow the provider's response order.
pub fn fetch_video_details<C>(
    catalog: &C,
    video_ids: &[String],
    channel_name: &str,
) -> Result<Vec<VideoRecord>, CatalogError>
where
    C: CatalogApi + ?Sized,
{
    let mut records = Vec::with_capacity(video_ids.len());
    for batch in video_ids.chunks(MAX_PAGE_SIZE) {
        for item in catalog.videos(batch)? {
            records.push(VideoRecord {
                video_url: watch_url(&item.id),
                channel: channel_name.to_string(),
                title: item.snippet.title,
                published_at: item.snippet.published_at,
                duration: item.content_details.duration,
                views: item.statistics.views(),
                likes: item.statistics.likes(),
                comments: item.statistics.comments(),
                video_id: item.id,
                audio_file_path: None,
            });
        }
    }
    Ok(records)
}

/// Everything gathered for one channel. A failure anywhere discards the
/// channel's partial results.
pub fn collect_channel<C>(
    catalog: &C,
    identifier: &str,
) -> Result<(ResolvedChannel, Vec<VideoRecord>), CatalogError>
where
    C: CatalogApi + ?Sized,
{
    let channel = resolve_channel(catalog, identifier)?;
    tracing::info!(
        identifier,
        channel_id = %channel.id,
        channel = %channel.display_name,
        "Resolved channel"
    );

    let playlist_id = channel
        .uploads_playlist
        .as_deref()
        .ok_or_else(|| CatalogError::MissingUploads(channel.id.clone()))?;
    let video_ids =
        list_playlist_video_ids(catalog, playlist_id).collect::<Result<Vec<_>, _>>()?;
    tracing::info!(channel = %channel.display_name, videos = video_ids.len(), "Listed uploads");

    let records = fetch_video_details(catalog, &video_ids, &channel.display_name)?;
    Ok((channel, records))
}

#[derive(Debug)]
pub struct ChannelReport {
    pub identifier: String,
    pub result: Result<ChannelStats, CatalogError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    pub channel: ResolvedChannel,
    pub added: usize,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct CollectionReport {
    pub records: Vec<VideoRecord>,
    pub channels: Vec<ChannelReport>,
}

impl CollectionReport {
    pub fn succeeded(&self) -> usize {
        self.channels
            .iter()
            .filter(|report| report.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.channels.len() - self.succeeded()
    }
}

pub struct CatalogCollector<C> {
    catalog: C,
    config: CollectorConfig,
}

impl<C: CatalogApi> CatalogCollector<C> {
    pub fn new(catalog: C, config: CollectorConfig) -> Self {
        Self { catalog, config }
    }

    /// Processes channels one at a time. A failing channel is logged and
    /// skipped; `video_id`s already seen from an earlier channel are dropped.
    pub fn collect<S: AsRef<str>>(&self, identifiers: &[S]) -> CollectionReport {
        let mut report = CollectionReport::default();
        let mut seen = HashSet::new();

        for (index, identifier) in identifiers.iter().enumerate() {
            let identifier = identifier.as_ref();
            tracing::info!(
                "[{}/{}] Collecting channel {identifier}",
                index + 1,
                identifiers.len()
            );

            let result = collect_channel(&self.catalog, identifier).map(|(channel, records)| {
                let mut stats = ChannelStats {
                    channel,
                    added: 0,
                    duplicates: 0,
                };
                for record in records {
                    if seen.insert(record.video_id.clone()) {
                        report.records.push(record);
                        stats.added += 1;
                    } else {
                        tracing::debug!(video_id = %record.video_id, "Dropping duplicate video");
                        stats.duplicates += 1;
                    }
                }
                stats
            });

            match &result {
                Ok(stats) => tracing::info!(
                    channel = %stats.channel.display_name,
                    added = stats.added,
                    duplicates = stats.duplicates,
                    "Channel collected"
                ),
                Err(err) => tracing::error!(identifier, error = %err, "Skipping channel"),
            }
            report.channels.push(ChannelReport {
                identifier: identifier.to_string(),
                result,
            });

            if !self.config.channel_pause.is_zero() {
                thread::sleep(self.config.channel_pause);
            }
        }

        report
    }
}

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use channel_audio_tools::catalog::{
    CatalogApi, ChannelItem, ChannelLookup, PlaylistItem, PlaylistItemListResponse, VideoItem,
};
use channel_audio_tools::error::CatalogError;

/// In-memory catalog: channel id -> (title, uploads), served one page of
/// `page_size` ids at a time. Individual pages and detail lookups can be made
/// to fail.
#[derive(Clone)]
pub struct MockCatalog {
    channels: HashMap<String, (String, Vec<String>)>,
    handles: HashMap<String, String>,
    failing_pages: HashMap<String, usize>,
    failing_videos: HashSet<String>,
    page_size: usize,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    pub fn new(page_size: usize) -> Self {
        Self {
            channels: HashMap::new(),
            handles: HashMap::new(),
            failing_pages: HashMap::new(),
            failing_videos: HashSet::new(),
            page_size,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_channel(mut self, id: &str, title: &str, uploads: &[&str]) -> Self {
        self.channels.insert(
            id.to_string(),
            (
                title.to_string(),
                uploads.iter().map(|id| id.to_string()).collect(),
            ),
        );
        self
    }

    pub fn with_handle(mut self, handle: &str, id: &str) -> Self {
        self.handles.insert(handle.to_string(), id.to_string());
        self
    }

    /// Page `page` (zero based) of the channel's uploads returns an error.
    pub fn with_failing_page(mut self, channel_id: &str, page: usize) -> Self {
        self.failing_pages.insert(channel_id.to_string(), page);
        self
    }

    /// Any detail batch containing `video_id` returns an error.
    pub fn with_failing_video(mut self, video_id: &str) -> Self {
        self.failing_videos.insert(video_id.to_string());
        self
    }

    fn channel_item(&self, id: &str) -> Option<ChannelItem> {
        let (title, _) = self.channels.get(id)?;
        let mut item = ChannelItem {
            id: id.to_string(),
            ..ChannelItem::default()
        };
        item.snippet.title = title.clone();
        item.content_details.related_playlists.uploads = Some(format!("UU-{id}"));
        Some(item)
    }
}

impl CatalogApi for MockCatalog {
    fn channels(&self, lookup: &ChannelLookup) -> Result<Vec<ChannelItem>, CatalogError> {
        self.calls.lock().unwrap().push(format!("channels:{lookup:?}"));
        let id = match lookup {
            ChannelLookup::Id(id) => Some(id.clone()),
            ChannelLookup::Handle(handle) => self.handles.get(handle).cloned(),
        };
        Ok(id
            .and_then(|id| self.channel_item(&id))
            .into_iter()
            .collect())
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, CatalogError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("playlist:{playlist_id}:{page_token:?}"));
        let channel_id = playlist_id.trim_start_matches("UU-");
        let (_, uploads) = self
            .channels
            .get(channel_id)
            .ok_or_else(|| CatalogError::MissingUploads(channel_id.to_string()))?;

        let page: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        if self.failing_pages.get(channel_id) == Some(&page) {
            return Err(CatalogError::Decode {
                endpoint: "playlistItems",
                source: io::Error::other(format!("page {page} of {playlist_id}")),
            });
        }
        let start = (page * self.page_size).min(uploads.len());
        let end = (start + self.page_size).min(uploads.len());
        let items = uploads[start..end]
            .iter()
            .map(|id| {
                let mut item = PlaylistItem::default();
                item.content_details.video_id = id.clone();
                item
            })
            .collect();
        Ok(PlaylistItemListResponse {
            items,
            next_page_token: (end < uploads.len()).then(|| (page + 1).to_string()),
        })
    }

    fn videos(&self, video_ids: &[String]) -> Result<Vec<VideoItem>, CatalogError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("videos:{}", video_ids.len()));
        if let Some(id) = video_ids.iter().find(|id| self.failing_videos.contains(*id)) {
            return Err(CatalogError::Decode {
                endpoint: "videos",
                source: io::Error::other(format!("no details for {id}")),
            });
        }
        Ok(video_ids
            .iter()
            .map(|id| {
                let mut item = VideoItem {
                    id: id.clone(),
                    ..VideoItem::default()
                };
                item.snippet.title = format!("Video {id}");
                item.snippet.published_at = "2024-05-01T12:00:00Z".to_string();
                item.content_details.duration = "PT3M".to_string();
                item.statistics.view_count = Some("100".to_string());
                item
            })
            .collect())
    }
}

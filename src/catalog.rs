#![forbid(unsafe_code)]

//! Remote catalog boundary (YouTube Data API v3).
//!
//! Only the handful of fields the collector reads are modelled; everything is
//! defaulted so a sparse provider response never fails deserialization.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::CatalogError;

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Provider cap for both `maxResults` on list calls and ids per batch lookup.
pub const MAX_PAGE_SIZE: usize = 50;

const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// How a channel identifier should be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLookup {
    Id(String),
    /// Handle text without the leading `@`.
    Handle(String),
}

impl ChannelLookup {
    /// Accepts `UC...` ids, `@handle`, and channel URLs such as
    /// `https://www.youtube.com/@handle/videos` or
    /// `https://www.youtube.com/channel/UC...`. Legacy `/c/` and `/user/`
    /// URLs have no stable lookup and are rejected.
    pub fn parse(identifier: &str) -> Result<Self, CatalogError> {
        let trimmed = identifier.trim();
        let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
        let (is_url, path) = match without_query.split_once("youtube.com/") {
            Some((_, rest)) => (true, rest),
            None => (false, without_query),
        };

        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let first = segments.next();
        if let Some(handle) = first
            .and_then(|segment| segment.strip_prefix('@'))
            .filter(|handle| !handle.is_empty())
        {
            return Ok(ChannelLookup::Handle(handle.to_string()));
        }

        match (first, segments.next()) {
            (Some("channel"), Some(id)) if is_url => Ok(ChannelLookup::Id(id.to_string())),
            (Some(id), None) if !is_url => Ok(ChannelLookup::Id(id.to_string())),
            _ => Err(CatalogError::ChannelNotFound(identifier.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelListResponse {
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSnippet {
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

/// One page of a playlist listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemListResponse {
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItem {
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoListResponse {
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    pub content_details: VideoContentDetails,
    pub statistics: VideoStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSnippet {
    pub title: String,
    pub published_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoContentDetails {
    pub duration: String,
}

/// The API reports counters as decimal strings and omits hidden ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

impl VideoStatistics {
    pub fn views(&self) -> u64 {
        parse_count(self.view_count.as_deref())
    }

    pub fn likes(&self) -> u64 {
        parse_count(self.like_count.as_deref())
    }

    pub fn comments(&self) -> u64 {
        parse_count(self.comment_count.as_deref())
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Blocking calls the collector needs from the catalog provider.
pub trait CatalogApi {
    /// Channel lookup returning `snippet` and `contentDetails`.
    fn channels(&self, lookup: &ChannelLookup) -> Result<Vec<ChannelItem>, CatalogError>;

    /// One page of `playlistId`, at most [`MAX_PAGE_SIZE`] items.
    fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, CatalogError>;

    /// Details for at most [`MAX_PAGE_SIZE`] ids. Response order is the
    /// provider's, not necessarily the request order.
    fn videos(&self, video_ids: &[String]) -> Result<Vec<VideoItem>, CatalogError>;
}

impl<T: CatalogApi + ?Sized> CatalogApi for &T {
    fn channels(&self, lookup: &ChannelLookup) -> Result<Vec<ChannelItem>, CatalogError> {
        (**self).channels(lookup)
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, CatalogError> {
        (**self).playlist_items(playlist_id, page_token)
    }

    fn videos(&self, video_ids: &[String]) -> Result<Vec<VideoItem>, CatalogError> {
        (**self).videos(video_ids)
    }
}

/// `ureq`-backed client. The API key travels in a header so it never shows up
/// in URLs echoed by transport errors.
pub struct YouTubeClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build();
        Self {
            agent,
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Builds a client from an optional configured key.
    pub fn from_api_key(api_key: Option<&str>) -> Result<Self, CatalogError> {
        match api_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => Ok(Self::new(key)),
            None => Err(CatalogError::MissingApiKey),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.agent.get(&url).set(API_KEY_HEADER, &self.api_key);
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = request.call().map_err(|source| CatalogError::Request {
            endpoint,
            source: Box::new(source),
        })?;
        response
            .into_json::<T>()
            .map_err(|source| CatalogError::Decode { endpoint, source })
    }
}

impl CatalogApi for YouTubeClient {
    fn channels(&self, lookup: &ChannelLookup) -> Result<Vec<ChannelItem>, CatalogError> {
        let (key, value) = match lookup {
            ChannelLookup::Id(id) => ("id", id.as_str()),
            ChannelLookup::Handle(handle) => ("forHandle", handle.as_str()),
        };
        let response: ChannelListResponse =
            self.get("channels", &[("part", "snippet,contentDetails"), (key, value)])?;
        Ok(response.items)
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, CatalogError> {
        let max_results = MAX_PAGE_SIZE.to_string();
        let mut query = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get("playlistItems", &query)
    }

    fn videos(&self, video_ids: &[String]) -> Result<Vec<VideoItem>, CatalogError> {
        let ids = video_ids.join(",");
        let response: VideoListResponse = self.get(
            "videos",
            &[
                ("part", "snippet,contentDetails,statistics"),
                ("id", ids.as_str()),
            ],
        )?;
        Ok(response.items)
    }
}

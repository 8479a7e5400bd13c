//! YouTube Data API search

use async_trait::async_trait;
use famly_core::{Error, Result, VideoDescriptor, VideoLookup};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// [`VideoLookup`] backed by the YouTube `search.list` endpoint
#[derive(Debug, Clone)]
pub struct YoutubeLookup {
    client: Client,
    api_key: String,
    max_results: u32,
}

impl YoutubeLookup {
    pub fn new(api_key: String, max_results: u32) -> Self {
        Self::with_client(Client::new(), api_key, max_results)
    }

    /// Share an existing connection pool
    pub fn with_client(client: Client, api_key: String, max_results: u32) -> Self {
        Self {
            client,
            api_key,
            max_results,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    #[serde(default)]
    description: String,
}

impl SearchResponse {
    /// Channels and playlists carry no video id and are skipped
    fn into_descriptors(self) -> Vec<VideoDescriptor> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let source_id = item.id.video_id?;
                Some(VideoDescriptor {
                    title: item.snippet.title,
                    creator: item.snippet.channel_title,
                    source_id,
                    description: item.snippet.description,
                })
            })
            .collect()
    }
}

fn adapter(e: reqwest::Error) -> Error {
    Error::Adapter(format!("video search failed: {}", e))
}

#[async_trait]
impl VideoLookup for YoutubeLookup {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<VideoDescriptor>> {
        let max_results = self.max_results.to_string();
        let response: SearchResponse = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(adapter)?
            .error_for_status()
            .map_err(adapter)?
            .json()
            .await
            .map_err(adapter)?;

        let videos = response.into_descriptors();
        debug!(results = videos.len(), "Search complete");
        Ok(videos)
    }
}

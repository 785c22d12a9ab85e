use engine_logging::{engine_debug, engine_warn, redact_secrets};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::{map_reqwest_error, parse_base_url};
use crate::config::EngineConfig;
use crate::payload::error_message;
use crate::types::{FailureKind, ToolError};

/// Read-only client for the platform data API (search and lookup by id).
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub video_id: String,
    pub channel_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStats {
    pub id: String,
    pub title: String,
    pub published_at: String,
    pub view_count: Option<u64>,
    pub channel_id: String,
    pub channel_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub id: String,
    pub title: String,
    pub subscriber_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    channel_id: String,
    channel_title: String,
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

/// Counts arrive as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    view_count: Option<String>,
    subscriber_count: Option<String>,
}

fn parse_count(raw: Option<&String>) -> Option<u64> {
    raw.and_then(|value| value.parse().ok())
}

impl YouTubeClient {
    pub fn new(config: &EngineConfig) -> Result<Self, ToolError> {
        let api_key = config.credentials.require_api_key()?.to_string();
        let base_url = parse_base_url(&config.youtube_base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.http.connect_timeout)
            .timeout(config.http.request_timeout)
            .build()
            .map_err(|err| ToolError::generation(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchHit>, ToolError> {
        let max_results = max_results.to_string();
        let response: ListResponse<SearchItem> = self
            .get(
                "Search",
                "search",
                &[
                    ("part", "snippet"),
                    ("maxResults", &max_results),
                    ("q", query),
                    ("type", "video"),
                    ("order", "relevance"),
                ],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                Some(SearchHit {
                    video_id: item.id.video_id?,
                    channel_id: item.snippet.channel_id,
                    title: item.snippet.title,
                })
            })
            .collect())
    }

    pub async fn videos(&self, ids: &[String]) -> Result<Vec<VideoStats>, ToolError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let response: ListResponse<VideoItem> = self
            .get(
                "Videos",
                "videos",
                &[("part", "snippet,statistics"), ("id", &joined)],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| VideoStats {
                view_count: parse_count(item.statistics.view_count.as_ref()),
                id: item.id,
                title: item.snippet.title,
                published_at: item.snippet.published_at,
                channel_id: item.snippet.channel_id,
                channel_title: item.snippet.channel_title,
            })
            .collect())
    }

    pub async fn channels(&self, ids: &[String]) -> Result<Vec<ChannelStats>, ToolError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.join(",");
        let response: ListResponse<ChannelItem> = self
            .get(
                "Channels",
                "channels",
                &[("part", "snippet,statistics"), ("id", &joined)],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| ChannelStats {
                subscriber_count: parse_count(item.statistics.subscriber_count.as_ref()),
                id: item.id,
                title: item.snippet.title,
            })
            .collect())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api_name: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ToolError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| ToolError::generation(format!("invalid endpoint {path}: {err}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", &self.api_key);
        engine_debug!("GET {}", redact_secrets(url.as_str()));

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut details = format!("{api_name} API error: {status}.");
            if let Some(message) = error_message(&body) {
                details.push(' ');
                details.push_str(&message);
            }
            if matches!(status.as_u16(), 400 | 403) {
                details.push_str(
                    " Check that the API key is valid, the YouTube Data API v3 is enabled for it, \
                     and its referrer/IP restrictions allow this client.",
                );
            }
            engine_warn!("{}", details);
            return Err(ToolError::new(
                FailureKind::GenerationFailed {
                    status: Some(status.as_u16()),
                },
                details,
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ToolError::generation(format!("{api_name} response: {err}")))
    }
}

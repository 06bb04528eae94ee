use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{MetadataProvider, VideoComment, VideoMetadata, HIDDEN_COUNTER};
use crate::resolver::VideoId;

const MAX_COMMENTS: u32 = 20;

/// Metadata provider backed by the YouTube Data API v3.
pub struct YoutubeMetadataProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YoutubeMetadataProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_video(&self, video_id: &VideoId) -> Result<VideoItem> {
        let url = format!("{}/videos", self.base_url);
        let response = self.client
            .get(&url)
            .query(&[
                ("part", "snippet,contentDetails,statistics"),
                ("id", video_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("video request failed")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "video request failed with status: {}",
                response.status()
            ));
        }

        let list: ListResponse<VideoItem> = response.json().await
            .context("malformed video response")?;

        list.items
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("video not found: {}", video_id))
    }

    // comments may be disabled for a video; that is not a metadata failure
    async fn fetch_comments(&self, video_id: &VideoId) -> Vec<VideoComment> {
        let url = format!("{}/commentThreads", self.base_url);
        let max_results = MAX_COMMENTS.to_string();
        let response = self.client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id.as_str()),
                ("order", "relevance"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Comment request for {} returned {}", video_id, r.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Comment request for {} failed: {}", video_id, e);
                return Vec::new();
            }
        };

        match response.json::<ListResponse<CommentThread>>().await {
            Ok(list) => list.items
                .into_iter()
                .map(|thread| {
                    let c = thread.snippet.top_level_comment.snippet;
                    VideoComment { text: c.text_original, likes: c.like_count }
                })
                .collect(),
            Err(e) => {
                warn!("Malformed comment response for {}: {}", video_id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MetadataProvider for YoutubeMetadataProvider {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let item = self.fetch_video(video_id).await?;
        let top_comments = self.fetch_comments(video_id).await;
        info!("Fetched metadata for {} with {} comments", video_id, top_comments.len());

        let snippet = item.snippet;
        let thumbnail_url = snippet.thumbnails
            .and_then(|t| t.maxres.or(t.high).or(t.default))
            .map(|t| t.url)
            .unwrap_or_else(|| format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id));

        Ok(VideoMetadata {
            video_id: video_id.clone(),
            title: snippet.title,
            channel: snippet.channel_title,
            duration: format_iso_duration(&item.content_details.duration)?,
            view_count: counter_or_hidden(item.statistics.view_count.as_deref(), "viewCount", video_id)?,
            like_count: counter_or_hidden(item.statistics.like_count.as_deref(), "likeCount", video_id)?,
            comment_count: counter_or_hidden(item.statistics.comment_count.as_deref(), "commentCount", video_id)?,
            publish_date: snippet.published_at.chars().take(10).collect(),
            description: snippet.description,
            tags: snippet.tags,
            thumbnail_url,
            top_comments,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    snippet: VideoSnippet,
    content_details: ContentDetails,
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: Option<String>,
    published_at: String,
    #[serde(default)]
    tags: Vec<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

// the API reports counters as decimal strings; hidden counters are absent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_original: String,
    #[serde(default)]
    like_count: u64,
}

fn counter_or_hidden(raw: Option<&str>, field: &str, video_id: &VideoId) -> Result<String> {
    match raw {
        Some(raw) => format_count(raw),
        None => {
            warn!("{} of {} is hidden by the uploader", field, video_id);
            Ok(HIDDEN_COUNTER.to_string())
        }
    }
}

/// Renders a raw counter with thousands separators, e.g. `1234567` -> `1,234,567`.
fn format_count(raw: &str) -> Result<String> {
    let value: u64 = raw.trim().parse()
        .with_context(|| format!("invalid counter: {}", raw))?;
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    Ok(out)
}

/// Converts an ISO 8601 duration (`PT1H2M3S`) into `1:02:03` / `45:32`.
fn format_iso_duration(iso: &str) -> Result<String> {
    let body = iso.strip_prefix("PT")
        .or_else(|| iso.strip_prefix('P').map(|rest| rest.trim_start_matches('T')))
        .ok_or_else(|| anyhow::anyhow!("invalid duration: {}", iso))?;

    let (mut hours, mut minutes, mut seconds) = (0u64, 0u64, 0u64);
    let mut number = String::new();
    for ch in body.chars() {
        match ch {
            '0'..='9' => number.push(ch),
            'H' | 'M' | 'S' | 'D' => {
                let value: u64 = number.parse()
                    .with_context(|| format!("invalid duration: {}", iso))?;
                number.clear();
                match ch {
                    'D' => hours += value * 24,
                    'H' => hours += value,
                    'M' => minutes = value,
                    _ => seconds = value,
                }
            }
            'T' => {}
            _ => return Err(anyhow::anyhow!("invalid duration: {}", iso)),
        }
    }

    Ok(if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    })
}

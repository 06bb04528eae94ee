use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AgentError;
use crate::resolver::VideoId;

pub mod simulated;
pub mod youtube;

pub use simulated::SimulatedMetadataProvider;
pub use youtube::YoutubeMetadataProvider;

/// Placeholder for a counter the uploader chose not to publish.
pub const HIDDEN_COUNTER: &str = "hidden";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: VideoId,
    pub title: String,
    pub channel: Option<String>,
    // formatted as h:mm:ss or m:ss
    pub duration: String,
    pub view_count: String,
    pub like_count: String,
    pub comment_count: String,
    pub publish_date: String,
    pub description: String,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
    #[serde(default)]
    pub top_comments: Vec<VideoComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoComment {
    pub text: String,
    pub likes: u64,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata>;
}

/// Fetches metadata with an upper time bound, folding every provider
/// failure into [`AgentError::MetadataUnavailable`].
pub async fn fetch_with_timeout(
    provider: &dyn MetadataProvider,
    video_id: &VideoId,
    timeout: Duration,
) -> Result<VideoMetadata, AgentError> {
    info!("Fetching metadata for {} via {} provider", video_id, provider.name());

    match tokio::time::timeout(timeout, provider.fetch_metadata(video_id)).await {
        Ok(Ok(metadata)) => Ok(metadata),
        Ok(Err(e)) => {
            warn!("Metadata provider failed for {}: {:#}", video_id, e);
            Err(AgentError::metadata_unavailable(format!("{:#}", e)))
        }
        Err(_) => {
            warn!("Metadata provider timed out for {} after {:?}", video_id, timeout);
            Err(AgentError::metadata_unavailable(format!(
                "timed out after {}s",
                timeout.as_secs_f64()
            )))
        }
    }
}

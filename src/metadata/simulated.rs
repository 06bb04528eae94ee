use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::sleep;

use super::{MetadataProvider, VideoComment, VideoMetadata};
use crate::resolver::VideoId;

/// Stand-in provider returning a fixed record after a fixed delay.
///
/// Used when no API key is configured and as the test double for the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct SimulatedMetadataProvider {
    delay: Duration,
}

impl Default for SimulatedMetadataProvider {
    fn default() -> Self {
        Self { delay: Duration::from_millis(1500) }
    }
}

impl SimulatedMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn sample(video_id: &VideoId) -> VideoMetadata {
        VideoMetadata {
            video_id: video_id.clone(),
            title: "How to Build AI Agents - Complete Tutorial".to_string(),
            channel: Some("AI Academy".to_string()),
            duration: "45:32".to_string(),
            view_count: "1,234,567".to_string(),
            like_count: "45,678".to_string(),
            comment_count: "3,456".to_string(),
            publish_date: "2024-01-15".to_string(),
            description: "Learn how to build powerful AI agents from scratch. This comprehensive tutorial covers everything from basic concepts to advanced automation techniques.".to_string(),
            tags: ["AI", "Machine Learning", "Tutorial", "Automation", "Programming"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            thumbnail_url: format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id),
            top_comments: vec![
                VideoComment { text: "Best tutorial on AI agents I've found!".to_string(), likes: 234 },
                VideoComment { text: "The examples are really helpful".to_string(), likes: 156 },
                VideoComment { text: "Can you make a follow-up on advanced topics?".to_string(), likes: 98 },
                VideoComment { text: "How to handle errors in production?".to_string(), likes: 41 },
            ],
        }
    }
}

#[async_trait]
impl MetadataProvider for SimulatedMetadataProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        sleep(self.delay).await;
        Ok(Self::sample(video_id))
    }
}

use async_trait::async_trait;
use anyhow::Result;
use serde_json::{json, Value};

use super::{parse_count, OperationProcessor};
use crate::metadata::{VideoMetadata, HIDDEN_COUNTER};

#[derive(Debug, Clone, Default)]
pub struct EngagementProcessor;

fn counter(raw: &str, label: &str) -> Result<u64> {
    if raw == HIDDEN_COUNTER {
        return Err(anyhow::anyhow!("{} is hidden by the uploader, engagement cannot be computed", label));
    }
    parse_count(raw)
}

fn percent(part: u64, whole: u64) -> f64 {
    part as f64 * 100.0 / whole as f64
}

fn trend(engagement_rate: f64) -> &'static str {
    if engagement_rate >= 5.0 {
        "Exceptional"
    } else if engagement_rate >= 3.0 {
        "Above Average"
    } else if engagement_rate >= 1.0 {
        "Average"
    } else {
        "Below Average"
    }
}

#[async_trait]
impl OperationProcessor for EngagementProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        let views = counter(&metadata.view_count, "view count")?;
        let likes = counter(&metadata.like_count, "like count")?;
        let comments = counter(&metadata.comment_count, "comment count")?;

        if views == 0 {
            return Err(anyhow::anyhow!("cannot analyze engagement of a video without views"));
        }

        let engagement_rate = percent(likes + comments, views);
        let like_ratio = percent(likes, views);
        let comment_ratio = percent(comments, views);

        let mut insights = Vec::new();
        if engagement_rate >= 3.0 {
            insights.push("High engagement compared to typical videos");
        } else if engagement_rate < 1.0 {
            insights.push("Audience mostly watches without interacting");
        }
        if like_ratio >= 3.0 {
            insights.push("Strong positive sentiment in like ratio");
        }
        if comment_ratio >= 0.2 {
            insights.push("Active discussion in comments section");
        } else {
            insights.push("Few viewers leave comments; consider prompting discussion");
        }
        if engagement_rate >= 1.0 {
            insights.push("Content resonates well with target audience");
        }

        Ok(json!({
            "engagementRate": format!("{:.2}%", engagement_rate),
            "likeToViewRatio": format!("{:.2}%", like_ratio),
            "commentToViewRatio": format!("{:.2}%", comment_ratio),
            "trend": trend(engagement_rate),
            "insights": insights,
        }))
    }
}

use async_trait::async_trait;
use anyhow::Result;
use serde_json::{json, Value};

use super::OperationProcessor;
use crate::metadata::VideoMetadata;

#[derive(Debug, Clone, Default)]
pub struct InfoProcessor;

#[async_trait]
impl OperationProcessor for InfoProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        Ok(json!({
            "title": metadata.title,
            "channel": metadata.channel.as_deref().unwrap_or("Unknown"),
            "duration": metadata.duration,
            "views": metadata.view_count,
            "uploadDate": metadata.publish_date,
            "tags": metadata.tags,
        }))
    }
}

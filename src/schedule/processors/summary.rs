use async_trait::async_trait;
use anyhow::Result;
use serde_json::{json, Value};

use super::{sentences, OperationProcessor};
use crate::metadata::VideoMetadata;

const SUMMARY_SENTENCES: usize = 2;
const MAX_KEY_POINTS: usize = 5;
const MIN_KEY_POINTS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct SummaryProcessor;

#[async_trait]
impl OperationProcessor for SummaryProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        let mut parts = sentences(&metadata.description).into_iter();

        let lead: Vec<String> = parts.by_ref().take(SUMMARY_SENTENCES).collect();
        let summary = if lead.is_empty() {
            format!("{}.", metadata.title.trim_end_matches('.'))
        } else {
            lead.join(" ")
        };

        let mut key_points: Vec<String> = parts.take(MAX_KEY_POINTS).collect();
        if key_points.len() < MIN_KEY_POINTS {
            let room = MAX_KEY_POINTS - key_points.len();
            key_points.extend(metadata.tags.iter().take(room).map(|tag| format!("Covers {}", tag)));
        }

        Ok(json!({
            "summary": summary,
            "keyPoints": key_points,
        }))
    }
}

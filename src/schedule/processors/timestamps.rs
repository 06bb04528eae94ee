use async_trait::async_trait;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::{format_clock, parse_clock, OperationProcessor};
use crate::metadata::VideoMetadata;

const OUTLINE_PARTS: u64 = 6;

// "0:00 Intro", "1:02:03 - Deep dive"
static CHAPTER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\(?((?:\d{1,2}:)?\d{1,2}:\d{2})\)?\s*[-–:|]?\s*(\S.*?)\s*$")
        .expect("chapter pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub time: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
enum ChapterSource {
    Description,
    Outline,
}

/// Chapters listed in the description, or an evenly spaced outline over the
/// video duration when the description has none.
pub fn chapters(metadata: &VideoMetadata) -> Result<Vec<Chapter>> {
    let (chapters, _) = chapters_with_source(metadata)?;
    Ok(chapters)
}

fn chapters_with_source(metadata: &VideoMetadata) -> Result<(Vec<Chapter>, ChapterSource)> {
    let listed = listed_chapters(&metadata.description);
    if !listed.is_empty() {
        return Ok((listed, ChapterSource::Description));
    }

    let total = parse_clock(&metadata.duration)
        .ok_or_else(|| anyhow::anyhow!("invalid duration: {:?}", metadata.duration))?;
    let parts = OUTLINE_PARTS.min(total.max(1));
    let outline = (0..parts)
        .map(|i| Chapter {
            time: format_clock(i * total / parts),
            title: format!("Part {}", i + 1),
        })
        .collect();
    Ok((outline, ChapterSource::Outline))
}

fn listed_chapters(description: &str) -> Vec<Chapter> {
    let mut last = None;
    CHAPTER_LINE
        .captures_iter(description)
        .filter_map(|caps| {
            let time = caps.get(1)?.as_str();
            let secs = parse_clock(time)?;
            // chapter lists are ascending; anything else is prose mentioning a time
            if last.map_or(false, |prev| secs <= prev) {
                return None;
            }
            last = Some(secs);
            Some(Chapter {
                time: format_clock(secs),
                title: caps.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct TimestampsProcessor;

#[async_trait]
impl OperationProcessor for TimestampsProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        let (chapters, source) = chapters_with_source(metadata)?;
        Ok(serde_json::json!({
            "chapters": chapters,
            "source": source,
        }))
    }
}

use std::fmt::Write as _;

use async_trait::async_trait;
use anyhow::Result;
use serde_json::{json, Value};

use super::timestamps::chapters;
use super::{format_clock, parse_clock, sentences, OperationProcessor};
use crate::metadata::VideoMetadata;

const MAX_INTRO_SECS: u64 = 60;
const MIN_OUTRO_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct ScriptProcessor;

#[async_trait]
impl OperationProcessor for ScriptProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        let total = parse_clock(&metadata.duration)
            .ok_or_else(|| anyhow::anyhow!("invalid duration: {:?}", metadata.duration))?;
        let chapters = chapters(metadata)?;

        let intro_end = MAX_INTRO_SECS.min(total / 6);
        let outro_start = total.saturating_sub((total / 10).max(MIN_OUTRO_SECS)).max(intro_end);
        let opening = sentences(&metadata.description)
            .into_iter()
            .next()
            .unwrap_or_else(|| format!("Let's get into {}.", metadata.title));

        let mut script = String::new();
        writeln!(script, "[INTRO - 0:00-{}]", format_clock(intro_end))?;
        writeln!(
            script,
            "\"Hey everyone! Today we're diving into {}: what it is, how it works, and how you can use it yourself...\"",
            metadata.title
        )?;
        writeln!(script)?;
        writeln!(script, "[MAIN CONTENT - {}-{}]", format_clock(intro_end), format_clock(outro_start))?;
        writeln!(script, "\"{}\"", opening)?;
        writeln!(script)?;
        writeln!(script, "[SECTIONS]")?;
        for chapter in &chapters {
            writeln!(script, "- {} ({})", chapter.title, chapter.time)?;
        }
        writeln!(script)?;
        writeln!(script, "[CONCLUSION - {}-{}]", format_clock(outro_start), format_clock(total))?;
        write!(
            script,
            "\"That's everything you need to know to get started. Remember to start simple and iterate...\""
        )?;

        let mut hooks = vec![match metadata.tags.first() {
            Some(tag) => format!("Opening question about {} to grab attention", tag),
            None => "Opening question to grab attention".to_string(),
        }];
        hooks.push("Promise of actionable takeaways".to_string());
        if let Some(last) = chapters.last() {
            hooks.push(format!("Tease \"{}\" at the end", last.title));
        }

        Ok(json!({
            "script": script,
            "hooks": hooks,
        }))
    }
}

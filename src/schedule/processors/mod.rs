pub mod comments;
pub mod engagement;
pub mod info;
pub mod script;
pub mod summary;
pub mod timestamps;

use async_trait::async_trait;
use anyhow::Result;
use serde_json::Value;

use crate::metadata::VideoMetadata;

pub use comments::CommentsProcessor;
pub use engagement::EngagementProcessor;
pub use info::InfoProcessor;
pub use script::ScriptProcessor;
pub use summary::SummaryProcessor;
pub use timestamps::TimestampsProcessor;

/// Executor behind one operation definition.
///
/// Processors are stateless and must not depend on each other's output.
#[async_trait]
pub trait OperationProcessor: Send + Sync {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value>;
}

/// Parses a formatted counter such as `1,234,567`.
pub(crate) fn parse_count(raw: &str) -> Result<u64> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect();
    digits.parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid counter: {:?}", raw))
}

/// Parses `m:ss` or `h:mm:ss` into seconds.
pub(crate) fn parse_clock(raw: &str) -> Option<u64> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    parts.iter().try_fold(0u64, |acc, part| {
        let value = part.parse::<u64>().ok()?;
        Some(acc * 60 + value)
    })
}

pub(crate) fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Splits free text into trimmed sentences, treating newlines as boundaries.
pub(crate) fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            push_sentence(&mut out, &mut current);
            continue;
        }
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().map_or(true, |next| next.is_whitespace()) {
            push_sentence(&mut out, &mut current);
        }
    }
    push_sentence(&mut out, &mut current);
    out
}

fn push_sentence(out: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if !sentence.is_empty() {
        out.push(sentence.to_string());
    }
    current.clear();
}

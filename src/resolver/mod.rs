use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Identifier of a remote video, as extracted from a user supplied URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// tried in order, first match wins
static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)",
        r"youtube\.com/embed/([^&\n?#]+)",
        r"youtube\.com/shorts/([^&\n?#/]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

pub fn resolve(reference: &str) -> Result<VideoId, AgentError> {
    let reference = reference.trim();

    PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(reference))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::new(m.as_str()))
        .ok_or_else(|| AgentError::UnresolvableReference(reference.to_string()))
}

pub mod error;
pub mod metadata;
pub mod resolver;
pub mod schedule;
pub mod utils;
pub mod web;

use std::{env, sync::Arc, time::Duration};
use metadata::MetadataProvider;
use schedule::{EventCallback, TaskOrchestrator};
use once_cell::sync::Lazy;

pub use error::AgentError;

pub struct AppContext {
    pub provider: Arc<dyn MetadataProvider>,
    pub orchestrator: Arc<TaskOrchestrator>,
    pub metadata_timeout: Duration,
    // fan-out of every published snapshot, registered on the orchestrator
    pub events: EventCallback,
}

/// Capacity of the snapshot feed; slower subscribers skip ahead.
pub const EVENT_FEED_CAPACITY: usize = 64;

const AGENT_BIND_ADDR: &str = "127.0.0.1:7200";
const AGENT_LOG_DIR: &str = "./logs";
const AGENT_METADATA_PROVIDER: &str = "simulated";
const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const AGENT_METADATA_TIMEOUT_SECS: u64 = 10;

fn env_or_dotenv(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) => Some(value),
        Err(_) => dotenv::var(key).ok(),
    }
}

pub static BIND_ADDR: Lazy<String> = Lazy::new(|| {
    env_or_dotenv("AGENT_BIND_ADDR").unwrap_or_else(|| AGENT_BIND_ADDR.to_string())
});

pub static LOG_DIR: Lazy<String> = Lazy::new(|| {
    env_or_dotenv("AGENT_LOG_DIR").unwrap_or_else(|| AGENT_LOG_DIR.to_string())
});

pub static METADATA_PROVIDER: Lazy<String> = Lazy::new(|| {
    env_or_dotenv("AGENT_METADATA_PROVIDER").unwrap_or_else(|| AGENT_METADATA_PROVIDER.to_string())
});

pub static YOUTUBE_API_KEY: Lazy<Option<String>> = Lazy::new(|| {
    env_or_dotenv("YOUTUBE_API_KEY").filter(|key| !key.trim().is_empty())
});

pub static YOUTUBE_API_URL: Lazy<String> = Lazy::new(|| {
    env_or_dotenv("YOUTUBE_API_BASE").unwrap_or_else(|| YOUTUBE_API_BASE.to_string())
});

pub static METADATA_TIMEOUT: Lazy<Duration> = Lazy::new(|| {
    let secs = env_or_dotenv("AGENT_METADATA_TIMEOUT_SECS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(AGENT_METADATA_TIMEOUT_SECS);
    Duration::from_secs(secs)
});

// unset or 0 means executors may run as long as they need
pub static TASK_TIMEOUT: Lazy<Option<Duration>> = Lazy::new(|| {
    env_or_dotenv("AGENT_TASK_TIMEOUT_SECS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
});

pub fn init_env() {
    dotenv::dotenv().ok();

    // 确保日志目录存在
    std::fs::create_dir_all(LOG_DIR.as_str()).unwrap_or_else(|e| {
        eprintln!("Failed to create log directory: {}", e);
    });
}

#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use tracing::{info, warn};
use std::sync::Arc;
use std::net::SocketAddr;
use media_agent_rs::{
    metadata::{MetadataProvider, SimulatedMetadataProvider, YoutubeMetadataProvider},
    schedule::{EventCallback, OperationRegistry, TaskOrchestrator},
    utils::logger,
    AppContext, BIND_ADDR, EVENT_FEED_CAPACITY, LOG_DIR, METADATA_PROVIDER, METADATA_TIMEOUT, TASK_TIMEOUT,
    YOUTUBE_API_KEY, YOUTUBE_API_URL,
};

fn build_provider() -> Arc<dyn MetadataProvider> {
    match (METADATA_PROVIDER.as_str(), YOUTUBE_API_KEY.as_ref()) {
        ("youtube", Some(key)) => {
            info!("Using YouTube Data API at {}", YOUTUBE_API_URL.as_str());
            Arc::new(YoutubeMetadataProvider::new(YOUTUBE_API_URL.as_str(), key.as_str()))
        }
        ("youtube", None) => {
            warn!("AGENT_METADATA_PROVIDER=youtube but YOUTUBE_API_KEY is not set, falling back to simulated metadata");
            Arc::new(SimulatedMetadataProvider::new())
        }
        (other, _) => {
            if other != "simulated" {
                warn!("Unknown metadata provider '{}', using simulated metadata", other);
            }
            Arc::new(SimulatedMetadataProvider::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    media_agent_rs::init_env();

    // 初始化日志系统
    let _guard = logger::init(LOG_DIR.clone())?;

    info!("Starting media agent (build {})...", env!("GIT_HASH"));

    // 初始化元数据来源
    let provider = build_provider();
    info!("Metadata provider: {}", provider.name());

    // 初始化任务编排器
    info!("Initializing Task Orchestrator...");
    let mut orchestrator = TaskOrchestrator::new(OperationRegistry::builtin())
        .with_task_timeout(*TASK_TIMEOUT);
    info!("Registered {} operations", orchestrator.registry().len());

    // 快照事件广播
    let (events, _) = EventCallback::new(EVENT_FEED_CAPACITY);
    orchestrator.register_observer(Arc::new(events.clone()));

    // 创建应用上下文
    let ctx = Arc::new(AppContext {
        provider,
        orchestrator: Arc::new(orchestrator),
        metadata_timeout: *METADATA_TIMEOUT,
        events,
    });

    // 配置服务器地址
    let addr: SocketAddr = BIND_ADDR.parse()?;
    info!("Starting HTTP server at http://{}", addr);

    // 启动 HTTP 服务器
    match media_agent_rs::web::start_server(ctx.clone(), addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            tracing::error!("Server error: {}", e);
            return Err(e);
        }
    }

    // 优雅关闭
    info!("Shutting down...");
    ctx.orchestrator.cancel().await;

    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

pub mod types;
pub mod processors;
pub mod registry;
pub mod scheduler;
pub mod callback;
#[cfg(test)]
mod tests;

// 重导出主要类型
pub use types::{
    ProcessingRun, RunSnapshot, RunStatus, Task, TaskError, TaskErrorKind, TaskStatus,
};

// 重导出处理器接口
pub use processors::OperationProcessor;
pub use registry::{OperationDefinition, OperationInfo, OperationRegistry};
pub use callback::{EventCallback, FunctionCallback, HttpCallback, RunObserver};

// 重导出调度器接口
pub use scheduler::{RunHandle, SnapshotReceiver, TaskOrchestrator};

use crate::error::AgentError;
use crate::metadata::{fetch_with_timeout, MetadataProvider};
use crate::resolver;

/// Resolves a reference, fetches its metadata and starts a run.
///
/// Selection and run-slot checks happen before the (possibly slow)
/// metadata fetch so obviously invalid requests fail fast.
pub async fn start_from_reference<S: AsRef<str>>(
    orchestrator: &TaskOrchestrator,
    provider: &dyn MetadataProvider,
    reference: &str,
    operation_ids: &[S],
    metadata_timeout: Duration,
    extra_observers: Vec<Arc<dyn RunObserver>>,
) -> Result<RunHandle, AgentError> {
    let video_id = resolver::resolve(reference)?;
    orchestrator.validate_selection(operation_ids)?;

    if orchestrator.is_running().await {
        let run_id = orchestrator
            .current_snapshot()
            .map(|s| s.run_id.clone())
            .unwrap_or_default();
        return Err(AgentError::RunInProgress(run_id));
    }

    let metadata = fetch_with_timeout(provider, &video_id, metadata_timeout).await?;
    orchestrator.start_run_with(metadata, operation_ids, extra_observers).await
}

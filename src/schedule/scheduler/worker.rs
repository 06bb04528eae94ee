use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::orchestrator::ActiveRun;
use crate::schedule::registry::OperationRegistry;
use crate::schedule::types::{ProcessingRun, RunSnapshot, RunStatus, TaskError, TaskStatus};

/// State shared between the orchestrator and the worker of the active run.
pub(super) struct RunState {
    pub active: Mutex<Option<ActiveRun>>,
    pub snapshots: watch::Sender<Option<Arc<RunSnapshot>>>,
}

pub(super) struct RunWorker {
    // run being executed, owned exclusively by this worker
    run: ProcessingRun,
    registry: Arc<OperationRegistry>,
    state: Arc<RunState>,
    // ordered feed for observers
    events: mpsc::UnboundedSender<Arc<RunSnapshot>>,
    dispatcher: JoinHandle<()>,
    cancel: CancellationToken,
    task_timeout: Option<Duration>,
}

impl RunWorker {
    pub fn new(
        run: ProcessingRun,
        registry: Arc<OperationRegistry>,
        state: Arc<RunState>,
        events: mpsc::UnboundedSender<Arc<RunSnapshot>>,
        dispatcher: JoinHandle<()>,
        cancel: CancellationToken,
        task_timeout: Option<Duration>,
    ) -> Self {
        Self { run, registry, state, events, dispatcher, cancel, task_timeout }
    }

    pub async fn run(mut self) -> RunSnapshot {
        let mut cancelled = false;

        for index in 0..self.run.tasks.len() {
            // cancellation is honoured between tasks, never mid-executor
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            self.process_task(index).await;
        }

        if cancelled {
            for index in 0..self.run.tasks.len() {
                if self.run.tasks[index].status == TaskStatus::Pending {
                    self.run.tasks[index].fail(TaskError::cancelled());
                    self.publish();
                }
            }
        }

        let status = if cancelled { RunStatus::Cancelled } else { RunStatus::Finished };
        let last = self.finish(status).await;

        // let observers drain before reporting completion
        drop(self.events);
        if let Err(e) = self.dispatcher.await {
            error!("Observer dispatcher for run {} ended abnormally: {}", last.run_id, e);
        }

        last
    }

    async fn process_task(&mut self, index: usize) {
        let task_id = self.run.tasks[index].id.clone();
        self.run.tasks[index].start();
        self.publish();

        info!("Processing task {} of run {}", task_id, self.run.id);

        match self.execute(&task_id).await {
            Ok(result) => {
                info!("Task {} completed successfully", task_id);
                self.run.tasks[index].complete(result);
            }
            Err(e) => {
                warn!("Task {} failed: {}", task_id, e);
                self.run.tasks[index].fail(e);
            }
        }
        self.publish();
    }

    async fn execute(&self, task_id: &str) -> Result<Value, TaskError> {
        let definition = self.registry
            .lookup(task_id)
            .ok_or_else(|| TaskError::executor(format!("operation {} is not registered", task_id)))?;

        let processor = definition.processor.clone();
        let metadata = self.run.metadata.clone();
        // own task so a panicking processor only fails its own task
        let mut handle = tokio::spawn(async move { processor.process(&metadata).await });

        let joined = match self.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    return Err(TaskError::timed_out(limit.as_secs_f64()));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TaskError::executor(format!("{:#}", e))),
            Err(e) => Err(TaskError::executor(format!("executor aborted: {}", e))),
        }
    }

    fn publish(&mut self) -> Arc<RunSnapshot> {
        let snapshot = Arc::new(self.run.snapshot());
        self.state.snapshots.send_replace(Some(snapshot.clone()));
        let _ = self.events.send(snapshot.clone());
        snapshot
    }

    // the final snapshot and the release of the slot happen under one lock,
    // so a run started right after can never be overwritten by this one
    async fn finish(&mut self, status: RunStatus) -> RunSnapshot {
        let state = self.state.clone();
        let mut active = state.active.lock().await;
        self.run.finish(status);
        let last = self.publish();
        if active.as_ref().map_or(false, |a| a.run_id == self.run.id) {
            *active = None;
        }
        info!(
            "Run {} {:?}: {} completed, {} failed",
            self.run.id,
            status,
            self.run.tasks.iter().filter(|t| t.status == TaskStatus::Completed).count(),
            self.run.tasks.iter().filter(|t| t.status == TaskStatus::Error).count(),
        );
        (*last).clone()
    }
}

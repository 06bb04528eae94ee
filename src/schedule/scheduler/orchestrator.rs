use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::worker::{RunState, RunWorker};
use super::{RunHandle, SnapshotReceiver};
use crate::error::AgentError;
use crate::metadata::VideoMetadata;
use crate::schedule::callback::RunObserver;
use crate::schedule::registry::{OperationInfo, OperationRegistry};
use crate::schedule::types::{ProcessingRun, RunSnapshot, Task};

/// Drives one processing run at a time through its tasks.
pub struct TaskOrchestrator {
    registry: Arc<OperationRegistry>,
    observers: Vec<Arc<dyn RunObserver>>,
    task_timeout: Option<Duration>,
    state: Arc<RunState>,
}

pub(super) struct ActiveRun {
    pub run_id: String,
    pub cancel: CancellationToken,
}

impl TaskOrchestrator {
    pub fn new(registry: OperationRegistry) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            registry: Arc::new(registry),
            observers: Vec::new(),
            task_timeout: None,
            state: Arc::new(RunState {
                active: Mutex::new(None),
                snapshots,
            }),
        }
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn register_observer(&mut self, observer: Arc<dyn RunObserver>) {
        self.observers.push(observer);
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn operations(&self) -> Vec<OperationInfo> {
        self.registry.definitions()
    }

    /// Checks a selection against the registry without starting anything.
    pub fn validate_selection<S: AsRef<str>>(&self, operation_ids: &[S]) -> Result<(), AgentError> {
        if operation_ids.is_empty() {
            return Err(AgentError::invalid_selection("no operations selected"));
        }

        let unknown: Vec<&str> = operation_ids
            .iter()
            .map(|id| id.as_ref())
            .filter(|id| !self.registry.contains(id))
            .collect();
        if !unknown.is_empty() {
            return Err(AgentError::invalid_selection(format!(
                "unknown operations: {}",
                unknown.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = operation_ids.iter().map(|id| id.as_ref()).find(|id| !seen.insert(*id)) {
            return Err(AgentError::invalid_selection(format!("operation selected twice: {}", dup)));
        }

        Ok(())
    }

    pub async fn start_run<S: AsRef<str>>(
        &self,
        metadata: VideoMetadata,
        operation_ids: &[S],
    ) -> Result<RunHandle, AgentError> {
        self.start_run_with(metadata, operation_ids, Vec::new()).await
    }

    /// Starts a run whose snapshots also go to `extra_observers`.
    pub async fn start_run_with<S: AsRef<str>>(
        &self,
        metadata: VideoMetadata,
        operation_ids: &[S],
        extra_observers: Vec<Arc<dyn RunObserver>>,
    ) -> Result<RunHandle, AgentError> {
        self.validate_selection(operation_ids)?;

        let mut active = self.state.active.lock().await;
        if let Some(current) = active.as_ref() {
            warn!("Rejecting new run while {} is active", current.run_id);
            return Err(AgentError::RunInProgress(current.run_id.clone()));
        }

        let tasks: Vec<Task> = operation_ids
            .iter()
            .filter_map(|id| self.registry.lookup(id.as_ref()))
            .map(|def| Task::pending(def.id.clone(), def.name.clone()))
            .collect();

        let run_id = format!("run-{}", Uuid::new_v4());
        let mut run = ProcessingRun::new(run_id.clone(), Arc::new(metadata), tasks);
        let cancel = CancellationToken::new();

        let mut observers = self.observers.clone();
        observers.extend(extra_observers);
        let (events, dispatcher) = spawn_dispatcher(run_id.clone(), observers);

        let initial = Arc::new(run.snapshot());
        self.state.snapshots.send_replace(Some(initial.clone()));
        let _ = events.send(initial.clone());

        info!("Starting run {} for video {} with {} tasks", run_id, run.metadata.video_id, run.tasks.len());

        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            cancel: cancel.clone(),
        });
        drop(active);

        let worker = RunWorker::new(
            run,
            self.registry.clone(),
            self.state.clone(),
            events,
            dispatcher,
            cancel.clone(),
            self.task_timeout,
        );
        let join = tokio::spawn(worker.run());

        Ok(RunHandle {
            run_id,
            initial,
            cancel,
            snapshots: self.state.snapshots.subscribe(),
            join,
        })
    }

    /// Latest published snapshot; `None` until the first run starts.
    pub fn current_snapshot(&self) -> Option<Arc<RunSnapshot>> {
        self.state.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.state.snapshots.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.state.active.lock().await.is_some()
    }

    /// Requests cancellation of the active run. Returns `false` when idle.
    pub async fn cancel(&self) -> bool {
        match self.state.active.lock().await.as_ref() {
            Some(current) => {
                info!("Cancelling run {}", current.run_id);
                current.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

// delivers snapshots to observers in order, off the execution path
fn spawn_dispatcher(
    run_id: String,
    observers: Vec<Arc<dyn RunObserver>>,
) -> (mpsc::UnboundedSender<Arc<RunSnapshot>>, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<RunSnapshot>>();
    let handle = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            for observer in &observers {
                if let Err(e) = observer.on_snapshot(&snapshot).await {
                    warn!("Observer failed for run {} (seq {}): {}", run_id, snapshot.sequence, e);
                }
            }
        }
    });
    (tx, handle)
}

impl Drop for TaskOrchestrator {
    fn drop(&mut self) {
        if let Ok(active) = self.state.active.try_lock() {
            if let Some(current) = active.as_ref() {
                info!("TaskOrchestrator dropped, cancelling run {}", current.run_id);
                current.cancel.cancel();
            }
        }
    }
}

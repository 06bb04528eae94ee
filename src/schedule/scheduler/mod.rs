mod orchestrator;
mod worker;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use anyhow::Result;

pub use orchestrator::TaskOrchestrator;
use crate::schedule::types::RunSnapshot;

pub type SnapshotReceiver = watch::Receiver<Option<Arc<RunSnapshot>>>;

/// Handle to a started run.
///
/// Dropping it does not stop the run; use [`RunHandle::cancel`].
pub struct RunHandle {
    run_id: String,
    initial: Arc<RunSnapshot>,
    cancel: CancellationToken,
    snapshots: SnapshotReceiver,
    join: JoinHandle<RunSnapshot>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Snapshot published at creation, every task still pending.
    pub fn initial_snapshot(&self) -> Arc<RunSnapshot> {
        self.initial.clone()
    }

    pub fn snapshots(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to end and returns its final snapshot.
    pub async fn wait(self) -> Result<RunSnapshot> {
        Ok(self.join.await?)
    }
}

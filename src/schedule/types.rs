use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metadata::VideoMetadata;
use crate::resolver::VideoId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskErrorKind {
    ExecutorFailure,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn executor(message: impl Into<String>) -> Self {
        Self { kind: TaskErrorKind::ExecutorFailure, message: message.into() }
    }

    pub fn cancelled() -> Self {
        Self { kind: TaskErrorKind::Cancelled, message: "Run cancelled before task started".to_string() }
    }

    pub fn timed_out(secs: f64) -> Self {
        Self { kind: TaskErrorKind::TimedOut, message: format!("Task exceeded {}s", secs) }
    }
}

impl Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// One selected operation inside a run.
///
/// `result` is set iff the task completed, `error` iff it failed; the
/// transition methods are the only writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self, result: Value) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: TaskError) {
        self.status = TaskStatus::Error;
        self.result = None;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Cancelled,
}

/// Immutable view of a processing run, published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub video_id: VideoId,
    // record the run was started with, shared by every snapshot of the run
    pub metadata: Arc<VideoMetadata>,
    pub status: RunStatus,
    // bumped on every published transition
    pub sequence: u64,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSnapshot {
    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::Running
    }

    pub fn running_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Running).count()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Working state of the active run, owned by the driver.
#[derive(Debug)]
pub struct ProcessingRun {
    pub id: String,
    pub metadata: Arc<VideoMetadata>,
    pub tasks: Vec<Task>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    sequence: u64,
}

impl ProcessingRun {
    pub fn new(id: String, metadata: Arc<VideoMetadata>, tasks: Vec<Task>) -> Self {
        Self {
            id,
            metadata,
            tasks,
            status: RunStatus::Running,
            created_at: Utc::now(),
            finished_at: None,
            sequence: 0,
        }
    }

    pub fn snapshot(&mut self) -> RunSnapshot {
        self.sequence += 1;
        RunSnapshot {
            run_id: self.id.clone(),
            video_id: self.metadata.video_id.clone(),
            metadata: self.metadata.clone(),
            status: self.status,
            sequence: self.sequence,
            tasks: self.tasks.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

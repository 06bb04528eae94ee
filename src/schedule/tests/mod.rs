use super::*;
use crate::metadata::{MetadataProvider, SimulatedMetadataProvider, VideoMetadata};
use crate::resolver::VideoId;
use crate::schedule::registry::{
    ANALYZE_COMMENTS, ANALYZE_ENGAGEMENT, EXTRACT_INFO, EXTRACT_TIMESTAMPS, GENERATE_SCRIPT,
    GENERATE_SUMMARY,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex as StdMutex;
use tokio::sync::Notify;
use tokio::time::sleep;

// 测试辅助处理器
struct FailingProcessor;

#[async_trait]
impl OperationProcessor for FailingProcessor {
    async fn process(&self, _metadata: &VideoMetadata) -> Result<Value> {
        Err(anyhow::anyhow!("comment service unreachable"))
    }
}

struct SlowProcessor(Duration);

#[async_trait]
impl OperationProcessor for SlowProcessor {
    async fn process(&self, metadata: &VideoMetadata) -> Result<Value> {
        sleep(self.0).await;
        Ok(json!({ "video": metadata.video_id }))
    }
}

struct GateProcessor(Arc<Notify>);

#[async_trait]
impl OperationProcessor for GateProcessor {
    async fn process(&self, _metadata: &VideoMetadata) -> Result<Value> {
        self.0.notified().await;
        Ok(json!({ "released": true }))
    }
}

struct PanicProcessor;

#[async_trait]
impl OperationProcessor for PanicProcessor {
    async fn process(&self, _metadata: &VideoMetadata) -> Result<Value> {
        panic!("processor bug");
    }
}

struct UnavailableProvider;

#[async_trait]
impl MetadataProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn fetch_metadata(&self, _video_id: &VideoId) -> Result<VideoMetadata> {
        Err(anyhow::anyhow!("upstream returned 503"))
    }
}

fn sample_metadata() -> VideoMetadata {
    SimulatedMetadataProvider::sample(&VideoId::new("abc123"))
}

fn orchestrator_with(overrides: Vec<OperationDefinition>) -> TaskOrchestrator {
    let mut registry = OperationRegistry::builtin();
    for definition in overrides {
        registry.register(definition);
    }
    TaskOrchestrator::new(registry)
}

// records every snapshot the run publishes
fn recording_orchestrator(
    overrides: Vec<OperationDefinition>,
) -> (TaskOrchestrator, Arc<StdMutex<Vec<RunSnapshot>>>) {
    let mut orchestrator = orchestrator_with(overrides);
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    orchestrator.register_observer(Arc::new(FunctionCallback::new(move |s: &RunSnapshot| {
        sink.lock().unwrap().push(s.clone());
        Ok(())
    })));
    (orchestrator, seen)
}

fn statuses(snapshot: &RunSnapshot) -> Vec<TaskStatus> {
    snapshot.tasks.iter().map(|t| t.status).collect()
}

#[tokio::test]
async fn test_two_operations_complete_in_order() -> Result<()> {
    let orchestrator = orchestrator_with(Vec::new());

    let handle = orchestrator.start_run(sample_metadata(), &[EXTRACT_INFO, GENERATE_SUMMARY]).await?;
    let initial = handle.initial_snapshot();
    assert_eq!(statuses(&initial), vec![TaskStatus::Pending, TaskStatus::Pending]);

    let last = handle.wait().await?;
    let ids: Vec<&str> = last.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![EXTRACT_INFO, GENERATE_SUMMARY]);
    assert_eq!(last.tasks[1].name, "Generate Summary");
    for task in &last.tasks {
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.result.as_ref().map_or(false, |r| !r.is_null()));
        assert!(task.error.is_none());
    }
    assert_eq!(last.status, RunStatus::Finished);
    Ok(())
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let orchestrator = orchestrator_with(Vec::new());
    let empty: [&str; 0] = [];

    let err = orchestrator.start_run(sample_metadata(), &empty).await.err();
    assert!(matches!(err, Some(AgentError::InvalidSelection(_))));
    assert!(orchestrator.current_snapshot().is_none());
    assert!(!orchestrator.is_running().await);
}

#[tokio::test]
async fn test_unknown_or_duplicate_operation_is_rejected() {
    let orchestrator = orchestrator_with(Vec::new());

    let err = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_INFO, "translate-video"])
        .await
        .err();
    match err {
        Some(AgentError::InvalidSelection(reason)) => assert!(reason.contains("translate-video")),
        other => panic!("unexpected outcome: {:?}", other.map(|e| e.to_string())),
    }

    let err = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_INFO, EXTRACT_INFO])
        .await
        .err();
    assert!(matches!(err, Some(AgentError::InvalidSelection(_))));
    assert!(orchestrator.current_snapshot().is_none());
}

#[tokio::test]
async fn test_failing_task_does_not_stop_the_run() -> Result<()> {
    let orchestrator = orchestrator_with(vec![OperationDefinition::new(
        ANALYZE_COMMENTS,
        "Analyze Comments",
        FailingProcessor,
    )]);

    let handle = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_INFO, ANALYZE_COMMENTS, EXTRACT_TIMESTAMPS])
        .await?;
    let last = handle.wait().await?;

    assert_eq!(
        statuses(&last),
        vec![TaskStatus::Completed, TaskStatus::Error, TaskStatus::Completed]
    );
    let error = last.tasks[1].error.as_ref().unwrap();
    assert_eq!(error.kind, TaskErrorKind::ExecutorFailure);
    assert!(error.message.contains("comment service unreachable"));
    assert!(last.tasks[1].result.is_none());
    assert_eq!(last.status, RunStatus::Finished);
    Ok(())
}

#[tokio::test]
async fn test_failure_is_isolated_from_other_tasks() -> Result<()> {
    let selection = [EXTRACT_INFO, ANALYZE_ENGAGEMENT, GENERATE_SCRIPT];

    let healthy = orchestrator_with(Vec::new());
    let baseline = healthy.start_run(sample_metadata(), &selection).await?.wait().await?;

    let broken = orchestrator_with(vec![OperationDefinition::new(
        ANALYZE_ENGAGEMENT,
        "Analyze Engagement",
        FailingProcessor,
    )]);
    let degraded = broken.start_run(sample_metadata(), &selection).await?.wait().await?;

    for index in [0, 2] {
        assert_eq!(baseline.tasks[index].status, degraded.tasks[index].status);
        assert_eq!(baseline.tasks[index].result, degraded.tasks[index].result);
    }
    assert_eq!(degraded.tasks[1].status, TaskStatus::Error);
    Ok(())
}

#[tokio::test]
async fn test_second_run_while_active_is_rejected() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let orchestrator = orchestrator_with(vec![OperationDefinition::new(
        EXTRACT_INFO,
        "Extract Video Information",
        GateProcessor(gate.clone()),
    )]);

    let first = orchestrator.start_run(sample_metadata(), &[EXTRACT_INFO]).await?;
    assert!(orchestrator.is_running().await);

    let err = orchestrator.start_run(sample_metadata(), &[GENERATE_SUMMARY]).await.err();
    match err {
        Some(AgentError::RunInProgress(run_id)) => assert_eq!(run_id, first.run_id()),
        other => panic!("unexpected outcome: {:?}", other.map(|e| e.to_string())),
    }

    gate.notify_one();
    let last = first.wait().await?;
    assert_eq!(last.status, RunStatus::Finished);

    // slot is free once the first run reported its final snapshot
    let second = orchestrator.start_run(sample_metadata(), &[GENERATE_SUMMARY]).await?;
    let second_last = second.wait().await?;
    assert_ne!(second_last.run_id, last.run_id);
    assert_eq!(orchestrator.current_snapshot().map(|s| s.run_id.clone()), Some(second_last.run_id));
    Ok(())
}

#[tokio::test]
async fn test_snapshots_are_sequential_and_ordered() -> Result<()> {
    let (orchestrator, seen) = recording_orchestrator(vec![OperationDefinition::new(
        ANALYZE_COMMENTS,
        "Analyze Comments",
        FailingProcessor,
    )]);
    let selection = [GENERATE_SCRIPT, ANALYZE_COMMENTS, EXTRACT_INFO, ANALYZE_ENGAGEMENT];

    orchestrator.start_run(sample_metadata(), &selection).await?.wait().await?;

    let snapshots = seen.lock().unwrap().clone();
    // initial + (running, outcome) per task + final
    assert_eq!(snapshots.len(), 1 + 2 * selection.len() + 1);

    let mut last_sequence = 0;
    for snapshot in &snapshots {
        assert!(snapshot.sequence > last_sequence);
        last_sequence = snapshot.sequence;

        let ids: Vec<&str> = snapshot.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, selection.to_vec());
        assert!(snapshot.running_count() <= 1);

        // a task only leaves pending once everything before it is terminal
        for (index, task) in snapshot.tasks.iter().enumerate() {
            if task.status != TaskStatus::Pending {
                assert!(snapshot.tasks[..index].iter().all(|t| t.status.is_terminal()));
            }
        }
    }

    let last = snapshots.last().unwrap();
    assert!(last.is_finished());
    assert!(last.tasks.iter().all(|t| t.status.is_terminal()));
    Ok(())
}

#[tokio::test]
async fn test_failing_observer_does_not_affect_the_run() -> Result<()> {
    let mut orchestrator = orchestrator_with(Vec::new());
    let calls = Arc::new(StdMutex::new(0usize));
    let counter = calls.clone();
    orchestrator.register_observer(Arc::new(FunctionCallback::new(move |_: &RunSnapshot| {
        *counter.lock().unwrap() += 1;
        Err(anyhow::anyhow!("observer endpoint unreachable"))
    })));

    let last = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_INFO, GENERATE_SUMMARY])
        .await?
        .wait()
        .await?;

    assert_eq!(statuses(&last), vec![TaskStatus::Completed, TaskStatus::Completed]);
    assert_eq!(last.status, RunStatus::Finished);
    // still offered every snapshot despite failing on each
    assert_eq!(*calls.lock().unwrap(), 6);
    assert!(!orchestrator.is_running().await);
    Ok(())
}

#[tokio::test]
async fn test_snapshots_carry_the_metadata() -> Result<()> {
    let orchestrator = orchestrator_with(Vec::new());
    let handle = orchestrator.start_run(sample_metadata(), &[EXTRACT_INFO]).await?;

    assert_eq!(handle.initial_snapshot().metadata.title, "How to Build AI Agents - Complete Tutorial");
    let last = handle.wait().await?;
    assert_eq!(*last.metadata, sample_metadata());
    Ok(())
}

#[tokio::test]
async fn test_current_snapshot_is_stable_without_transitions() -> Result<()> {
    let orchestrator = orchestrator_with(Vec::new());
    assert!(orchestrator.current_snapshot().is_none());

    orchestrator.start_run(sample_metadata(), &[EXTRACT_INFO]).await?.wait().await?;

    let first = orchestrator.current_snapshot().unwrap();
    let second = orchestrator.current_snapshot().unwrap();
    assert_eq!(first, second);
    assert!(first.is_finished());
    Ok(())
}

#[tokio::test]
async fn test_cancel_between_tasks() -> Result<()> {
    let gate = Arc::new(Notify::new());
    let orchestrator = orchestrator_with(vec![OperationDefinition::new(
        EXTRACT_INFO,
        "Extract Video Information",
        GateProcessor(gate.clone()),
    )]);

    let handle = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_INFO, GENERATE_SUMMARY, GENERATE_SCRIPT])
        .await?;
    let mut rx = handle.snapshots();
    rx.wait_for(|s| {
        s.as_ref()
            .map_or(false, |s| s.tasks[0].status == TaskStatus::Running)
    })
    .await?;

    assert!(orchestrator.cancel().await);
    gate.notify_one();

    let last = handle.wait().await?;
    assert_eq!(last.status, RunStatus::Cancelled);
    // the in-flight executor was allowed to finish
    assert_eq!(last.tasks[0].status, TaskStatus::Completed);
    for task in &last.tasks[1..] {
        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.error.as_ref().map(|e| e.kind), Some(TaskErrorKind::Cancelled));
    }
    assert!(!orchestrator.is_running().await);
    assert!(!orchestrator.cancel().await);
    Ok(())
}

#[tokio::test]
async fn test_task_timeout_marks_error_and_continues() -> Result<()> {
    let orchestrator = orchestrator_with(vec![OperationDefinition::new(
        EXTRACT_TIMESTAMPS,
        "Extract Timestamps",
        SlowProcessor(Duration::from_secs(5)),
    )])
    .with_task_timeout(Some(Duration::from_millis(50)));

    let last = orchestrator
        .start_run(sample_metadata(), &[EXTRACT_TIMESTAMPS, EXTRACT_INFO])
        .await?
        .wait()
        .await?;

    assert_eq!(last.tasks[0].error.as_ref().map(|e| e.kind), Some(TaskErrorKind::TimedOut));
    assert_eq!(last.tasks[1].status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_panicking_processor_is_contained() -> Result<()> {
    let orchestrator = orchestrator_with(vec![OperationDefinition::new(
        GENERATE_SUMMARY,
        "Generate Summary",
        PanicProcessor,
    )]);

    let last = orchestrator
        .start_run(sample_metadata(), &[GENERATE_SUMMARY, EXTRACT_INFO])
        .await?
        .wait()
        .await?;

    assert_eq!(last.tasks[0].error.as_ref().map(|e| e.kind), Some(TaskErrorKind::ExecutorFailure));
    assert_eq!(last.tasks[1].status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_start_from_reference() -> Result<()> {
    let orchestrator = orchestrator_with(Vec::new());
    let provider = SimulatedMetadataProvider::with_delay(Duration::from_millis(1));

    let handle = start_from_reference(
        &orchestrator,
        &provider,
        "https://youtu.be/xyz789",
        &[EXTRACT_INFO],
        Duration::from_secs(1),
        Vec::new(),
    )
    .await?;
    let last = handle.wait().await?;
    assert_eq!(last.video_id, VideoId::new("xyz789"));
    assert_eq!(last.tasks[0].status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_start_from_reference_failures_create_no_run() {
    let orchestrator = orchestrator_with(Vec::new());
    let timeout = Duration::from_secs(1);

    let err = start_from_reference(
        &orchestrator,
        &SimulatedMetadataProvider::with_delay(Duration::ZERO),
        "not a url",
        &[EXTRACT_INFO],
        timeout,
        Vec::new(),
    )
    .await
    .err();
    assert!(matches!(err, Some(AgentError::UnresolvableReference(_))));

    let err = start_from_reference(
        &orchestrator,
        &UnavailableProvider,
        "https://www.youtube.com/watch?v=abc123",
        &[EXTRACT_INFO],
        timeout,
        Vec::new(),
    )
    .await
    .err();
    assert!(matches!(err, Some(AgentError::MetadataUnavailable(_))));
    assert!(orchestrator.current_snapshot().is_none());
}

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use crate::schedule::{self, HttpCallback, RunObserver, RunSnapshot};
use crate::utils::http::ApiResponse;
use crate::AppContext;

const SSE_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn agent_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/operations", get(list_operations))
        .route("/runs", post(start_run))
        .route("/runs/current", get(current_run))
        .route("/runs/current/cancel", post(cancel_run))
        .route("/runs/events", get(run_events))
        .with_state(ctx)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StartRunRequest {
    pub url: String,
    pub actions: Vec<String>,
    // optional: receives every snapshot of this run
    pub callback_url: Option<String>,
}

// acknowledges the request only; the run's final snapshot tells whether
// anything was actually cancelled
#[derive(Debug, Serialize)]
struct CancelResponse {
    run_id: String,
    cancel_requested: bool,
}

async fn list_operations(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(ctx.orchestrator.operations())))
}

async fn start_run(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<StartRunRequest>,
) -> Response {
    let mut observers: Vec<Arc<dyn RunObserver>> = Vec::new();
    if let Some(url) = req.callback_url.filter(|u| !u.trim().is_empty()) {
        match HttpCallback::new(url) {
            Ok(callback) => {
                info!("Snapshots of the next run will be posted to {}", callback.url());
                observers.push(Arc::new(callback));
            }
            Err(e) => {
                error!("Failed to create callback client: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error("CallbackUnavailable", e.to_string())),
                )
                    .into_response();
            }
        }
    }

    let started = schedule::start_from_reference(
        &ctx.orchestrator,
        ctx.provider.as_ref(),
        &req.url,
        req.actions.as_slice(),
        ctx.metadata_timeout,
        observers,
    )
    .await;

    match started {
        Ok(handle) => {
            info!("Run {} started for {}", handle.run_id(), req.url);
            let snapshot = handle.initial_snapshot();
            (StatusCode::CREATED, Json(ApiResponse::success(snapshot.as_ref()))).into_response()
        }
        Err(e) => {
            error!("Failed to start run for {}: {}", req.url, e);
            e.into_response()
        }
    }
}

async fn current_run(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.orchestrator.current_snapshot() {
        Some(snapshot) => (StatusCode::OK, Json(ApiResponse::success(snapshot.as_ref()))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error("NoRun", "No run has been started yet")),
        )
            .into_response(),
    }
}

/// Requests cancellation of the active run.
///
/// `202` means the request was recorded. Cancellation is checked between
/// tasks, so a run whose last task is already executing still ends `finished`.
async fn cancel_run(State(ctx): State<Arc<AppContext>>) -> Response {
    if !ctx.orchestrator.cancel().await {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::<()>::error("NoActiveRun", "No run is currently active")),
        )
            .into_response();
    }

    let run_id = ctx.orchestrator
        .current_snapshot()
        .map(|s| s.run_id.clone())
        .unwrap_or_default();
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(CancelResponse { run_id, cancel_requested: true })),
    )
        .into_response()
}

fn snapshot_event(snapshot: &RunSnapshot) -> Result<Event, Infallible> {
    let data = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default()
        .id(snapshot.sequence.to_string())
        .event("snapshot")
        .data(data))
}

/// Server-sent feed of snapshots: the latest one first, then every new one.
async fn run_events(
    State(ctx): State<Arc<AppContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.events.subscribe();
    let latest = stream::iter(ctx.orchestrator.current_snapshot().map(|s| snapshot_event(&s)));

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(snapshot) => Some(snapshot_event(&snapshot)),
            Err(e) => {
                warn!("Snapshot feed subscriber lagged: {:?}", e);
                None
            }
        }
    });

    Sse::new(latest.chain(live)).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE_INTERVAL))
}

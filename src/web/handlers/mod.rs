use axum::Router;
use std::sync::Arc;
use crate::AppContext;

pub mod agent;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .nest("/agent", agent::agent_router(ctx))
}

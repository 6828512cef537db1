//! Web server — Axum router + shared state.

pub mod api;
pub mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::CorsLayer;

use atlas_core::context::AssistantContext;
use atlas_core::dispatcher::Dispatcher;

/// Shared application state.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub ctx: AssistantContext,
    pub poll_interval_seconds: u64,
    pub started_at: Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::routes())
        .merge(ws::routes())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

//! REST API endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use atlas_core::input;

use super::AppState;

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/utterance", post(post_utterance))
        .route("/api/reminders", get(get_reminders))
        .route("/api/logs", get(get_logs))
        .route("/api/status", get(get_status))
}

// --- Utterance ---

#[derive(Deserialize)]
struct UtteranceBody {
    text: Option<String>,
}

async fn post_utterance(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UtteranceBody>,
) -> Json<Value> {
    let raw = body.text.unwrap_or_default();
    match input::submit(&state.dispatcher, &raw).await {
        Some(outcome) => {
            info!("Utterance handled via web");
            Json(json!({
                "ok": true,
                "reply": outcome.reply,
                "action": outcome.action,
            }))
        }
        None => Json(json!({"ok": false, "error": "empty utterance"})),
    }
}

// --- Reminders ---

async fn get_reminders(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.ctx.store.reminders() {
        Ok(reminders) => Json(json!({"ok": true, "reminders": reminders})),
        Err(e) => {
            error!("Failed to read reminders: {}", e);
            Json(json!({"ok": false, "error": e.to_string()}))
        }
    }
}

// --- Logs ---

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Json<Value> {
    let limit = q.limit.unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_LOG_LIMIT);
    match state.ctx.store.recent_logs(limit) {
        Ok(entries) => Json(json!({"ok": true, "logs": entries})),
        Err(e) => {
            error!("Failed to read logs: {}", e);
            Json(json!({"ok": false, "error": e.to_string()}))
        }
    }
}

// --- Status ---

async fn get_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let actions: Vec<String> = state
        .dispatcher
        .registry()
        .specs()
        .iter()
        .map(|s| s.signature())
        .collect();
    let pending = state.ctx.store.reminders().map(|r| r.len()).ok();

    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "planner": state.dispatcher.planner().describe(),
        "actions": actions,
        "pending_reminders": pending,
        "poll_interval_seconds": state.poll_interval_seconds,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

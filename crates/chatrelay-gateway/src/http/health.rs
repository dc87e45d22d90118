use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use chatrelay_dispatch::RelayContext;

use crate::app::AppState;

/// GET /health: liveness probe returning server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let relay = state.relay();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": env!("CHATRELAY_GIT_SHA"),
        "provider": relay.agent().provider_name(),
        "model": relay.agent().model(),
        "sessions": relay.sessions().len(),
        "events_accepted": state.events_accepted(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};

use chatrelay_dispatch::{DispatchContext, Dispatcher, RelayContext};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<DispatchContext>>,
    pub started_at: DateTime<Utc>,
    events_accepted: AtomicU64,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher<DispatchContext>>) -> Self {
        Self {
            dispatcher,
            started_at: Utc::now(),
            events_accepted: AtomicU64::new(0),
        }
    }

    pub fn relay(&self) -> &DispatchContext {
        self.dispatcher.context()
    }

    /// Bearer token the bridge must present, if any.
    pub fn bridge_token(&self) -> Option<&str> {
        self.relay().config().bridge.token.as_deref()
    }

    /// Count an accepted event and return its sequence number.
    pub fn next_seq(&self) -> u64 {
        self.events_accepted.fetch_add(1, Ordering::Relaxed)
    }

    pub fn events_accepted(&self) -> u64 {
        self.events_accepted.load(Ordering::Relaxed)
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/events", post(crate::http::events::events_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

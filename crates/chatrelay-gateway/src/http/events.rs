//! Inbound chat events: POST /events.
//!
//! The bridge posts one [`ChatEvent`] per request. When `bridge.token` is
//! set the request must carry either `Authorization: Bearer <token>` or an
//! `X-Hub-Signature-256: sha256=<hex>` HMAC of the body keyed with the token.
//! Accepted events are routed on their own task; the response only confirms
//! receipt.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use chatrelay_channels::ChatEvent;
use chatrelay_core::error::RelayError;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

// ── Public handler ────────────────────────────────────────────────────────────

/// POST /events
///
/// Returns 202 + receipt ID on success, 401 on auth failure, 400 on a
/// malformed body.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(token) = state.bridge_token() {
        authenticate(&headers, &body, token).map_err(error_response)?;
    }

    let mut event: ChatEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, bytes = body.len(), "invalid event body");
        error_response(RelayError::Serialization(e))
    })?;

    let receipt_id = uuid::Uuid::new_v4().to_string();
    if event.id.is_empty() {
        event.id = receipt_id.clone();
    }

    let seq = state.next_seq();
    info!(
        receipt_id = %receipt_id, seq, event = %event.id,
        kind = ?event.kind, chat = ?event.chat, "event accepted"
    );
    state.dispatcher.spawn_route(event);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"ok": true, "receipt_id": receipt_id})),
    ))
}

// ── Auth helpers ──────────────────────────────────────────────────────────────

/// Accept either a matching bearer token or a valid body signature.
fn authenticate(headers: &HeaderMap, body: &Bytes, token: &str) -> Result<(), RelayError> {
    let verified = if headers.contains_key("x-hub-signature-256") {
        verify_hmac_sha256(headers, body, token)
    } else {
        verify_bearer_token(headers, token)
    };
    verified.map_err(RelayError::AuthFailed)
}

/// Verify GitHub-style HMAC-SHA256: `sha256=<hex>` in X-Hub-Signature-256.
fn verify_hmac_sha256(headers: &HeaderMap, body: &Bytes, secret: &str) -> Result<(), String> {
    let sig_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Hub-Signature-256 header".to_string())?;

    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "malformed X-Hub-Signature-256 header".to_string())?;

    let expected =
        hex::decode(sig_hex).map_err(|_| "X-Hub-Signature-256 is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}

/// Verify a static bearer token in the `Authorization: Bearer <token>` header.
fn verify_bearer_token(headers: &HeaderMap, expected: &str) -> Result<(), String> {
    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Authorization header must use Bearer scheme".to_string())?;

    if tokens_match(token, expected) {
        Ok(())
    } else {
        Err("bearer token mismatch".to_string())
    }
}

/// Compare two secrets in constant time by MACing the presented one and
/// checking the tag with `verify_slice`.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut presented_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    presented_mac.update(presented.as_bytes());
    presented_mac.verify_slice(&expected_tag).is_ok()
}

// ── Error helpers ─────────────────────────────────────────────────────────────

fn error_response(err: RelayError) -> (StatusCode, Json<Value>) {
    let status = match err {
        RelayError::AuthFailed(_) => {
            warn!(reason = %err, "event authentication failed");
            StatusCode::UNAUTHORIZED
        }
        RelayError::Serialization(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({"error": err.code(), "reason": err.to_string()})),
    )
}

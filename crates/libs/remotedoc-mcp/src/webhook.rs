//! GitHub webhook endpoint (§4.7): a `push` event triggers an out-of-band
//! sync of the matching tracked repository. Every other event type, and
//! every push for an untracked repository, is acknowledged with `200` and
//! otherwise ignored. Signature verification of `X-Hub-Signature-256` is a
//! documented gap (§9), not handled here.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use remotedoc_core::{CacheEngine, RepositoryIdentity};

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    repository: RepositoryInfo,
}

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    name: String,
    owner: OwnerInfo,
}

#[derive(Debug, Deserialize)]
struct OwnerInfo {
    login: String,
}

pub async fn github_webhook_handler(State(engine): State<Arc<CacheEngine>>, headers: HeaderMap, body: axum::body::Bytes) -> impl IntoResponse {
    let event = headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string();
    let delivery_id = headers.get("X-GitHub-Delivery").and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string();
    tracing::info!(event = %event, delivery_id = %delivery_id, "received github webhook");

    if event != "push" {
        return (StatusCode::OK, Json(json!({"status": "success", "event": event, "delivery_id": delivery_id})));
    }

    let payload: PushPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse github push payload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": format!("failed to process webhook: {e}")})),
            );
        }
    };

    let branch = payload.git_ref.rsplit('/').next().unwrap_or(&payload.git_ref).to_string();
    let identity = RepositoryIdentity::new(payload.repository.owner.login, payload.repository.name, branch);

    match engine.sync_webhook(&identity).await {
        Ok(()) => {
            metrics::counter!("remotedoc_webhook_syncs_total").increment(1);
            (StatusCode::OK, Json(json!({"status": "success", "event": event, "delivery_id": delivery_id})))
        }
        Err(e) => {
            tracing::error!(repo = %identity, error = %e, "webhook-triggered sync failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"status": "error", "message": e.to_string()})))
        }
    }
}

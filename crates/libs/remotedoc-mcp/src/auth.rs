//! Bearer-credential extraction for the HTTP transport.
//!
//! §6 requires a `Bearer <key>` credential on every RPC request, case-
//! insensitive header name and scheme. The axum middleware below extracts
//! it, reduces it to its digest, and scopes it into a task-local for the
//! duration of the request: the MCP tool handlers that run inside the same
//! request's task (`rmcp`'s streamable-HTTP service dispatches a tool call
//! within the task that is handling the HTTP request that triggered it)
//! read it back out rather than threading it through `rmcp`'s handler
//! signatures, which carry no first-class per-request auth slot.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use rmcp::ErrorData as McpError;

use remotedoc_core::auth::digest_api_key;

tokio::task_local! {
    static CURRENT_KEY_DIGEST: String;
}

/// Rejects requests with a missing bearer credential; scopes the digest of
/// a present one for the rest of the request's handling.
pub async fn bearer_auth_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let token = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => bearer.token().to_string(),
        None => return Err(StatusCode::UNAUTHORIZED),
    };
    let digest = digest_api_key(&token);
    Ok(CURRENT_KEY_DIGEST.scope(digest, next.run(req)).await)
}

/// The presented key's digest for the in-flight request.
///
/// `stdio_fallback` supplies the single static key digest the stdio
/// transport was configured with, since that transport has no HTTP header
/// to scope a task-local from; the HTTP transport always goes through
/// [`bearer_auth_middleware`] first and never needs the fallback.
pub fn current_key_digest(stdio_fallback: Option<&str>) -> Result<String, McpError> {
    CURRENT_KEY_DIGEST
        .try_with(|digest| digest.clone())
        .ok()
        .or_else(|| stdio_fallback.map(str::to_string))
        .ok_or_else(|| McpError::invalid_request("missing bearer credential", None))
}

//! Wires a loaded [`AppConfig`] into a running service: the shared cache
//! engine and auth binding construction, and the HTTP/stdio transport entry
//! points the `remotedoc-http`, `remotedoc-stdio`, and `remotedoc-cli`
//! binaries each delegate to.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use remotedoc_common::AppConfig;
use remotedoc_core::{AllowAllBinding, AuthBinding, CacheEngine, CacheEngineConfig, MultiKeyBinding, RepositoryConfig, RepositoryIdentity};

use crate::auth::bearer_auth_middleware;
use crate::tools::RemoteDocService;
use crate::webhook::github_webhook_handler;

/// Builds the cache engine from `cfg`, seeds every statically configured
/// repository, and runs the bounded-parallel initial sync before handing
/// the engine back ready to serve.
pub async fn build_engine(cfg: &AppConfig) -> Arc<CacheEngine> {
    let engine = Arc::new(CacheEngine::new(CacheEngineConfig {
        cache_root: cfg.cache_root.clone(),
        sync_interval: cfg.sync_interval_secs.map(Duration::from_secs),
        max_workers: cfg.max_workers,
        sync_timeout: Duration::from_secs(30),
    }));

    for seed in &cfg.repositories {
        let identity = RepositoryIdentity::new(seed.owner.clone(), seed.repo.clone(), seed.branch.clone());
        let credential = seed.credential_env.as_deref().and_then(|var| std::env::var(var).ok());
        let config = RepositoryConfig {
            root_spec_path: seed.root_spec_path.clone(),
            credential,
        };
        engine.register_unsynced(identity, config).await;
    }

    engine.sync_all_initial().await;
    engine
}

/// Builds the `AuthBinding` from `cfg.api_keys`, each granted access to
/// every repository the engine tracks. Stands in for the admin/database
/// binding store §1 scopes out of this engine; an empty `api_keys` falls
/// back to allowing any presented key, matching the stdio transport's
/// single-local-user model.
pub async fn build_auth(cfg: &AppConfig, engine: &CacheEngine) -> Arc<dyn AuthBinding> {
    let identities = engine.identities().await;
    if cfg.api_keys.is_empty() {
        Arc::new(AllowAllBinding::new(identities))
    } else {
        Arc::new(MultiKeyBinding::grant_all(&cfg.api_keys, identities))
    }
}

#[derive(Clone)]
struct HealthState {
    metrics_handle: PrometheusHandle,
    start_time: Instant,
}

fn setup_metrics() -> PrometheusHandle {
    const EXPONENTIAL_SECONDS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full("remotedoc_read_duration_seconds".to_string()), EXPONENTIAL_SECONDS)
        .expect("failed to set prometheus buckets")
        .install_recorder()
        .expect("failed to install prometheus recorder")
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let uptime_seconds = state.start_time.elapsed().as_secs();
    (StatusCode::OK, Json(json!({"status": "ready", "uptime_seconds": uptime_seconds})))
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

fn health_router(metrics_handle: PrometheusHandle) -> Router {
    let state = HealthState {
        metrics_handle,
        start_time: Instant::now(),
    };
    Router::new().route("/health", get(health_handler)).route("/ready", get(ready_handler)).route("/metrics", get(metrics_handler)).with_state(state)
}

fn webhook_router(engine: Arc<CacheEngine>) -> Router {
    Router::new().route("/webhook/github", post(github_webhook_handler)).with_state(engine)
}

/// A new `RemoteDocService` per `/mcp` session, sharing the one engine and
/// auth binding across every connection.
fn mcp_router(engine: Arc<CacheEngine>, auth: Arc<dyn AuthBinding>) -> Router {
    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig::default();
    let service_factory = move || -> Result<RemoteDocService, std::io::Error> { Ok(RemoteDocService::new(engine.clone(), auth.clone())) };
    let mcp_service = StreamableHttpService::new(service_factory, session_manager, config);

    Router::new().route("/mcp", axum::routing::any_service(mcp_service)).layer(axum::middleware::from_fn(bearer_auth_middleware))
}

/// Runs the HTTP transport (§4.8, §6): `/mcp` behind bearer auth, the
/// always-open `/health`, `/ready`, `/metrics` probes, and `/webhook/github`
/// when `cfg.webhook_enabled`.
pub async fn run_http(cfg: AppConfig) -> anyhow::Result<()> {
    let metrics_handle = setup_metrics();
    let engine = build_engine(&cfg).await;
    let auth = build_auth(&cfg, &engine).await;

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let mut app = Router::new().merge(mcp_router(engine.clone(), auth)).merge(health_router(metrics_handle));
    if cfg.webhook_enabled {
        app = app.merge(webhook_router(engine.clone()));
    }
    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    tracing::info!(%addr, "remotedoc-http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the stdio transport (§4.8): every call is authorized as the first
/// configured API key, or `"local"` when none was provisioned.
pub async fn run_stdio(cfg: AppConfig) -> anyhow::Result<()> {
    let engine = build_engine(&cfg).await;
    let auth = build_auth(&cfg, &engine).await;
    let static_key = cfg.api_keys.first().cloned().unwrap_or_else(|| "local".to_string());

    let service = RemoteDocService::new_stdio(engine, auth, &static_key);
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = service.serve(transport).await?;
    let quit_reason = server.waiting().await?;
    tracing::info!(?quit_reason, "remotedoc-stdio shutting down");
    Ok(())
}

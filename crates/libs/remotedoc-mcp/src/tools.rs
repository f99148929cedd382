//! `RemoteDocService`: the `rmcp` `ServerHandler` exposing `list_doc` and
//! `read_doc` (§4.8), shared by the HTTP and stdio transports.

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;

use remotedoc_core::auth::digest_api_key;
use remotedoc_core::{AuthBinding, CacheEngine, RemoteDocUrl};

use crate::auth::current_key_digest;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadDocParams {
    /// The `remotedoc://owner/repo/branch/path` URL to read.
    pub url: String,
}

/// Shared RPC surface over the cache engine. One instance is constructed
/// per HTTP connection (see `remotedoc-http`) or once for the lifetime of
/// a stdio process (see `remotedoc-stdio`).
#[derive(Clone)]
pub struct RemoteDocService {
    engine: Arc<CacheEngine>,
    auth: Arc<dyn AuthBinding>,
    tool_router: ToolRouter<Self>,
    /// Set only for the stdio transport, which has no per-request bearer
    /// header to scope a key digest from.
    stdio_key_digest: Option<String>,
}

impl RemoteDocService {
    /// For the HTTP transport: the key digest is read per-request from the
    /// bearer-auth task-local set by [`crate::auth::bearer_auth_middleware`].
    pub fn new(engine: Arc<CacheEngine>, auth: Arc<dyn AuthBinding>) -> Self {
        Self {
            engine,
            auth,
            tool_router: Self::tool_router(),
            stdio_key_digest: None,
        }
    }

    /// For the stdio transport: every call is authorized as `static_key`.
    pub fn new_stdio(engine: Arc<CacheEngine>, auth: Arc<dyn AuthBinding>, static_key: &str) -> Self {
        Self {
            engine,
            auth,
            tool_router: Self::tool_router(),
            stdio_key_digest: Some(digest_api_key(static_key)),
        }
    }

    fn key_digest(&self) -> Result<String, McpError> {
        current_key_digest(self.stdio_key_digest.as_deref())
    }
}

#[tool_router]
impl RemoteDocService {
    #[tool(description = "List every repository document visible to the caller's API key, with its description and root spec URL.")]
    async fn list_doc(&self) -> Result<CallToolResult, McpError> {
        let key_digest = self.key_digest()?;
        let listings = self.engine.list(&key_digest, self.auth.as_ref()).await.map_err(map_error)?;
        metrics::counter!("remotedoc_list_requests_total").increment(1);

        let body = serde_json::to_string(&listings).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    #[tool(description = "Read a document by its remotedoc:// URL. Relative Markdown links in the body are rewritten to remotedoc:// URLs.")]
    async fn read_doc(&self, params: Parameters<ReadDocParams>) -> Result<CallToolResult, McpError> {
        let key_digest = self.key_digest()?;
        let url = RemoteDocUrl::parse(&params.0.url).map_err(map_error)?;

        let result = self
            .engine
            .read(&url.owner, &url.repo, &url.branch, &url.path, &key_digest, self.auth.as_ref())
            .await;

        match result {
            Ok(content) => {
                metrics::counter!("remotedoc_read_requests_total").increment(1);
                Ok(CallToolResult::success(vec![Content::text(content)]))
            }
            Err(e) => {
                if matches!(e, remotedoc_core::Error::Unauthorized(_)) {
                    metrics::counter!("remotedoc_auth_rejections_total").increment(1);
                }
                Err(map_error(e))
            }
        }
    }
}

/// Every tool's schema, for the CLI's `schema`/`tools` subcommands. Built
/// from the bare `ToolRouter`, with no `RemoteDocService` instance needed.
pub fn tool_catalog() -> Vec<rmcp::model::Tool> {
    RemoteDocService::tool_router().list_all()
}

/// Maps the engine's semantic error categories (§7) onto the closest
/// `rmcp` error constructor; the RPC surface itself has no HTTP status
/// codes to preserve, so `Unauthorized` collapses to `invalid_request`
/// regardless of whether it was a 401 or 403 underneath.
fn map_error(err: remotedoc_core::Error) -> McpError {
    use remotedoc_core::Error;
    match err {
        Error::InvalidUrl(detail) => McpError::invalid_params(detail, None),
        Error::NotFound(detail) => McpError::invalid_params(format!("not found: {detail}"), None),
        Error::Unauthorized(reason) => McpError::invalid_request(reason.to_string(), None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

#[allow(clippy::manual_async_fn)]
impl ServerHandler for RemoteDocService {
    fn list_tools(&self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: self.tool_router.list_all(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(&self, request: CallToolRequestParam, context: RequestContext<RoleServer>) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let tool_context = rmcp::handler::server::tool::ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}

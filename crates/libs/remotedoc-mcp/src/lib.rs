//! The two-tool RPC surface (`list_doc`, `read_doc`) over `rmcp`, plus the
//! bearer-auth layer and GitHub webhook handler used by the HTTP transport.

pub mod auth;
pub mod server;
pub mod tools;
pub mod webhook;

pub use auth::{bearer_auth_middleware, current_key_digest};
pub use server::{build_auth, build_engine, run_http, run_stdio};
pub use tools::{RemoteDocService, tool_catalog};
pub use webhook::github_webhook_handler;

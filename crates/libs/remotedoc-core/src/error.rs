//! Error types for the repository cache and access engine.
//!
//! Variant names follow the semantic categories of the error-handling
//! design rather than the originating type, so callers at the RPC/HTTP
//! boundary can match on category without caring which crate raised it.

use thiserror::Error;

/// The error type for remotedoc-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A `remotedoc://` URL failed to parse or normalize.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The requested document or repository does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's API key could not see the requested repository.
    #[error("unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),

    /// A clone/fetch/checkout/reset attempt failed.
    #[error("sync failed for {repo}: {detail}")]
    SyncFailed { repo: String, detail: String },

    /// A generic cache-layer failure (filesystem, lock, or bookkeeping error).
    #[error("cache error: {0}")]
    CacheError(String),

    /// Configuration failed to load or validate. Fatal at startup.
    #[error(transparent)]
    Config(#[from] remotedoc_common::config::ConfigError),

    #[error(transparent)]
    Git2(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// Distinguishes the two ways a read can be rejected, per the RPC surface's
/// 401-vs-403 contract: missing credential is a 401, an unknown or unbound
/// key is a 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    MissingCredential,
    Forbidden,
}

impl std::fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing credential"),
            Self::Forbidden => write!(f, "key is not bound to this repository"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

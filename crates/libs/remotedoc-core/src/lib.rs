//! The repository cache and access engine: the concurrent multi-repository
//! synchronizer, the API-key binding model, and the Markdown link rewriter
//! that makes a document's relative references navigable through the same
//! RPC surface it was read from.

pub mod auth;
pub mod cache;
pub mod error;
pub mod link_rewriter;
pub mod model;
pub mod path;
pub mod rwlock;
pub mod syncer;

pub use auth::{AllowAllBinding, AuthBinding, MultiKeyBinding, StaticKeyBinding, digest_api_key};
pub use cache::{CacheEngine, CacheEngineConfig, RepositoryListing};
pub use error::{Error, Result, UnauthorizedReason};
pub use link_rewriter::LinkRewriter;
pub use model::{RepositoryConfig, RepositoryEntry, RepositoryIdentity};
pub use path::{PathResolver, RemoteDocUrl};
pub use rwlock::RwLock;
pub use syncer::RemoteSource;

//! Data model: repository identity and the per-repository runtime record.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock as FieldLock;

use crate::rwlock::RwLock;

/// The triple that globally and uniquely identifies a tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentity {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepositoryIdentity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.repo, self.branch)
    }
}

/// Mutable, admin-settable fields of a tracked repository, separate from
/// its identity so `update` can change owner/repo/branch themselves.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub root_spec_path: String,
    pub credential: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root_spec_path: "spec.md".to_string(),
            credential: None,
        }
    }
}

/// A cancellable handle for a repository's next scheduled sync.
///
/// Wraps a `tokio::task::JoinHandle` the way a re-architected version of
/// this engine should: a concrete, owned handle replaced atomically on
/// reschedule rather than a thread primitive reached for by side channel.
#[derive(Debug)]
pub struct SyncTimerHandle(tokio::task::JoinHandle<()>);

impl SyncTimerHandle {
    pub fn new(handle: tokio::task::JoinHandle<()>) -> Self {
        Self(handle)
    }

    pub fn cancel(&self) {
        self.0.abort();
    }
}

impl Drop for SyncTimerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Full runtime state the engine keeps for one tracked repository.
pub struct RepositoryEntry {
    pub identity: RepositoryIdentity,
    pub config: FieldLock<RepositoryConfig>,
    pub working_dir: PathBuf,
    pub lock: Arc<RwLock>,
    /// Optimization only: short-circuits a redundant sync request. The
    /// `RwLock`'s write side is the actual safety mechanism (see §4.4).
    syncing: AtomicBool,
    pub sync_timer: FieldLock<Option<SyncTimerHandle>>,
    pub description: FieldLock<String>,
}

impl RepositoryEntry {
    pub fn new(identity: RepositoryIdentity, config: RepositoryConfig, cache_root: &std::path::Path) -> Self {
        let working_dir = cache_root
            .join(&identity.owner)
            .join(&identity.repo)
            .join(&identity.branch);
        Self {
            identity,
            config: FieldLock::new(config),
            working_dir,
            lock: Arc::new(RwLock::new()),
            syncing: AtomicBool::new(false),
            sync_timer: FieldLock::new(None),
            description: FieldLock::new(String::new()),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn set_syncing(&self, value: bool) {
        self.syncing.store(value, Ordering::Release);
    }

    pub fn has_working_tree(&self) -> bool {
        self.working_dir.join(".git").exists()
    }
}

//! The top-level orchestrator: owns every tracked repository's runtime
//! state, mediates reads through `AuthBinding`, and drives both the
//! periodic and on-demand sync paths.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{RwLock, Semaphore};

use crate::auth::AuthBinding;
use crate::error::{Error, Result, UnauthorizedReason};
use crate::link_rewriter::LinkRewriter;
use crate::model::{RepositoryConfig, RepositoryEntry, RepositoryIdentity, SyncTimerHandle};
use crate::syncer::{self, RemoteSource};

/// Tunables that do not belong to any single repository.
#[derive(Debug, Clone)]
pub struct CacheEngineConfig {
    pub cache_root: PathBuf,
    /// `None` disables periodic sync (e.g. webhook-driven mode).
    pub sync_interval: Option<Duration>,
    pub max_workers: usize,
    pub sync_timeout: Duration,
}

impl Default for CacheEngineConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".github_cache"),
            sync_interval: Some(Duration::from_secs(600)),
            max_workers: 5,
            sync_timeout: Duration::from_secs(30),
        }
    }
}

/// One row of `list_doc()`'s response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RepositoryListing {
    pub repo_name: String,
    pub description: String,
    pub spec_url: String,
}

/// Owns the set of tracked repositories, their on-disk trees, per-repo
/// locks and sync timers, and the bounded worker pool used for the
/// initial parallel sync.
pub struct CacheEngine {
    config: CacheEngineConfig,
    entries: RwLock<Vec<Arc<RepositoryEntry>>>,
    http_client: reqwest::Client,
}

impl CacheEngine {
    pub fn new(config: CacheEngineConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(Vec::new()),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn cache_root(&self) -> &std::path::Path {
        &self.config.cache_root
    }

    /// Snapshot of every tracked identity, for seeding `AllowAllBinding`
    /// and for tests.
    pub async fn identities(&self) -> Vec<RepositoryIdentity> {
        self.entries.read().await.iter().map(|e| e.identity.clone()).collect()
    }

    /// Seeds a tracked repository from static configuration without
    /// syncing it immediately, so a batch of statically configured
    /// repositories can all go through `sync_all_initial`'s bounded
    /// parallel worker pool at startup instead of syncing one at a time
    /// the way an admin-triggered `add` does.
    pub async fn register_unsynced(&self, identity: RepositoryIdentity, config: RepositoryConfig) {
        let entry = Arc::new(RepositoryEntry::new(identity, config, &self.config.cache_root));
        self.entries.write().await.push(entry);
    }

    /// `add(owner, repo, branch, root_spec_path, credential?)` (§4.5). If
    /// the triple already exists, degrades to `update`.
    pub async fn add(&self, owner: &str, repo: &str, branch: &str, root_spec_path: &str, credential: Option<String>) -> Result<()> {
        let identity = RepositoryIdentity::new(owner, repo, branch);
        if self.find(&identity).await.is_some() {
            return self.update(&identity, None, None, None, Some(root_spec_path.to_string()), credential).await;
        }

        let config = RepositoryConfig {
            root_spec_path: root_spec_path.to_string(),
            credential,
        };
        let entry = Arc::new(RepositoryEntry::new(identity.clone(), config, &self.config.cache_root));

        self.sync_entry(&entry).await?;
        self.schedule_timer(entry.clone()).await;

        self.entries.write().await.push(entry);
        Ok(())
    }

    /// `update(owner, repo, branch, new_*?)` (§4.5). Falls through to
    /// `add` with the resolved new values when the old triple is not
    /// tracked.
    pub async fn update(
        &self,
        old_identity: &RepositoryIdentity,
        new_owner: Option<String>,
        new_repo: Option<String>,
        new_branch: Option<String>,
        new_root_spec_path: Option<String>,
        new_credential: Option<String>,
    ) -> Result<()> {
        let Some(entry) = self.find(old_identity).await else {
            let owner = new_owner.unwrap_or_else(|| old_identity.owner.clone());
            let repo = new_repo.unwrap_or_else(|| old_identity.repo.clone());
            let branch = new_branch.unwrap_or_else(|| old_identity.branch.clone());
            let root_spec_path = new_root_spec_path.unwrap_or_else(|| "spec.md".to_string());
            return self.add(&owner, &repo, &branch, &root_spec_path, new_credential).await;
        };

        cancel_timer(&entry).await;

        {
            let mut config = entry.config.write().await;
            if let Some(root_spec_path) = new_root_spec_path {
                config.root_spec_path = root_spec_path;
            }
            if new_credential.is_some() {
                config.credential = new_credential;
            }
        }

        self.sync_entry(&entry).await?;
        self.schedule_timer(entry).await;
        Ok(())
    }

    /// `remove(owner, repo, branch)` (§4.5). Deletes the working tree,
    /// then `rmdir`s the `repo` and `owner` parent directories (ignoring
    /// errors, which indicate other tracked branches still live there).
    pub async fn remove(&self, identity: &RepositoryIdentity) -> Result<()> {
        let mut entries = self.entries.write().await;
        let Some(pos) = entries.iter().position(|e| &e.identity == identity) else {
            return Ok(());
        };
        let entry = entries.remove(pos);
        drop(entries);

        cancel_timer(&entry).await;
        let _guard = entry.lock.write().await;

        std::fs::remove_dir_all(&entry.working_dir).or_else(|e| if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) })?;
        if let Some(repo_dir) = entry.working_dir.parent() {
            let _ = std::fs::remove_dir(repo_dir);
            if let Some(owner_dir) = repo_dir.parent() {
                let _ = std::fs::remove_dir(owner_dir);
            }
        }
        Ok(())
    }

    /// `read(path, api_key)` (§4.5), decomposed into its already-parsed
    /// segments by the caller. Per §9, the repository is resolved by
    /// `repo` name alone — `owner` is ignored and the branch actually
    /// served is whichever branch the cache tracks, even if it differs
    /// from the URL's. This is a documented, deliberately-unfixed
    /// ambiguity, not an oversight.
    pub async fn read(&self, _owner: &str, repo: &str, _branch: &str, rest: &str, key_digest: &str, auth: &dyn AuthBinding) -> Result<String> {
        let entry = self
            .find_by_repo_name(repo)
            .await
            .ok_or_else(|| Error::NotFound(format!("no tracked repository named {repo}")))?;

        if !auth.can_access(key_digest, &entry.identity).await {
            return Err(Error::Unauthorized(UnauthorizedReason::Forbidden));
        }

        if !entry.has_working_tree() {
            // §4.5: a `read` that has to trigger its own sync surfaces a
            // failure as `CacheError`, not `SyncFailed` — that category is
            // reserved for the caller of an explicit `add`/`update`.
            self.sync_entry(&entry).await.map_err(|e| Error::CacheError(e.to_string()))?;
        }

        let content = {
            let _guard = entry.lock.read().await;
            let file_path = entry.working_dir.join(rest);
            if !file_path.is_file() {
                return Err(Error::NotFound(format!("{repo}/{rest}")));
            }
            match std::fs::read(&file_path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(repo, rest, "document is not valid utf-8, re-reading with replacement");
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                },
                Err(e) => return Err(Error::CacheError(e.to_string())),
            }
        };

        Ok(LinkRewriter::rewrite(&entry.identity.owner, &entry.identity.repo, &entry.identity.branch, rest, &content))
    }

    /// `list(api_key)` (§4.5): every repository visible to `key_digest`.
    pub async fn list(&self, key_digest: &str, auth: &dyn AuthBinding) -> Result<Vec<RepositoryListing>> {
        let Some(accessible) = auth.accessible_repositories(key_digest).await else {
            return Err(Error::Unauthorized(UnauthorizedReason::Forbidden));
        };

        let entries = self.entries.read().await;
        let mut out = Vec::new();
        for entry in entries.iter() {
            if !accessible.contains(&entry.identity) {
                continue;
            }
            let config = entry.config.read().await;
            let description = entry.description.read().await.clone();
            out.push(RepositoryListing {
                repo_name: entry.identity.repo.clone(),
                description,
                spec_url: format!("remotedoc://{}/{}/{}/{}", entry.identity.owner, entry.identity.repo, entry.identity.branch, config.root_spec_path),
            });
        }
        Ok(out)
    }

    /// Syncs up to `max_workers` repositories in parallel at startup.
    /// Individual failures are logged and do not abort the others.
    pub async fn sync_all_initial(&self) {
        let entries = self.entries.read().await.clone();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut handles = Vec::new();

        for entry in entries {
            let semaphore = semaphore.clone();
            let client = self.http_client.clone();
            let timeout = self.config.sync_timeout;
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if let Err(e) = sync_entry_inner(&entry, &client, timeout).await {
                    tracing::error!(repo = %entry.identity, error = %e, "initial sync failed");
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let entries = self.entries.read().await.clone();
        for entry in entries {
            self.schedule_timer(entry).await;
        }
    }

    /// Triggered by the webhook listener (§4.7) on a `push` event: syncs the
    /// tracked repository matching the pushed identity exactly. Unlike
    /// `read`, this matches the full `(owner, repo, branch)` triple, since
    /// the webhook payload names all three unambiguously. A push for an
    /// untracked repository is silently ignored; the webhook always
    /// acknowledges 200 regardless (§4.7).
    pub async fn sync_webhook(&self, identity: &RepositoryIdentity) -> Result<()> {
        let Some(entry) = self.find(identity).await else {
            tracing::debug!(repo = %identity, "webhook push for untracked repository, ignoring");
            return Ok(());
        };
        self.sync_entry(&entry).await
    }

    async fn find(&self, identity: &RepositoryIdentity) -> Option<Arc<RepositoryEntry>> {
        self.entries.read().await.iter().find(|e| &e.identity == identity).cloned()
    }

    async fn find_by_repo_name(&self, repo: &str) -> Option<Arc<RepositoryEntry>> {
        self.entries.read().await.iter().find(|e| e.identity.repo == repo).cloned()
    }

    /// Runs `RepoSyncer` under the entry's write lock, then refreshes its
    /// cached description. The `sync_state` flag (§4.4) is set only as a
    /// short-circuiting optimization; the write lock is what actually
    /// keeps readers out while the tree is inconsistent.
    async fn sync_entry(&self, entry: &Arc<RepositoryEntry>) -> Result<()> {
        sync_entry_inner(entry, &self.http_client, self.config.sync_timeout).await
    }

    async fn schedule_timer(&self, entry: Arc<RepositoryEntry>) {
        let Some(base_interval) = self.config.sync_interval else {
            return;
        };
        let client = self.http_client.clone();
        let timeout = self.config.sync_timeout;
        let timer_entry = entry.clone();

        let handle = tokio::spawn(async move {
            loop {
                let delay = jittered_delay(base_interval);
                tokio::time::sleep(delay).await;

                let Some(permit) = timer_entry.lock.try_write().await else {
                    tracing::debug!(repo = %timer_entry.identity, "skipping periodic sync, already busy");
                    continue;
                };
                drop(permit);

                if let Err(e) = sync_entry_inner(&timer_entry, &client, timeout).await {
                    tracing::error!(repo = %timer_entry.identity, error = %e, "periodic sync failed");
                }
            }
        });

        let mut slot = entry.sync_timer.write().await;
        *slot = Some(SyncTimerHandle::new(handle));
    }
}

async fn sync_entry_inner(entry: &Arc<RepositoryEntry>, client: &reqwest::Client, timeout: Duration) -> Result<()> {
    entry.set_syncing(true);
    let (owner, repo, credential) = {
        let config = entry.config.read().await;
        (entry.identity.owner.clone(), entry.identity.repo.clone(), config.credential.clone())
    };

    let _guard = entry.lock.write().await;
    let source = RemoteSource::github(&owner, &repo, credential.clone());
    let result = syncer::sync_repository(&entry.identity, entry.working_dir.clone(), source, timeout).await;
    entry.set_syncing(false);
    result?;

    let description = syncer::fetch_description(client, &owner, &repo, credential.as_deref()).await;
    *entry.description.write().await = description;
    Ok(())
}

/// Uniform ±30% jitter applied independently to each repository's next
/// scheduled sync (§4.5), so tracked repositories don't all hit an
/// upstream rate-limit window at the same instant.
fn jittered_delay(base: Duration) -> Duration {
    let mut rng = rand::rng();
    let factor = 1.0 + rng.random_range(-0.3..0.3);
    Duration::from_secs_f64((base.as_secs_f64() * factor).max(0.0))
}

async fn cancel_timer(entry: &Arc<RepositoryEntry>) {
    let mut slot = entry.sync_timer.write().await;
    if let Some(handle) = slot.take() {
        handle.cancel();
    }
}

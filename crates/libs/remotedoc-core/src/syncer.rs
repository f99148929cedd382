//! Clones and refreshes a repository's working tree on disk.
//!
//! `git2` is blocking, so every operation here runs inside
//! `spawn_blocking` and the public functions are `async fn` that the
//! engine can simply `.await`. Per-stage timeouts are enforced by checking
//! elapsed wall-clock time between the discrete git2 calls rather than by
//! interrupting a call mid-flight (libgit2 offers no cooperative
//! cancellation), which is a close enough approximation of the
//! per-subprocess timeouts a shell-`git`-based implementation gets for
//! free.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use git2::{FetchOptions, RemoteCallbacks, Repository};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::RepositoryIdentity;

/// Where to fetch a tracked repository from and how to authenticate.
///
/// `public_url` is always set; `authenticated_url` is present only when an
/// upstream credential is configured, and is tried first with a single
/// fallback to `public_url` on failure (§4.4).
#[derive(Debug, Clone)]
pub struct RemoteSource {
    pub authenticated_url: Option<String>,
    pub public_url: String,
    pub credential: Option<String>,
}

impl RemoteSource {
    /// The standard `https://<token>@github.com/<owner>/<repo>.git` source,
    /// falling back to the public clone URL when `credential` is `None` or
    /// the authenticated attempt fails.
    pub fn github(owner: &str, repo: &str, credential: Option<String>) -> Self {
        let public_url = format!("https://github.com/{owner}/{repo}.git");
        let authenticated_url = credential.as_ref().map(|token| format!("https://{token}@github.com/{owner}/{repo}.git"));
        Self {
            authenticated_url,
            public_url,
            credential,
        }
    }

    /// A source with no authenticated alternative, used by tests to point
    /// at a local bare repository instead of a real `github.com` clone.
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            authenticated_url: None,
            public_url: url.into(),
            credential: None,
        }
    }
}

/// Clones or refreshes `identity`'s working tree at `working_dir`.
///
/// A missing working tree is treated as a first sync: a fresh shallow,
/// single-branch clone of `identity.branch`. An existing one is fetched
/// and hard-reset to the remote branch tip, discarding any local drift
/// (there should be none, since nothing but this syncer ever writes to
/// the tree). `timeout` is the base unit from which clone/fetch (`2 ×
/// timeout`) and checkout/reset (`timeout`) deadlines are derived.
pub async fn sync_repository(identity: &RepositoryIdentity, working_dir: PathBuf, source: RemoteSource, timeout: Duration) -> Result<()> {
    let identity = identity.clone();
    tokio::task::spawn_blocking(move || sync_blocking(&identity, &working_dir, &source, timeout))
        .await
        .map_err(|e| Error::SyncFailed {
            repo: String::new(),
            detail: format!("sync task panicked: {e}"),
        })?
}

fn sync_blocking(identity: &RepositoryIdentity, working_dir: &Path, source: &RemoteSource, timeout: Duration) -> Result<()> {
    let result = if working_dir.join(".git").exists() {
        refresh_existing(identity, working_dir, source, timeout)
    } else {
        clone_fresh(identity, working_dir, source, timeout)
    };
    result.map_err(|e| Error::SyncFailed {
        repo: identity.to_string(),
        detail: e.to_string(),
    })
}

/// Clone path: try the authenticated URL first (if any); on failure, retry
/// exactly once with the public URL. A failure of the public attempt (or
/// the only attempt, when there is no credential) is fatal. Per §4.4, a
/// failing initial clone "leaves no directory" — so any directory created
/// to hold a partial attempt is removed again before returning an error.
fn clone_fresh(identity: &RepositoryIdentity, working_dir: &Path, source: &RemoteSource, timeout: Duration) -> std::result::Result<(), git2::Error> {
    std::fs::create_dir_all(working_dir).map_err(|e| git2::Error::from_str(&e.to_string()))?;
    let clone_timeout = timeout * 2;

    let result = match &source.authenticated_url {
        Some(auth_url) => match clone_once(identity, working_dir, auth_url, source, clone_timeout) {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!(repo = %identity, "authenticated clone failed, retrying with public url");
                clear_partial_clone(working_dir);
                clone_once(identity, working_dir, &source.public_url, source, clone_timeout)
            }
        },
        None => clone_once(identity, working_dir, &source.public_url, source, clone_timeout),
    };

    if result.is_err() {
        let _ = std::fs::remove_dir_all(working_dir);
    }
    result
}

fn clear_partial_clone(working_dir: &Path) {
    let _ = std::fs::remove_dir_all(working_dir);
    let _ = std::fs::create_dir_all(working_dir);
}

fn clone_once(identity: &RepositoryIdentity, working_dir: &Path, url: &str, source: &RemoteSource, deadline: Duration) -> std::result::Result<(), git2::Error> {
    let started = Instant::now();
    let mut fetch_options = FetchOptions::new();
    fetch_options.depth(1);
    fetch_options.remote_callbacks(build_callbacks(source, started, deadline));

    git2::build::RepoBuilder::new()
        .fetch_options(fetch_options)
        .branch(&identity.branch)
        .clone(url, working_dir)
}

fn refresh_existing(identity: &RepositoryIdentity, working_dir: &Path, source: &RemoteSource, timeout: Duration) -> std::result::Result<(), git2::Error> {
    let started = Instant::now();
    let repo = Repository::open(working_dir)?;
    let fetch_url = source.authenticated_url.as_deref().unwrap_or(&source.public_url);

    {
        let mut remote = repo.find_remote("origin").or_else(|_| repo.remote("origin", fetch_url))?;
        remote.set_url("origin", fetch_url)?;
        let mut fetch_options = FetchOptions::new();
        fetch_options.depth(1);
        fetch_options.remote_callbacks(build_callbacks(source, started, timeout * 2));
        remote.fetch(&[identity.branch.as_str()], Some(&mut fetch_options), None)?;
    }

    if started.elapsed() > timeout * 2 + timeout {
        return Err(git2::Error::from_str("checkout/reset deadline exceeded"));
    }

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let target_commit = repo.find_commit(fetch_commit.id())?;

    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(target_commit.as_object(), Some(&mut checkout))?;
    repo.set_head_detached(target_commit.id())?;
    repo.reset(target_commit.as_object(), git2::ResetType::Hard, None)?;
    Ok(())
}

fn build_callbacks(source: &RemoteSource, started: Instant, deadline: Duration) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = source.credential.clone() {
        callbacks.credentials(move |_url, username_from_url, _allowed| git2::Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), &token));
    }
    callbacks.transfer_progress(move |_stats| started.elapsed() <= deadline);
    callbacks
}

#[derive(Debug, Deserialize)]
struct GitHubRepoInfo {
    #[serde(default)]
    description: Option<String>,
}

/// Fetches the upstream repository's short description over HTTPS. A
/// `200` stores the description; `404`/`403`/any other status, and any
/// network error, store an empty string. This never fails the sync it
/// accompanies (§4.4).
pub async fn fetch_description(client: &reqwest::Client, owner: &str, repo: &str, credential: Option<&str>) -> String {
    let url = format!("https://api.github.com/repos/{owner}/{repo}");
    let mut request = client.get(&url).header("User-Agent", "remotedoc-gateway");
    if let Some(token) = credential {
        request = request.bearer_auth(token);
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => response
            .json::<GitHubRepoInfo>()
            .await
            .ok()
            .and_then(|info| info.description)
            .unwrap_or_default(),
        Ok(response) => {
            tracing::debug!(owner, repo, status = %response.status(), "description fetch returned non-success status");
            String::new()
        }
        Err(e) => {
            tracing::debug!(owner, repo, error = %e, "description fetch failed");
            String::new()
        }
    }
}

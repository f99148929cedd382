//! A local git repository standing in for "upstream" so end-to-end tests
//! never touch the network, following the pattern the core engine's own
//! unit tests use (`RemoteSource::direct`) but packaged for reuse across
//! the e2e suite's multi-step scenarios.

use std::path::{Path, PathBuf};

use git2::{Repository, Signature};

/// A throwaway git working tree that acts as the remote origin for a
/// `CacheEngine` under test.
pub struct OriginRepo {
    dir: tempfile::TempDir,
    repo: Repository,
}

impl OriginRepo {
    /// Initializes a fresh repository on `branch` with one commit
    /// containing `files`.
    pub fn init(branch: &str, files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("create scratch dir for origin repo");
        let repo = Repository::init(dir.path()).expect("init origin repo");

        for (path, content) in files {
            write_file(dir.path(), path, content);
        }
        commit_all(&repo, "initial commit");

        if branch != "master" && branch != "main" {
            let head_commit = repo.head().unwrap().peel_to_commit().unwrap();
            repo.branch(branch, &head_commit, false).unwrap();
            repo.set_head(&format!("refs/heads/{branch}")).unwrap();
        }

        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Simulates an upstream push: writes or overwrites `path` with
    /// `content` and commits it, so a subsequent `CacheEngine` sync has
    /// something new to fetch.
    pub fn push_commit(&self, path: &str, content: &str) {
        write_file(self.dir.path(), path, content);
        commit_all(&self.repo, &format!("update {path}"));
    }

    pub fn delete_and_commit(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).expect("remove file for deletion commit");
        let mut index = self.repo.index().unwrap();
        index.remove_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("e2e-fixture", "e2e-fixture@example.com").unwrap();
        let parent = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.commit(Some("HEAD"), &sig, &sig, &format!("remove {path}"), &tree, &[&parent]).unwrap();
    }
}

fn write_file(root: &Path, relative: &str, content: &str) {
    let full = root.join(relative);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("create parent dirs for fixture file");
    }
    std::fs::write(full, content).expect("write fixture file");
}

fn commit_all(repo: &Repository, message: &str) {
    let sig = Signature::now("e2e-fixture", "e2e-fixture@example.com").unwrap();
    let mut index = repo.index().unwrap();
    index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parents: Vec<_> = match repo.head().ok().and_then(|h| h.peel_to_commit().ok()) {
        Some(parent) => vec![parent],
        None => vec![],
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs).unwrap();
}

/// A fresh, empty cache root under a scratch directory, returned alongside
/// the `TempDir` that owns it so callers can keep the directory alive for
/// the duration of the test.
pub fn scratch_cache_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create scratch cache root");
    let path = dir.path().to_path_buf();
    (dir, path)
}

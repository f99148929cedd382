//! API-key digesting and the binding lookup the engine uses to decide
//! whether a caller's key may see a given repository.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::model::RepositoryIdentity;

/// SHA-256 hex digest of an API key, the only form of the key the engine
/// ever stores or compares against; the plaintext key is never retained
/// past the request that presented it.
pub fn digest_api_key(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Looks up which repositories a presented API key is bound to.
///
/// Implemented by the surrounding admin/database layer, which is out of
/// scope here; the engine only calls through this trait at the moment a
/// read or list request needs to be authorized.
#[async_trait::async_trait]
pub trait AuthBinding: Send + Sync {
    /// Returns the set of repositories `key_digest` is bound to, or `None`
    /// if the digest is not a known API key at all (missing vs. unbound
    /// are distinguished so the caller can tell a 401 from a 403).
    async fn repositories_for_key(&self, key_digest: &str) -> Option<Vec<RepositoryIdentity>>;

    /// `accessible_repositories(api_key) -> [repository_identity]` (§4.6):
    /// every repository identity in the key's binding set. Fails with
    /// `None` if the key is unknown.
    async fn accessible_repositories(&self, key_digest: &str) -> Option<Vec<RepositoryIdentity>> {
        self.repositories_for_key(key_digest).await
    }

    /// `can_access(api_key, owner, repo, branch) -> bool` (§4.6): a
    /// predicate that returns `false` for any reason — unknown key, no
    /// binding, no such repository — never distinguishing the cause.
    async fn can_access(&self, key_digest: &str, identity: &RepositoryIdentity) -> bool {
        self.repositories_for_key(key_digest)
            .await
            .is_some_and(|repos| repos.contains(identity))
    }
}

/// An `AuthBinding` that authorizes every presented key for every tracked
/// repository. Used by the stdio transport, which runs as a single local
/// user with one statically configured key and no concept of per-key
/// scoping; it is seeded with the engine's tracked identities so
/// `list_doc` still has something to enumerate.
pub struct AllowAllBinding {
    identities: Vec<RepositoryIdentity>,
}

impl AllowAllBinding {
    pub fn new(identities: Vec<RepositoryIdentity>) -> Self {
        Self { identities }
    }
}

#[async_trait::async_trait]
impl AuthBinding for AllowAllBinding {
    async fn repositories_for_key(&self, _key_digest: &str) -> Option<Vec<RepositoryIdentity>> {
        Some(self.identities.clone())
    }

    async fn can_access(&self, _key_digest: &str, _identity: &RepositoryIdentity) -> bool {
        true
    }
}

/// A minimal `AuthBinding` backed by one statically configured API key,
/// granting that key access to every repository passed at construction.
///
/// Stands in for the admin CRUD + database binding store that §1 scopes
/// out of this engine, so the HTTP and stdio services remain runnable from
/// nothing but a config file, without requiring that external collaborator
/// to exist.
pub struct StaticKeyBinding {
    key_digest: String,
    identities: Vec<RepositoryIdentity>,
}

impl StaticKeyBinding {
    pub fn new(key_digest: String, identities: Vec<RepositoryIdentity>) -> Self {
        Self { key_digest, identities }
    }
}

#[async_trait::async_trait]
impl AuthBinding for StaticKeyBinding {
    async fn repositories_for_key(&self, key_digest: &str) -> Option<Vec<RepositoryIdentity>> {
        if key_digest == self.key_digest {
            Some(self.identities.clone())
        } else {
            None
        }
    }
}

/// A minimal `AuthBinding` backed by a fixed table of key digests, each
/// granted access to its own set of repositories.
///
/// Stands in for the admin CRUD + database binding store (§1) the same
/// way [`StaticKeyBinding`] does for a single key, generalized to a
/// config-file-driven deployment that names several operator keys up
/// front instead of one.
pub struct MultiKeyBinding {
    bindings: HashMap<String, Vec<RepositoryIdentity>>,
}

impl MultiKeyBinding {
    pub fn new(bindings: HashMap<String, Vec<RepositoryIdentity>>) -> Self {
        Self { bindings }
    }

    /// Grants every key in `plaintext_keys` access to every identity in
    /// `identities`.
    pub fn grant_all(plaintext_keys: &[String], identities: Vec<RepositoryIdentity>) -> Self {
        let bindings = plaintext_keys.iter().map(|key| (digest_api_key(key), identities.clone())).collect();
        Self { bindings }
    }
}

#[async_trait::async_trait]
impl AuthBinding for MultiKeyBinding {
    async fn repositories_for_key(&self, key_digest: &str) -> Option<Vec<RepositoryIdentity>> {
        self.bindings.get(key_digest).cloned()
    }
}

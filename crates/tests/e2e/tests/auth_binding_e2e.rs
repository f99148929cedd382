//! Exercises `AuthBinding` wired into a real `CacheEngine` (§4.6, I2):
//! `read` and `list` both consult the binding set, and a key unknown to
//! the binding is rejected the same way an unbound key is.

use std::time::Duration;

use remotedoc_core::{CacheEngine, CacheEngineConfig, Error, MultiKeyBinding, RemoteSource, RepositoryConfig, RepositoryIdentity, StaticKeyBinding, digest_api_key};
use remotedoc_e2e::OriginRepo;

fn engine_config(cache_root: std::path::PathBuf) -> CacheEngineConfig {
    CacheEngineConfig {
        cache_root,
        sync_interval: None,
        max_workers: 2,
        sync_timeout: Duration::from_secs(10),
    }
}

async fn seed_synced_repo(engine: &CacheEngine, identity: &RepositoryIdentity, origin: &OriginRepo) {
    let working_dir = engine.cache_root().join(&identity.owner).join(&identity.repo).join(&identity.branch);
    let source = RemoteSource::direct(origin.path().to_string_lossy().to_string());
    remotedoc_core::syncer::sync_repository(identity, working_dir, source, Duration::from_secs(10))
        .await
        .expect("seed sync against local origin should succeed");
    engine.register_unsynced(identity.clone(), RepositoryConfig::default()).await;
}

#[tokio::test]
async fn bound_key_reads_successfully_and_unbound_key_is_rejected() {
    let cache_root = tempfile::tempdir().unwrap();
    let engine = CacheEngine::new(engine_config(cache_root.path().to_path_buf()));
    let origin = OriginRepo::init("main", &[("spec.md", "# hi\n")]);
    let identity = RepositoryIdentity::new("acme", "widgets", "main");
    seed_synced_repo(&engine, &identity, &origin).await;

    let binding = StaticKeyBinding::new(digest_api_key("correct-key"), vec![identity.clone()]);

    let ok = engine.read("acme", "widgets", "main", "spec.md", &digest_api_key("correct-key"), &binding).await;
    assert_eq!(ok.unwrap(), "# hi\n");

    let rejected = engine.read("acme", "widgets", "main", "spec.md", &digest_api_key("wrong-key"), &binding).await;
    assert!(matches!(rejected, Err(Error::Unauthorized(_))));
}

#[tokio::test]
async fn list_only_returns_repositories_bound_to_the_presented_key() {
    let cache_root = tempfile::tempdir().unwrap();
    let engine = CacheEngine::new(engine_config(cache_root.path().to_path_buf()));

    let origin_a = OriginRepo::init("main", &[("spec.md", "# a\n")]);
    let identity_a = RepositoryIdentity::new("acme", "alpha", "main");
    seed_synced_repo(&engine, &identity_a, &origin_a).await;

    let origin_b = OriginRepo::init("main", &[("spec.md", "# b\n")]);
    let identity_b = RepositoryIdentity::new("acme", "beta", "main");
    seed_synced_repo(&engine, &identity_b, &origin_b).await;

    let mut bindings = std::collections::HashMap::new();
    bindings.insert(digest_api_key("alpha-only-key"), vec![identity_a.clone()]);
    let binding = MultiKeyBinding::new(bindings);

    let listing = engine.list(&digest_api_key("alpha-only-key"), &binding).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].repo_name, "alpha");

    let rejected = engine.list(&digest_api_key("never-issued-key"), &binding).await;
    assert!(matches!(rejected, Err(Error::Unauthorized(_))));
}

#[tokio::test]
async fn can_access_returns_false_for_every_unauthorized_reason_without_distinguishing_cause() {
    let identity = RepositoryIdentity::new("acme", "widgets", "main");
    let other = RepositoryIdentity::new("acme", "other", "main");
    let binding = StaticKeyBinding::new(digest_api_key("key"), vec![identity.clone()]);

    use remotedoc_core::AuthBinding;
    assert!(binding.can_access(&digest_api_key("key"), &identity).await);
    assert!(!binding.can_access(&digest_api_key("key"), &other).await, "bound key but unbound repository");
    assert!(!binding.can_access(&digest_api_key("unknown-key"), &identity).await, "unknown key entirely");
}

//! Drives `CacheEngine::read` end-to-end against a multi-document
//! repository fixture to confirm the full pipeline — sync, read, then
//! `LinkRewriter` — rewrites cross-document references the same way a
//! client following them would expect (§4.2, scenario 2 of §8).

use std::time::Duration;

use remotedoc_core::{AllowAllBinding, CacheEngine, CacheEngineConfig, RemoteSource, RepositoryConfig, RepositoryIdentity};
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
async fn read_rewrites_relative_links_against_the_requested_documents_directory() {
    let cache_root = tempfile::tempdir().unwrap();
    let engine = CacheEngine::new(engine_config(cache_root.path().to_path_buf()));
    let origin = OriginRepo::init(
        "main",
        &[
            ("README.md", "See [guide](./docs/guide.md) and [home](/abs) and [x](http://y)\n"),
            ("docs/guide.md", "Back to [readme](../README.md). Also [api](api.md).\n"),
            ("docs/api.md", "# API\n"),
        ],
    );
    let identity = RepositoryIdentity::new("acme", "docs", "main");
    seed_synced_repo(&engine, &identity, &origin).await;
    let binding = AllowAllBinding::new(engine.identities().await);

    let readme = engine.read("acme", "docs", "main", "README.md", "k", &binding).await.unwrap();
    assert_eq!(
        readme,
        "See [guide](remotedoc://acme/docs/main/docs/guide.md) and [home](/abs) and [x](http://y)\n"
    );

    let guide = engine.read("acme", "docs", "main", "docs/guide.md", "k", &binding).await.unwrap();
    assert_eq!(
        guide,
        "Back to [readme](remotedoc://acme/docs/main/README.md). Also [api](remotedoc://acme/docs/main/docs/api.md).\n"
    );
}

#[tokio::test]
async fn read_preserves_anchors_and_absolute_urls_untouched() {
    let cache_root = tempfile::tempdir().unwrap();
    let engine = CacheEngine::new(engine_config(cache_root.path().to_path_buf()));
    let origin = OriginRepo::init("main", &[("spec.md", "[Top](#top \"Title\") and [rust](https://rust-lang.org)\n")]);
    let identity = RepositoryIdentity::new("acme", "widgets", "main");
    seed_synced_repo(&engine, &identity, &origin).await;
    let binding = AllowAllBinding::new(engine.identities().await);

    let content = engine.read("acme", "widgets", "main", "spec.md", "k", &binding).await.unwrap();
    assert_eq!(content, "[Top](#top \"Title\") and [rust](https://rust-lang.org)\n");
}

#[tokio::test]
async fn read_rewrites_reference_style_link_definitions_too() {
    let cache_root = tempfile::tempdir().unwrap();
    let engine = CacheEngine::new(engine_config(cache_root.path().to_path_buf()));
    let origin = OriginRepo::init(
        "main",
        &[("docs/guide.md", "See [setup][ref1] for details.\n\n[ref1]: setup.md \"Setup\"\n")],
    );
    let identity = RepositoryIdentity::new("acme", "widgets", "main");
    seed_synced_repo(&engine, &identity, &origin).await;
    let binding = AllowAllBinding::new(engine.identities().await);

    let content = engine.read("acme", "widgets", "main", "docs/guide.md", "k", &binding).await.unwrap();
    assert_eq!(
        content,
        "See [setup][ref1] for details.\n\n[ref1]: remotedoc://acme/widgets/main/docs/setup.md \"Setup\"\n"
    );
}

//! Engine tests


use crate::config::EngineConfig;
use crate::core::CacheEngine;
use coldstore_core::testing::MockRemote;
use coldstore_core::{Fields, RemoteSource, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub(super) struct Harness {
    pub engine: CacheEngine,
    pub remote: Arc<MockRemote>,
    pub base_dir: PathBuf,
    _temp_dir: TempDir,
}

pub(super) async fn harness(configure: impl FnOnce(EngineConfig) -> EngineConfig) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let base_dir = temp_dir.path().join("coldstore_cache");
    let config = configure(EngineConfig {
        base_dir: base_dir.clone(),
        ..EngineConfig::default()
    });
    let remote = Arc::new(MockRemote::new());
    let engine = CacheEngine::new(Arc::clone(&remote) as Arc<dyn RemoteSource>, config)
        .await
        .unwrap();
    Harness {
        engine,
        remote,
        base_dir,
        _temp_dir: temp_dir,
    }
}

pub(super) fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub(super) async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

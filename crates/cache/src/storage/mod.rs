//! File-backed persistent tier
//!
//! Layout under the base directory:
//! - document entries: `<base>/<sanitized key>.json`
//! - query entries: `<base>/collections/<sanitized key>.json`
//!
//! Over-long keys get a digest stem (see [`CacheKey::file_stem`]). Those stems
//! cannot be decoded, so the store remembers which key produced each one it
//! hands out; a digest file left by an earlier process is only mapped back to
//! its key once that key is used again.
//!
//! Writes go to a uniquely named temporary file beside the target and are
//! renamed into place, so readers never see a half-written entry. The store
//! does no size accounting of its own; every mutation is routed through the
//! [`EvictionController`](crate::eviction::EvictionController), which keeps
//! the usage ledger in step.

mod tests;

use crate::errors::{CacheError, Result};
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::constants::{COLLECTIONS_DIR_NAME, ENTRY_EXTENSION, HASHED_STEM_PREFIX};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use walkdir::WalkDir;

/// One persisted entry as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct PersistentStore {
    base_dir: PathBuf,
    hashed_stems: Arc<DashMap<String, CacheKey>>,
}

impl PersistentStore {
    /// Open the namespace rooted at `base_dir`, creating it if needed
    pub async fn open(base_dir: PathBuf) -> Result<Self> {
        let store = Self {
            base_dir,
            hashed_stems: Arc::new(DashMap::new()),
        };
        store.create_layout().await?;
        Ok(store)
    }

    async fn create_layout(&self) -> Result<()> {
        let collections_dir = self.collections_dir();
        fs::create_dir_all(&collections_dir)
            .await
            .map_err(|e| CacheError::io(collections_dir.clone(), "create cache directory", e))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn collections_dir(&self) -> PathBuf {
        self.base_dir.join(COLLECTIONS_DIR_NAME)
    }

    /// Deterministic file location for a key; documents and queries never share a path
    pub fn path_for(&self, key: &CacheKey, kind: EntityKind) -> PathBuf {
        let stem = key.file_stem();
        if stem.starts_with(HASHED_STEM_PREFIX) {
            self.hashed_stems
                .entry(stem.clone())
                .or_insert_with(|| key.clone());
        }
        let file_name = format!("{stem}.{ENTRY_EXTENSION}");
        match kind {
            EntityKind::Document => self.base_dir.join(file_name),
            EntityKind::Query => self.collections_dir().join(file_name),
        }
    }

    /// Inverse of [`PersistentStore::path_for`] for files inside this namespace
    pub fn entry_for_path(&self, path: &Path) -> Option<(EntityKind, CacheKey)> {
        if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let parent = path.parent()?;
        let kind = if parent == self.base_dir {
            EntityKind::Document
        } else if parent == self.collections_dir() {
            EntityKind::Query
        } else {
            return None;
        };
        let key = match self.hashed_stems.get(stem) {
            Some(key) => Some(key.value().clone()),
            None => CacheKey::from_sanitized(stem),
        };
        key.map(|key| (kind, key))
    }

    /// Write a whole entry; returns the number of bytes now on disk
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<u64> {
        let parent = path.parent().ok_or_else(|| {
            CacheError::configuration(format!("cache path has no parent: {}", path.display()))
        })?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, "create cache directory", e))?;

        let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(temp_path, "write cache entry", e));
        }
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::io(path, "rename cache entry", e));
        }

        Ok(bytes.len() as u64)
    }

    /// Read a whole entry, `None` if nothing is stored at `path`
    pub async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, "read cache entry", e)),
        }
    }

    /// Delete an entry; returns whether a file was removed
    pub async fn delete(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, "remove cache entry", e)),
        }
    }

    /// Size and modification time of one entry
    pub async fn stat(&self, path: &Path) -> Result<Option<StoredFile>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(StoredFile {
                path: path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, "stat cache entry", e)),
        }
    }

    /// Every persisted entry, in file-name order within each directory
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        let base_dir = self.base_dir.clone();
        tokio::task::spawn_blocking(move || walk_entries(&base_dir))
            .await
            .map_err(|e| {
                CacheError::io(
                    self.base_dir.clone(),
                    "list cache entries",
                    std::io::Error::new(ErrorKind::Other, e),
                )
            })?
    }

    /// Remove every entry and recreate the empty layout
    pub async fn clear_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.base_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::io(
                    self.base_dir.clone(),
                    "clear cache directory",
                    e,
                ))
            }
        }
        self.create_layout().await
    }
}

fn walk_entries(base_dir: &Path) -> Result<Vec<StoredFile>> {
    if !base_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| base_dir.to_path_buf());
            CacheError::io(path, "list cache entries", e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
            continue;
        }
        // Only the base directory and collections/ hold entries
        if entry.depth() == 2
            && entry.path().parent() != Some(base_dir.join(COLLECTIONS_DIR_NAME).as_path())
        {
            continue;
        }
        let meta = entry
            .metadata()
            .map_err(|e| CacheError::io(entry.path(), "stat cache entry", e.into()))?;
        files.push(StoredFile {
            path: entry.into_path(),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(files)
}

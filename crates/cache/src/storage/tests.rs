//! Tests for the persistent store

#[cfg(test)]
mod storage_tests {
    use crate::keys::{CacheKey, EntityKind};
    use crate::storage::PersistentStore;
    use crate::Result;
    use coldstore_core::{DocumentRef, Query};
    use tempfile::TempDir;

    async fn open_store() -> (PersistentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::open(temp_dir.path().join("coldstore_cache"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_read_delete() -> Result<()> {
        let (store, _dir) = open_store().await;
        let key = CacheKey::for_document(&DocumentRef::new("x/1").unwrap());
        let path = store.path_for(&key, EntityKind::Document);

        assert_eq!(store.read(&path).await?, None);
        assert_eq!(store.write(&path, b"{\"a\":1}").await?, 7);
        assert_eq!(store.read(&path).await?, Some(b"{\"a\":1}".to_vec()));

        assert!(store.delete(&path).await?);
        assert!(!store.delete(&path).await?);
        assert_eq!(store.read(&path).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_document_and_query_paths_never_collide() -> Result<()> {
        let (store, _dir) = open_store().await;
        let doc_key = CacheKey::for_document(&DocumentRef::new("a/b").unwrap());
        let query_key = CacheKey::for_query(&Query::collection("a/b").unwrap())?;

        let doc_path = store.path_for(&doc_key, EntityKind::Document);
        let query_path = store.path_for(&query_key, EntityKind::Query);
        assert_ne!(doc_path, query_path);
        assert_eq!(doc_path, store.base_dir().join("a_b.json"));
        assert!(query_path.starts_with(store.base_dir().join("collections")));

        // Even a document key spelled exactly like the query key stays apart
        let lookalike = store.path_for(&query_key, EntityKind::Document);
        assert_ne!(lookalike, query_path);
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_for_path_inverts_path_for() -> Result<()> {
        let (store, _dir) = open_store().await;
        let doc_key = CacheKey::for_document(&DocumentRef::new("users/a_b/posts/1").unwrap());
        let query_key = CacheKey::for_query(&Query::collection("users").unwrap().limit(3))?;

        let doc_path = store.path_for(&doc_key, EntityKind::Document);
        let query_path = store.path_for(&query_key, EntityKind::Query);
        assert_eq!(
            store.entry_for_path(&doc_path),
            Some((EntityKind::Document, doc_key))
        );
        assert_eq!(
            store.entry_for_path(&query_path),
            Some((EntityKind::Query, query_key))
        );
        assert_eq!(store.entry_for_path(&store.base_dir().join("notes.txt")), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_long_keys_get_bounded_file_names() -> Result<()> {
        let (store, _dir) = open_store().await;
        let long_id = "a".repeat(300);
        let key = CacheKey::for_document(&DocumentRef::new(format!("x/{long_id}")).unwrap());
        let path = store.path_for(&key, EntityKind::Document);

        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("%H"));
        assert!(file_name.len() < 255);
        assert_eq!(store.write(&path, b"{}").await?, 2);
        assert_eq!(store.read(&path).await?, Some(b"{}".to_vec()));
        assert_eq!(
            store.entry_for_path(&path),
            Some((EntityKind::Document, key.clone()))
        );

        // A store that never handed out this stem cannot decode it
        let reopened = PersistentStore::open(store.base_dir().to_path_buf()).await?;
        assert_eq!(reopened.entry_for_path(&path), None);
        assert_eq!(reopened.path_for(&key, EntityKind::Document), path);
        assert_eq!(
            reopened.entry_for_path(&path),
            Some((EntityKind::Document, key))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_list_reports_both_namespaces() -> Result<()> {
        let (store, _dir) = open_store().await;
        let doc_path = store.path_for(
            &CacheKey::for_document(&DocumentRef::new("x/1").unwrap()),
            EntityKind::Document,
        );
        let query_path = store.path_for(
            &CacheKey::for_query(&Query::collection("x").unwrap())?,
            EntityKind::Query,
        );
        store.write(&doc_path, b"{}").await?;
        store.write(&query_path, b"[1,2,3]").await?;
        // Stray files are not entries
        tokio::fs::write(store.base_dir().join("README"), b"hi")
            .await
            .unwrap();

        let files = store.list().await?;
        assert_eq!(files.len(), 2);
        let doc = files.iter().find(|f| f.path == doc_path).unwrap();
        let query = files.iter().find(|f| f.path == query_path).unwrap();
        assert_eq!(doc.size, 2);
        assert_eq!(query.size, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() -> Result<()> {
        let (store, _dir) = open_store().await;
        let path = store.path_for(
            &CacheKey::for_document(&DocumentRef::new("x/1").unwrap()),
            EntityKind::Document,
        );
        store.write(&path, b"{\"v\":1}").await?;
        store.write(&path, b"{\"v\":22}").await?;

        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(store.base_dir()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, vec!["collections".to_string(), "x_1.json".to_string()]);
        assert_eq!(store.stat(&path).await?.map(|f| f.size), Some(8));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_all_recreates_layout() -> Result<()> {
        let (store, _dir) = open_store().await;
        let path = store.path_for(
            &CacheKey::for_document(&DocumentRef::new("x/1").unwrap()),
            EntityKind::Document,
        );
        store.write(&path, b"{}").await?;

        store.clear_all().await?;
        assert!(store.list().await?.is_empty());
        assert!(store.base_dir().join("collections").is_dir());
        Ok(())
    }
}

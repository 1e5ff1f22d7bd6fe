//! Filesystem-backed object store.
//!
//! Each key maps to a file under the root directory, with `/` in the key
//! becoming a directory separator:
//!
//! ```text
//! {root}/users/3f1c...e9            (object bytes)
//! {root}/users/3f1c...e9.meta.json  ({"content_type": "image/jpeg", "size": 48213})
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so readers
//! never observe a half-written object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{StoreError, StoreResult};

use super::ObjectStore;

const META_SUFFIX: &str = ".meta.json";
const TEMP_SUFFIX: &str = ".tmp";

/// Sidecar metadata written next to every object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub size: u64,
}

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Create the store, creating `root` if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the sidecar metadata for `key`.
    pub async fn metadata(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let path = with_suffix(&self.object_path(key)?, META_SUFFIX);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(backend_err(key, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| backend_err(key, format!("corrupt metadata: {e}")))
    }

    /// Map a key to its file path, rejecting keys that would escape the root.
    fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes || key.ends_with('/') {
            return Err(backend_err(key, "invalid key"));
        }
        if key.ends_with(META_SUFFIX) || key.ends_with(TEMP_SUFFIX) {
            return Err(backend_err(key, "key collides with a reserved suffix"));
        }
        Ok(self.root.join(relative))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn backend_err(key: &str, message: impl ToString) -> StoreError {
    StoreError::Backend {
        store: "filesystem".to_string(),
        key: key.to_string(),
        message: message.to_string(),
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl ObjectStore for FileSystemStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| backend_err(key, e))?;
        }

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        };
        let meta_json = serde_json::to_vec(&meta).map_err(|e| backend_err(key, e))?;

        let temp = with_suffix(&path, TEMP_SUFFIX);
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| backend_err(key, e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| backend_err(key, e))?;
        tokio::fs::write(with_suffix(&path, META_SUFFIX), meta_json)
            .await
            .map_err(|e| backend_err(key, e))?;

        tracing::trace!("Wrote {} ({} bytes)", path.display(), meta.size);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend_err(key, e)),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.object_path(key)?;
        remove_if_present(&path)
            .await
            .map_err(|e| backend_err(key, e))?;
        remove_if_present(&with_suffix(&path, META_SUFFIX))
            .await
            .map_err(|e| backend_err(key, e))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.object_path(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(backend_err(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileSystemStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path().join("bucket")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, store) = store();
        store
            .put("users/abc(20x10)", vec![9, 8, 7], "image/jpeg")
            .await
            .unwrap();

        assert!(store.root().join("users").join("abc(20x10)").is_file());
        assert_eq!(
            store.get("users/abc(20x10)").await.unwrap(),
            Some(vec![9, 8, 7])
        );
        assert_eq!(
            store.metadata("users/abc(20x10)").await.unwrap(),
            Some(ObjectMeta {
                content_type: "image/jpeg".into(),
                size: 3,
            })
        );
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, store) = store();
        store.put("k", vec![1], "image/png").await.unwrap();
        store.put("k", vec![2, 2], "image/jpeg").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![2, 2]));
        assert_eq!(store.metadata("k").await.unwrap().unwrap().size, 2);
        assert!(!store.root().join("k.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_dir, store) = store();
        assert_eq!(store.get("nope").await.unwrap(), None);
        assert!(!store.exists("nope").await.unwrap());
        assert_eq!(store.metadata("nope").await.unwrap(), None);
        // Deleting a missing key is fine
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_sidecar() {
        let (_dir, store) = store();
        store.put("a/b", vec![1], "image/png").await.unwrap();
        store.delete("a/b").await.unwrap();
        assert!(!store.exists("a/b").await.unwrap());
        assert!(!store.root().join("a").join("b.meta.json").exists());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_dir, store) = store();
        for key in ["../outside", "/etc/passwd", "a/../../b", "", "dir/"] {
            let err = store.put(key, vec![1], "image/png").await.unwrap_err();
            assert!(err.to_string().contains("invalid key"), "key {key:?}");
        }
        assert!(store.put("x.meta.json", vec![1], "image/png").await.is_err());
    }

    #[tokio::test]
    async fn test_directory_is_not_an_object() {
        let (_dir, store) = store();
        store.put("users/abc", vec![1], "image/png").await.unwrap();
        assert!(!store.exists("users").await.unwrap());
    }
}

//! Prefixed JSON key-value store
//!
//! Each key maps to `<dir>/<prefix><key>.json`. Writes go through a temp
//! file and a rename so a crash never leaves a half-written blob behind.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "mymusic_";

#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
    prefix: String,
}

impl KvStore {
    pub async fn open(dir: &Path, prefix: &str) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data dir {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, key))
    }

    /// Read a value; missing or corrupted blobs read as `None`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.key_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Corrupted store entry '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.key_path(key))
            .await
            .unwrap_or(false)
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value).context("Failed to serialize store entry")?;
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }

    /// Remove a key, returning whether it existed
    pub async fn remove(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn entries(&self) -> Result<Vec<(PathBuf, u64)>> {
        let mut out = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&self.prefix) && name.ends_with(".json") {
                let len = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                out.push((entry.path(), len));
            }
        }
        Ok(out)
    }

    /// Remove every key under this store's prefix
    pub async fn clear(&self) -> Result<usize> {
        let entries = self.entries().await?;
        for (path, _) in &entries {
            tokio::fs::remove_file(path).await?;
        }
        Ok(entries.len())
    }

    /// Total bytes used by this store's keys
    pub async fn storage_size(&self) -> Result<u64> {
        Ok(self.entries().await?.iter().map(|(_, len)| len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), DEFAULT_PREFIX).await.unwrap();

        assert_eq!(store.get::<Vec<String>>("favorites").await, None);
        store.set("favorites", &vec!["a".to_string()]).await.unwrap();
        assert_eq!(
            store.get::<Vec<String>>("favorites").await,
            Some(vec!["a".to_string()])
        );
        assert!(dir.path().join("mymusic_favorites.json").exists());

        assert!(store.remove("favorites").await.unwrap());
        assert!(!store.remove("favorites").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_entry_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), DEFAULT_PREFIX).await.unwrap();
        std::fs::write(dir.path().join("mymusic_library.json"), "{not json").unwrap();
        assert_eq!(store.get::<Vec<String>>("library").await, None);
    }

    #[tokio::test]
    async fn test_clear_only_touches_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), DEFAULT_PREFIX).await.unwrap();
        store.set("a", &1).await.unwrap();
        store.set("b", &2).await.unwrap();
        std::fs::write(dir.path().join("other.json"), "3").unwrap();

        assert!(store.storage_size().await.unwrap() >= 2);
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(dir.path().join("other.json").exists());
        assert_eq!(store.storage_size().await.unwrap(), 0);
    }
}

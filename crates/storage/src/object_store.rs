//! Bucket/key object storage
//!
//! `LocalObjectStore` maps `bucket/key` onto a directory tree and stands in
//! for S3 when the gateway is unreachable.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;

    /// Objects whose key starts with `prefix`, sorted by key
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>>;
}

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        validate_segment(bucket)?;
        validate_segment(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

/// Keys must stay inside their bucket directory.
fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        bail!("Empty bucket or key");
    }
    let escapes = Path::new(segment)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        bail!("Invalid object path: {}", segment);
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read object s3://{}/{}", bucket, key))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create object directory")?;
        }
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write object s3://{}/{}", bucket, key))?;
        tracing::debug!(bucket, key, bytes = body.len(), "Stored object");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        validate_segment(bucket)?;
        let bucket_root = self.root.join(bucket);
        if !tokio::fs::try_exists(&bucket_root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        let mut pending = vec![bucket_root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                let key = path
                    .strip_prefix(&bucket_root)?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    objects.push(ObjectInfo {
                        key,
                        size: metadata.len(),
                        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                    });
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put_object("bucket", "data/sales.csv", b"a,b\n1,2\n").await.unwrap();
        let body = store.get_object("bucket", "data/sales.csv").await.unwrap();
        assert_eq!(body, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put_object("bucket", "data/a.csv", b"1").await.unwrap();
        store.put_object("bucket", "data/nested/b.csv", b"22").await.unwrap();
        store.put_object("bucket", "logs/c.log", b"333").await.unwrap();

        let listed = store.list_objects("bucket", "data/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["data/a.csv", "data/nested/b.csv"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_missing_bucket_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.list_objects("nothing", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parent_traversal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.get_object("bucket", "../secret").await.is_err());
        assert!(store.put_object("bucket", "/etc/passwd", b"x").await.is_err());
    }
}

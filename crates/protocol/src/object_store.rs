use crate::error::ObjectStoreError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub type ObjectResult<T> = std::result::Result<T, ObjectStoreError>;

/// Write-once blob storage with time-limited read links
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> ObjectResult<()>;

    /// A URL granting read access to an existing object for `ttl_secs`
    async fn signed_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> ObjectResult<String>;
}

/// Filesystem-backed store: objects live at `{root}/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> ObjectResult<PathBuf> {
        validate_segment(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> ObjectResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        log::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    async fn signed_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> ObjectResult<String> {
        let path = self.object_path(bucket, key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        let absolute = std::path::absolute(&path)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(format!(
            "file://{}?expires={}",
            absolute.display(),
            now.saturating_add(ttl_secs)
        ))
    }
}

fn validate_segment(bucket: &str) -> ObjectResult<()> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        return Err(ObjectStoreError::InvalidKey(format!("bucket '{bucket}'")));
    }
    Ok(())
}

fn validate_key(key: &str) -> ObjectResult<()> {
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if key.is_empty() || escapes {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

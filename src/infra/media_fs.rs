use super::media::object_key;
use crate::app::ports::MediaStorePort;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Writes media under a local directory that the server exposes at `public_prefix`.
pub struct FsMediaStore {
    root: PathBuf,
    public_prefix: String,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

#[async_trait]
impl MediaStorePort for FsMediaStore {
    async fn put(&self, folder: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let key = object_key(folder, bytes, content_type)?;
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Same content, same key: nothing to rewrite.
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, bytes).await?;
        }
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/{}", self.public_prefix.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_file_and_returns_public_url() {
        let dir = tempdir().unwrap();
        let store = FsMediaStore::new(dir.path(), "/media/");

        let url = store.put("signatures/3", b"hello", "image/png").await.unwrap();
        assert!(url.starts_with("/media/signatures/3/2c/"));
        assert!(url.ends_with(".png"));

        let relative = url.trim_start_matches("/media/");
        let written = std::fs::read(dir.path().join(relative)).unwrap();
        assert_eq!(written, b"hello");

        let again = store.put("signatures/3", b"hello", "image/png").await.unwrap();
        assert_eq!(url, again);
    }
}

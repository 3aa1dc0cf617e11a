//! Local-directory object storage.
//!
//! Objects land at `<root>/<bucket>/<key>` and are located by a `file://`
//! URL. The content type is not stored; it is implied by the key's
//! extension.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::StoreResult;
use crate::traits::store::ObjectStore;

/// Archives documents under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    /// A relative root is resolved against the current directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/key` under the root, refusing anything that escapes it.
    fn object_path(&self, bucket: &str, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid object path {bucket}/{key}"),
            ));
        }
        Ok(self.root.join(relative))
    }

    /// Write and remove a scratch object to confirm the root is writable.
    pub async fn check_writable(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(".write-check");
        tokio::fs::write(&path, b"ok").await?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> StoreResult<String> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        debug!(path = %path.display(), content_type, bytes = content.len(), "Stored object");
        let locator = Url::from_file_path(&path).map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not an absolute path", path.display()),
            )
        })?;
        Ok(locator.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_writes_bytes_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());
        let bytes = vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff];

        let locator = store
            .upload("bucket", "raw-documents/VA/Loudoun/2024-03-09/permit_ab12cd34.pdf", &bytes, "application/pdf")
            .await
            .unwrap();

        let path = dir
            .path()
            .join("bucket/raw-documents/VA/Loudoun/2024-03-09/permit_ab12cd34.pdf");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), bytes);

        let locator = Url::parse(&locator).unwrap();
        assert_eq!(locator.scheme(), "file");
        assert_eq!(locator.to_file_path().unwrap(), path);
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let store = FilesystemObjectStore::new("./raw-documents-store");
        assert!(store.root().is_absolute());
        assert!(store.root().ends_with("raw-documents-store"));
    }

    #[tokio::test]
    async fn test_locator_escapes_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path().join("county archive"));

        let locator = store
            .upload("bucket", "raw-documents/VA/Prince William/doc.pdf", b"x", "application/pdf")
            .await
            .unwrap();

        assert!(locator.starts_with("file:///"));
        assert!(locator.contains("county%20archive"));
        assert!(!locator.contains(' '));
        assert_eq!(
            Url::parse(&locator).unwrap().to_file_path().unwrap(),
            dir.path().join("county archive/bucket/raw-documents/VA/Prince William/doc.pdf")
        );
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path());

        assert!(store.upload("bucket", "../outside.txt", b"x", "text/plain").await.is_err());
        assert!(store.upload("bucket", "/etc/passwd", b"x", "text/plain").await.is_err());
    }

    #[tokio::test]
    async fn test_check_writable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path().join("nested"));
        store.check_writable().await.unwrap();
        assert!(dir.path().join("nested").exists());
    }
}

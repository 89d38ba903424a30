use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

/// Public namespace for generated previews.
pub const PREVIEW_NAMESPACE: &str = "previews";
/// Namespace callers use for original uploads; never public.
pub const PRODUCT_NAMESPACE: &str = "products";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob store rejected upload: {0}")]
    Rejected(String),

    #[error("blob store timed out")]
    Timeout,

    #[error("blob store io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

/// How an object is tagged and who may read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobMeta {
    pub resource_type: ResourceType,
    pub access: Access,
}

impl BlobMeta {
    pub const PUBLIC_DOCUMENT: BlobMeta = BlobMeta {
        resource_type: ResourceType::Document,
        access: Access::Public,
    };

    /// For originals under `PRODUCT_NAMESPACE`.
    pub const AUTHENTICATED_DOCUMENT: BlobMeta = BlobMeta {
        resource_type: ResourceType::Document,
        access: Access::Authenticated,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub url: String,
}

/// Remote blob storage. Writes are assumed atomic per key.
pub trait BlobStore: Send + Sync {
    fn put(
        &self,
        namespace: &str,
        name: &str,
        bytes: &[u8],
        meta: BlobMeta,
    ) -> Result<StoredBlob, StorageError>;
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Blob store on the local filesystem, laid out as `<root>/<namespace>/<name>`.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(StorageError::Rejected(format!("invalid path segment {segment:?}")));
    }
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        namespace: &str,
        name: &str,
        bytes: &[u8],
        meta: BlobMeta,
    ) -> Result<StoredBlob, StorageError> {
        validate_segment(namespace)?;
        validate_segment(name)?;
        if namespace == PRODUCT_NAMESPACE && meta.access != Access::Authenticated {
            return Err(StorageError::Rejected(
                "product originals cannot be stored publicly".into(),
            ));
        }

        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)?;

        // write-then-rename so readers never see a partial file
        let path = dir.join(name);
        let tmp = dir.join(format!(".{name}.partial"));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = bytes.len(), ?meta, "blob written");

        Ok(StoredBlob {
            url: format!(
                "{}/{}/{}",
                self.public_base_url.trim_end_matches('/'),
                namespace,
                name
            ),
        })
    }
}

#[cfg(test)]
mockall::mock! {
    pub Store {}

    impl BlobStore for Store {
        fn put(
            &self,
            namespace: &str,
            name: &str,
            bytes: &[u8],
            meta: BlobMeta,
        ) -> Result<StoredBlob, StorageError>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(store: &FsBlobStore, namespace: &str, name: &str) -> Result<StoredBlob, StorageError> {
        store.put(namespace, name, b"%PDF-1.4", BlobMeta::PUBLIC_DOCUMENT)
    }

    #[test]
    fn writes_under_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "https://cdn.example.com/");

        let stored = put(&store, PREVIEW_NAMESPACE, "preview_a_1.pdf").unwrap();
        assert_eq!(stored.url, "https://cdn.example.com/previews/preview_a_1.pdf");
        let written = fs::read(dir.path().join("previews/preview_a_1.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4");
        assert!(!dir.path().join("previews/.preview_a_1.pdf.partial").exists());
    }

    #[test]
    fn rejects_traversal_and_public_originals() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost");

        assert!(matches!(
            put(&store, PREVIEW_NAMESPACE, "../escape.pdf"),
            Err(StorageError::Rejected(_))
        ));
        assert!(matches!(
            put(&store, "..", "x.pdf"),
            Err(StorageError::Rejected(_))
        ));
        assert!(matches!(
            put(&store, PRODUCT_NAMESPACE, "x.pdf"),
            Err(StorageError::Rejected(_))
        ));
    }

    #[test]
    fn originals_need_authenticated_access() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost");

        store
            .put(PRODUCT_NAMESPACE, "x.pdf", b"%PDF-1.4", BlobMeta::AUTHENTICATED_DOCUMENT)
            .unwrap();
        assert!(dir.path().join("products/x.pdf").exists());
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}

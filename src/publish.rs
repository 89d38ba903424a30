use tracing::{error, info};

use crate::builder::validate;
use crate::error::Result;
use crate::storage::{BlobMeta, BlobStore};
use crate::tier::PageTier;

/// What callers get back after a preview is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArtifact {
    pub preview_key: String,
    pub preview_url: String,
    /// Pages in the seller's original document.
    pub total_pages: usize,
    /// Revealed pages actually copied into the preview.
    pub preview_pages: usize,
    pub locked_pages: usize,
}

/// `preview_{base}_{timestamp_ms}`, where `base` is the identifier without
/// directory prefix or extension, restricted to `[A-Za-z0-9_-]`.
pub fn preview_key(product_identifier: &str, timestamp_ms: i64) -> String {
    format!("preview_{}_{}", base_identifier(product_identifier), timestamp_ms)
}

fn base_identifier(identifier: &str) -> String {
    let file_name = identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier);
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };

    let base: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if base.is_empty() {
        "product".to_string()
    } else {
        base
    }
}

/// Validates the serialized preview and uploads it under `namespace`.
/// Upload errors are returned as they are; nothing is retried here.
#[tracing::instrument(skip(bytes, store), fields(bytes = bytes.len()))]
pub fn publish(
    bytes: &[u8],
    product_identifier: &str,
    tier: PageTier,
    total_pages: usize,
    timestamp_ms: i64,
    namespace: &str,
    store: &dyn BlobStore,
) -> Result<StorageArtifact> {
    validate(bytes, tier.total)?;

    let key = preview_key(product_identifier, timestamp_ms);
    let object_name = format!("{key}.pdf");
    let stored = store
        .put(namespace, &object_name, bytes, BlobMeta::PUBLIC_DOCUMENT)
        .inspect_err(|e| error!(key = %key, error = %e, "preview upload failed"))?;

    info!(key = %key, url = %stored.url, "preview published");
    Ok(StorageArtifact {
        preview_key: key,
        preview_url: stored.url,
        total_pages,
        preview_pages: tier.revealed,
        locked_pages: tier.locked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::serialize;
    use crate::error::PreviewError;
    use crate::locked::synthesize_locked_page;
    use crate::pdf::PreviewDocument;
    use crate::storage::{MockStore, StorageError, StoredBlob, PREVIEW_NAMESPACE};
    use crate::tier::select_tier;

    fn five_page_preview() -> Vec<u8> {
        let mut preview = PreviewDocument::new();
        for i in 1..=5 {
            synthesize_locked_page(&mut preview, i, 2, 5).unwrap();
        }
        serialize(preview).unwrap()
    }

    #[test]
    fn key_format() {
        assert_eq!(preview_key("abc123", 1_700_000_000_000), "preview_abc123_1700000000000");
        assert_eq!(preview_key("uploads/My Book.pdf", 5), "preview_My_Book_5");
        assert_eq!(preview_key(".hidden", 5), "preview__hidden_5");
        assert_eq!(preview_key("", 5), "preview_product_5");
    }

    #[test]
    fn uploads_public_document_under_previews() {
        let mut store = MockStore::new();
        store
            .expect_put()
            .withf(|ns, name, bytes, meta| {
                ns == PREVIEW_NAMESPACE
                    && name == "preview_p1_42.pdf"
                    && bytes.starts_with(b"%PDF-")
                    && *meta == BlobMeta::PUBLIC_DOCUMENT
            })
            .times(1)
            .returning(|ns, name, _, _| {
                Ok(StoredBlob {
                    url: format!("https://cdn/{ns}/{name}"),
                })
            });

        let bytes = five_page_preview();
        let artifact = publish(&bytes, "p1", select_tier(2), 2, 42, PREVIEW_NAMESPACE, &store)
            .unwrap();
        assert_eq!(artifact.preview_key, "preview_p1_42");
        assert_eq!(artifact.preview_url, "https://cdn/previews/preview_p1_42.pdf");
        assert_eq!((artifact.preview_pages, artifact.locked_pages), (1, 4));
    }

    #[test]
    fn integrity_failure_never_uploads() {
        let mut store = MockStore::new();
        store.expect_put().times(0);

        let mut preview = PreviewDocument::new();
        synthesize_locked_page(&mut preview, 1, 2, 5).unwrap();
        let bytes = serialize(preview).unwrap();

        let err = publish(&bytes, "p1", select_tier(2), 2, 42, PREVIEW_NAMESPACE, &store)
            .unwrap_err();
        assert!(matches!(
            err,
            PreviewError::GenerationIntegrity { expected: 5, found: 1 }
        ));
    }

    #[test]
    fn storage_errors_propagate() {
        let mut store = MockStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _, _, _| Err(StorageError::Timeout));

        let err = publish(
            &five_page_preview(),
            "p1",
            select_tier(2),
            2,
            42,
            PREVIEW_NAMESPACE,
            &store,
        )
        .unwrap_err();
        assert!(matches!(err, PreviewError::StorageUpload(StorageError::Timeout)));
    }
}

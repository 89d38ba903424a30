use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::builder::{serialize, validate};
use crate::config::PreviewConfig;
use crate::error::{PageCopyWarning, PreviewError, Result};
use crate::format::DocumentFormat;
use crate::locked::synthesize_locked_page;
use crate::pdf::{LopdfLoader, PreviewDocument, SourceDocument, SourceLoader};
use crate::publish::{publish, StorageArtifact};
use crate::storage::{BlobStore, Clock, FsBlobStore, SystemClock, PREVIEW_NAMESPACE};
use crate::tier::{select_tier, PageTier};
use crate::watermark::apply_watermark;

/// An upload the caller wants a preview for.
#[derive(Debug, Clone)]
pub struct PreviewRequest<'a> {
    pub bytes: &'a [u8],
    pub format: DocumentFormat,
    pub product_id: &'a str,
}

/// A built, not yet published, preview.
#[derive(Debug)]
pub struct RenderedPreview {
    pub bytes: Vec<u8>,
    pub tier: PageTier,
    pub total_source_pages: usize,
    pub warnings: Vec<PageCopyWarning>,
}

impl RenderedPreview {
    /// Bytes after the reparse check, for callers that skip publishing.
    pub fn into_validated_bytes(self) -> Result<Vec<u8>> {
        validate(&self.bytes, self.tier.total)?;
        Ok(self.bytes)
    }
}

/// Builds the preview document for a PDF upload.
#[tracing::instrument(skip_all, fields(bytes = bytes.len(), format = %format))]
pub fn render_preview(
    bytes: &[u8],
    format: &DocumentFormat,
    loader: &dyn SourceLoader,
) -> Result<RenderedPreview> {
    if !format.supports_preview() {
        return Err(PreviewError::UnsupportedFormat(format.clone()));
    }

    let source = SourceDocument::parse(bytes, loader)?;
    let total_source_pages = source.page_count();
    let planned = select_tier(total_source_pages);

    let mut preview = PreviewDocument::new();
    let warnings = preview.copy_leading_pages(&source, planned.revealed);
    for page_id in preview.page_ids().to_vec() {
        apply_watermark(&mut preview, page_id)?;
    }

    let tier = planned.reconcile(preview.page_count());
    if tier != planned {
        warn!(
            planned = planned.revealed,
            revealed = tier.revealed,
            "revealing fewer pages than the tier allows"
        );
    }
    for position in tier.revealed + 1..=tier.total {
        synthesize_locked_page(&mut preview, position, total_source_pages, tier.total)?;
    }

    let bytes = serialize(preview)?;
    info!(
        source_pages = total_source_pages,
        revealed = tier.revealed,
        locked = tier.locked,
        "preview rendered"
    );
    Ok(RenderedPreview {
        bytes,
        tier,
        total_source_pages,
        warnings,
    })
}

/// Renders and publishes previews. Each call works on its own document, so
/// one generator can serve concurrent requests.
pub struct PreviewGenerator {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    loader: Arc<dyn SourceLoader>,
    namespace: String,
    last_timestamp: AtomicI64,
}

impl PreviewGenerator {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            loader: Arc::new(LopdfLoader),
            namespace: PREVIEW_NAMESPACE.to_string(),
            last_timestamp: AtomicI64::new(0),
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        let store = FsBlobStore::new(&config.store_root, config.public_base_url.clone());
        Self::new(Arc::new(store)).with_namespace(config.namespace.clone())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn render(&self, bytes: &[u8], format: &DocumentFormat) -> Result<RenderedPreview> {
        render_preview(bytes, format, self.loader.as_ref())
    }

    #[tracing::instrument(skip_all, fields(product_id = request.product_id))]
    pub fn generate(&self, request: &PreviewRequest<'_>) -> Result<StorageArtifact> {
        let rendered = self.render(request.bytes, &request.format)?;
        publish(
            &rendered.bytes,
            request.product_id,
            rendered.tier,
            rendered.total_source_pages,
            self.next_timestamp(),
            &self.namespace,
            self.store.as_ref(),
        )
    }

    /// Like `generate`, but a failure only costs the preview: it is logged
    /// and `None` is returned so the product upload can go ahead.
    pub fn generate_or_skip(&self, request: &PreviewRequest<'_>) -> Option<StorageArtifact> {
        match self.generate(request) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(product_id = request.product_id, error = %e, "preview unavailable");
                None
            }
        }
    }

    // Strictly increasing per generator, so two generations in the same
    // millisecond still get distinct keys.
    fn next_timestamp(&self) -> i64 {
        let now = self.clock.now_ms();
        let prev = self
            .last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }
}

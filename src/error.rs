use thiserror::Error;

use crate::format::DocumentFormat;
use crate::storage::StorageError;

/// Failures of a single preview generation.
///
/// None of these should fail the surrounding product upload; callers are
/// expected to store the product without a preview instead.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Format tag says the upload is not something we can preview.
    #[error("preview unsupported for {0} documents")]
    UnsupportedFormat(DocumentFormat),

    /// Source bytes do not carry the `%PDF-` signature.
    #[error("source is not a PDF: {0}")]
    InvalidFormat(String),

    /// Signature is fine but the document structure cannot be used.
    #[error("source PDF is corrupt: {0}")]
    CorruptSource(String),

    /// Reparsed output does not have the page count we built.
    #[error("preview integrity check failed: expected {expected} pages, found {found}")]
    GenerationIntegrity { expected: usize, found: usize },

    #[error("preview upload failed: {0}")]
    StorageUpload(#[from] StorageError),

    #[error("failed to serialize preview: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, PreviewError>;

/// A source page that could not be copied. Generation continues without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCopyWarning {
    /// Zero-based index in the source document.
    pub page_index: usize,
    pub reason: String,
}

impl std::fmt::Display for PageCopyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {} skipped: {}", self.page_index + 1, self.reason)
    }
}

pub(crate) fn lopdf_err(err: lopdf::Error) -> PreviewError {
    PreviewError::Serialize(err.to_string())
}

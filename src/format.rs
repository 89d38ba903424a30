use std::fmt;

use crate::error::{PreviewError, Result};

pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Kind of an uploaded file, decided once when the upload is ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Image,
    Archive,
    Other(String),
}

impl DocumentFormat {
    pub fn from_mime_type(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => DocumentFormat::Pdf,
            "application/zip"
            | "application/x-zip-compressed"
            | "application/x-7z-compressed"
            | "application/x-rar-compressed"
            | "application/gzip" => DocumentFormat::Archive,
            s if s.starts_with("image/") => DocumentFormat::Image,
            _ => DocumentFormat::Other(essence),
        }
    }

    pub fn supports_preview(&self) -> bool {
        matches!(self, DocumentFormat::Pdf)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("pdf"),
            DocumentFormat::Image => f.write_str("image"),
            DocumentFormat::Archive => f.write_str("archive"),
            DocumentFormat::Other(mime) if mime.is_empty() => f.write_str("unknown"),
            DocumentFormat::Other(mime) => f.write_str(mime),
        }
    }
}

/// Rejects anything that does not start with `%PDF-`, whatever the caller
/// claimed the MIME type was.
pub fn ensure_pdf_signature(bytes: &[u8]) -> Result<()> {
    if bytes.starts_with(PDF_SIGNATURE) {
        return Ok(());
    }
    let head = &bytes[..bytes.len().min(PDF_SIGNATURE.len())];
    Err(PreviewError::InvalidFormat(format!(
        "missing %PDF- signature (found {:?})",
        String::from_utf8_lossy(head)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mime_types() {
        assert_eq!(DocumentFormat::from_mime_type("application/pdf"), DocumentFormat::Pdf);
        assert_eq!(
            DocumentFormat::from_mime_type("Application/PDF; charset=binary"),
            DocumentFormat::Pdf
        );
        assert_eq!(DocumentFormat::from_mime_type("image/png"), DocumentFormat::Image);
        assert_eq!(DocumentFormat::from_mime_type("application/zip"), DocumentFormat::Archive);
        assert_eq!(
            DocumentFormat::from_mime_type("text/plain"),
            DocumentFormat::Other("text/plain".into())
        );
    }

    #[test]
    fn only_pdf_supports_preview() {
        assert!(DocumentFormat::Pdf.supports_preview());
        assert!(!DocumentFormat::Image.supports_preview());
        assert!(!DocumentFormat::Other(String::new()).supports_preview());
    }

    #[test]
    fn signature_check() {
        assert!(ensure_pdf_signature(b"%PDF-1.7\n...").is_ok());
        assert!(matches!(
            ensure_pdf_signature(b"PK\x03\x04"),
            Err(PreviewError::InvalidFormat(_))
        ));
        assert!(ensure_pdf_signature(b"").is_err());
        assert!(ensure_pdf_signature(b" %PDF-1.4").is_err());
    }
}

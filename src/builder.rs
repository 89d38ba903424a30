use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use tracing::{debug, error};

use crate::error::{lopdf_err, PreviewError, Result};
use crate::pdf::PreviewDocument;

const PRODUCER: &str = "pdf_preview";

/// Encodes drawn content as a FlateDecode stream.
pub fn content_stream(content: &Content) -> Result<Stream> {
    let raw = content.encode().map_err(lopdf_err)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| PreviewError::Serialize(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PreviewError::Serialize(e.to_string()))?;

    let dict = dictionary! {
        "Filter" => "FlateDecode",
    };
    // already compressed; keep lopdf from touching it again
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Writes the preview with a classic xref table: no object streams, no
/// incremental sections, no timestamps.
pub fn serialize(preview: PreviewDocument) -> Result<Vec<u8>> {
    let mut doc = preview.finish();

    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Info", Object::Reference(info_id));
    doc.renumber_objects();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| PreviewError::Serialize(e.to_string()))?;
    debug!(bytes = out.len(), "preview serialized");
    Ok(out)
}

/// Reopens serialized bytes and checks the page count.
pub fn validate(bytes: &[u8], expected_pages: usize) -> Result<()> {
    let found = match Document::load_mem(bytes) {
        Ok(doc) => doc.get_pages().len(),
        Err(e) => {
            error!(error = %e, "serialized preview does not reparse");
            0
        }
    };

    if found != expected_pages {
        error!(expected = expected_pages, found, "preview page count mismatch");
        return Err(PreviewError::GenerationIntegrity {
            expected: expected_pages,
            found,
        });
    }
    Ok(())
}

pub mod builder;
pub mod canvas;
pub mod config;
pub mod error;
pub mod font;
pub mod format;
pub mod generator;
pub mod locked;
pub mod pdf;
pub mod publish;
pub mod storage;
pub mod tier;
pub mod watermark;

pub use config::PreviewConfig;
pub use error::{PageCopyWarning, PreviewError};
pub use format::DocumentFormat;
pub use generator::{render_preview, PreviewGenerator, PreviewRequest, RenderedPreview};
pub use publish::StorageArtifact;
pub use tier::{select_tier, PageTier, PREVIEW_PAGE_COUNT};

use wasm_bindgen::prelude::*;

/// Builds the preview in the browser, without publishing it.
#[wasm_bindgen]
pub fn render_preview_pdf(pdf_bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    render_preview(pdf_bytes, &DocumentFormat::Pdf, &pdf::LopdfLoader)
        .and_then(RenderedPreview::into_validated_bytes)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn get_page_count(pdf_bytes: &[u8]) -> Result<usize, JsValue> {
    let source = pdf::SourceDocument::parse(pdf_bytes, &pdf::LopdfLoader)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(source.page_count())
}

/// `[revealed, locked]` for a source with `total_pages` pages.
#[wasm_bindgen]
pub fn preview_tier(total_pages: usize) -> Vec<u32> {
    let tier = select_tier(total_pages);
    vec![tier.revealed as u32, tier.locked as u32]
}

use lopdf::{dictionary, Object};
use tracing::debug;

use crate::builder::content_stream;
use crate::canvas::Canvas;
use crate::error::Result;
use crate::font::{font_resources, StandardFont};
use crate::pdf::{PreviewDocument, A4};

pub const HEADLINE: &str = "Content continues in the full version";
pub const CALL_TO_ACTION: &str = "Purchase to unlock the complete document.";
pub const BENEFITS: [&str; 3] = [
    "Instant download after purchase",
    "Lifetime access to your files",
    "Secure, encrypted checkout",
];

const BACKGROUND: (f32, f32, f32) = (0.95, 0.96, 0.98);
const ACCENT: (f32, f32, f32) = (0.18, 0.36, 0.78);
const CARD_BORDER: (f32, f32, f32) = (0.82, 0.85, 0.9);

const CARD_MARGIN_X: f32 = 72.0;
const CARD_BOTTOM: f32 = 230.0;
const CARD_HEIGHT: f32 = 400.0;
const ACCENT_HEIGHT: f32 = 6.0;

pub fn total_pages_line(total_source_pages: usize) -> String {
    let noun = if total_source_pages == 1 { "page" } else { "pages" };
    format!("This document has {total_source_pages} {noun} total.")
}

pub fn footer_line(page_index: usize, total_preview_pages: usize) -> String {
    format!("Page {page_index} of {total_preview_pages}")
}

/// Appends a fully drawn placeholder page. `page_index` is the 1-based
/// position of the page inside the preview.
pub fn synthesize_locked_page(
    preview: &mut PreviewDocument,
    page_index: usize,
    total_source_pages: usize,
    total_preview_pages: usize,
) -> Result<()> {
    let content = locked_page_canvas(page_index, total_source_pages, total_preview_pages);
    let stream = content_stream(&content.into_content())?;

    let doc = preview.document_mut();
    let content_id = doc.add_object(stream);
    let page_id = preview.add_page(dictionary! {
        "MediaBox" => A4.to_object(),
        "Contents" => Object::Reference(content_id),
        "Resources" => dictionary! {
            "Font" => font_resources(),
        },
    });
    debug!(page_index, ?page_id, "locked page added");
    Ok(())
}

/// Encoded, uncompressed content of a locked page.
pub fn locked_page_content(
    page_index: usize,
    total_source_pages: usize,
    total_preview_pages: usize,
) -> Result<Vec<u8>> {
    locked_page_canvas(page_index, total_source_pages, total_preview_pages)
        .into_content()
        .encode()
        .map_err(crate::error::lopdf_err)
}

fn locked_page_canvas(
    page_index: usize,
    total_source_pages: usize,
    total_preview_pages: usize,
) -> Canvas {
    let (w, h) = (A4.width, A4.height);
    let cx = w / 2.0;
    let card_w = w - 2.0 * CARD_MARGIN_X;
    let card_top = CARD_BOTTOM + CARD_HEIGHT;

    let mut c = Canvas::new();

    // page background
    c.save()
        .fill_rgb(BACKGROUND.0, BACKGROUND.1, BACKGROUND.2)
        .rect(0.0, 0.0, w, h)
        .fill()
        .restore();

    // card
    c.save()
        .fill_rgb(1.0, 1.0, 1.0)
        .stroke_rgb(CARD_BORDER.0, CARD_BORDER.1, CARD_BORDER.2)
        .line_width(1.0)
        .rect(CARD_MARGIN_X, CARD_BOTTOM, card_w, CARD_HEIGHT)
        .fill_stroke()
        .fill_rgb(ACCENT.0, ACCENT.1, ACCENT.2)
        .rect(CARD_MARGIN_X, card_top - ACCENT_HEIGHT, card_w, ACCENT_HEIGHT)
        .fill()
        .restore();

    draw_padlock(&mut c, cx, 540.0);

    c.save()
        .fill_gray(0.15)
        .centered_text(StandardFont::HelveticaBold, 18.0, cx, 500.0, HEADLINE)
        .fill_gray(0.25)
        .centered_text(
            StandardFont::Helvetica,
            14.0,
            cx,
            468.0,
            &total_pages_line(total_source_pages),
        )
        .fill_gray(0.4)
        .centered_text(StandardFont::Helvetica, 12.0, cx, 440.0, CALL_TO_ACTION);

    let bullets_x = cx - 110.0;
    for (i, benefit) in BENEFITS.iter().enumerate() {
        let y = 396.0 - 24.0 * i as f32;
        c.fill_rgb(ACCENT.0, ACCENT.1, ACCENT.2)
            .text(StandardFont::HelveticaBold, 12.0, bullets_x, y, "\u{2022}")
            .fill_gray(0.3)
            .text(StandardFont::Helvetica, 12.0, bullets_x + 14.0, y, benefit);
    }
    c.restore();

    c.save()
        .fill_gray(0.55)
        .centered_text(
            StandardFont::Helvetica,
            10.0,
            cx,
            40.0,
            &footer_line(page_index, total_preview_pages),
        )
        .restore();

    c
}

fn draw_padlock(c: &mut Canvas, cx: f32, bottom: f32) {
    let (body_w, body_h) = (36.0, 28.0);
    let shackle = 11.0;
    let top = bottom + body_h;

    c.save()
        .fill_rgb(ACCENT.0, ACCENT.1, ACCENT.2)
        .rect(cx - body_w / 2.0, bottom, body_w, body_h)
        .fill()
        .stroke_rgb(ACCENT.0, ACCENT.1, ACCENT.2)
        .line_width(4.0)
        .move_to(cx - shackle, top)
        .line_to(cx - shackle, top + 10.0)
        .curve_to(cx - shackle, top + 24.0, cx + shackle, top + 24.0, cx + shackle, top + 10.0)
        .line_to(cx + shackle, top)
        .stroke()
        .restore();
}

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::builder::content_stream;
use crate::canvas::Canvas;
use crate::error::{lopdf_err, Result};
use crate::font::{font_resources, StandardFont};
use crate::pdf::{normalize_rotation, PageBox, PreviewDocument};

pub const STAMP_TEXT: &str = "PREVIEW";
pub const CAPTION_TEXT: &str = "Preview Only \u{2014} Purchase to unlock full content.";

const STAMP_GRAY: f32 = 0.6;
const STAMP_OPACITY: f32 = 0.18;
const STAMP_ANGLE_DEG: f32 = 45.0;
// vertical position of the stamp center, as a fraction of page height
const STAMP_CENTER_Y: f32 = 0.6;
const CAPTION_GRAY: f32 = 0.5;
const CAPTION_SIZE: f32 = 9.0;
const CAPTION_BASELINE: f32 = 24.0;

const GS_NAME: &str = "PvGS";

/// Stamps a copied page with the diagonal "PREVIEW" mark and the footer caption.
pub fn apply_watermark(preview: &mut PreviewDocument, page_id: ObjectId) -> Result<()> {
    let page_box = preview.page_box(page_id);
    let rotation = preview.page_rotation(page_id);
    let overlay = content_stream(&watermark_content(page_box, rotation).into_content())?;

    let doc = preview.document_mut();
    let resources = own_resources(doc, page_id)?;
    let existing = doc
        .get_dictionary(page_id)
        .map_err(lopdf_err)?
        .get(b"Contents")
        .ok()
        .cloned();

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let close_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));
    let overlay_id = doc.add_object(overlay);

    let mut contents = vec![Object::Reference(open_id)];
    match existing {
        Some(Object::Array(items)) => contents.extend(items),
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
            _ => contents.push(Object::Reference(id)),
        },
        Some(other) => contents.push(other),
        None => {}
    }
    contents.push(Object::Reference(close_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(lopdf_err)?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}

/// Drawing operations of the watermark for a page of the given size,
/// laid out the way the page is displayed after its `/Rotate`.
pub fn watermark_content(page_box: PageBox, rotation: i64) -> Canvas {
    let (frame, to_page) = display_frame(page_box, rotation);

    let font = StandardFont::HelveticaBold;
    let size = stamp_font_size(frame);
    let width = font.text_width(STAMP_TEXT, size);
    let height = font.cap_height() * size;

    let (sin, cos) = STAMP_ANGLE_DEG.to_radians().sin_cos();
    let cx = frame.x + frame.width / 2.0;
    let cy = frame.y + frame.height * STAMP_CENTER_Y;
    // origin such that the middle of the text box lands on (cx, cy)
    let tx = cx - (width / 2.0) * cos + (height / 2.0) * sin;
    let ty = cy - (width / 2.0) * sin - (height / 2.0) * cos;

    let mut canvas = Canvas::new();
    if let Some(matrix) = to_page {
        canvas.save().transform(matrix);
    }
    canvas
        .save()
        .graphics_state(GS_NAME)
        .fill_gray(STAMP_GRAY)
        .text_with_matrix(font, size, [cos, sin, -sin, cos, tx, ty], STAMP_TEXT)
        .restore()
        .save()
        .fill_gray(CAPTION_GRAY)
        .centered_text(
            StandardFont::Helvetica,
            CAPTION_SIZE,
            cx,
            frame.y + CAPTION_BASELINE,
            CAPTION_TEXT,
        )
        .restore();
    if to_page.is_some() {
        canvas.restore();
    }
    canvas
}

// The page box as the viewer shows it, with its origin at the displayed
// lower-left corner, plus the matrix back into page space.
fn display_frame(page_box: PageBox, rotation: i64) -> (PageBox, Option<[f32; 6]>) {
    let PageBox {
        x,
        y,
        width: w,
        height: h,
    } = page_box;
    let upright = PageBox {
        x: 0.0,
        y: 0.0,
        width: w,
        height: h,
    };
    let sideways = PageBox {
        x: 0.0,
        y: 0.0,
        width: h,
        height: w,
    };
    match normalize_rotation(rotation) {
        90 => (sideways, Some([0.0, 1.0, -1.0, 0.0, x + w, y])),
        180 => (upright, Some([-1.0, 0.0, 0.0, -1.0, x + w, y + h])),
        270 => (sideways, Some([0.0, -1.0, 1.0, 0.0, x, y + h])),
        _ => (page_box, None),
    }
}

fn stamp_font_size(page_box: PageBox) -> f32 {
    (page_box.width.min(page_box.height) / 6.0).clamp(24.0, 144.0)
}

/// Resolves the page's resources into a dictionary owned by the page and
/// adds the watermark's fonts and graphics state. Shared resource objects
/// are left as they are.
fn own_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page = doc.get_dictionary(page_id).map_err(lopdf_err)?;
    let mut resources = match page.get(b"Resources") {
        Ok(obj) => resolve_dict(doc, obj),
        Err(_) => Dictionary::new(),
    };

    let mut fonts = resources
        .get(b"Font")
        .map(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    for (name, font) in font_resources().iter() {
        fonts.set(name.clone(), font.clone());
    }
    resources.set("Font", fonts);

    let mut states = resources
        .get(b"ExtGState")
        .map(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    states.set(
        GS_NAME,
        dictionary! {
            "Type" => "ExtGState",
            "ca" => STAMP_OPACITY,
            "CA" => STAMP_OPACITY,
        },
    );
    resources.set("ExtGState", states);
    Ok(resources)
}

fn resolve_dict(doc: &Document, obj: &Object) -> Dictionary {
    match obj {
        Object::Dictionary(d) => d.clone(),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

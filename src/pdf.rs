use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::{PageCopyWarning, PreviewError, Result};
use crate::format::ensure_pdf_signature;

/// A4 in points.
pub const A4: PageBox = PageBox {
    x: 0.0,
    y: 0.0,
    width: 595.0,
    height: 842.0,
};

const LETTER: PageBox = PageBox {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

// Page keys that point back into the source page tree.
const DROPPED_PAGE_KEYS: [&[u8]; 2] = [b"Parent", b"B"];

const MAX_TREE_DEPTH: usize = 32;

/// Builds a `lopdf::Document` from raw bytes. Everything that constructs a
/// document from caller input goes through this.
pub trait SourceLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> lopdf::Result<Document>;
}

pub struct LopdfLoader;

impl SourceLoader for LopdfLoader {
    fn load(&self, bytes: &[u8]) -> lopdf::Result<Document> {
        Document::load_mem(bytes)
    }
}

#[cfg(test)]
mockall::mock! {
    pub Loader {}

    impl SourceLoader for Loader {
        fn load(&self, bytes: &[u8]) -> lopdf::Result<Document>;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    fn from_array(arr: &[Object]) -> Option<Self> {
        if arr.len() != 4 {
            return None;
        }
        let mut v = [0f32; 4];
        for (slot, obj) in v.iter_mut().zip(arr) {
            *slot = match obj {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r as f32,
                _ => return None,
            };
        }
        let (x0, x1) = (v[0].min(v[2]), v[0].max(v[2]));
        let (y0, y1) = (v[1].min(v[3]), v[1].max(v[3]));
        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            self.x.into(),
            self.y.into(),
            (self.x + self.width).into(),
            (self.y + self.height).into(),
        ])
    }
}

/// Seller's original PDF, parsed and read-only.
pub struct SourceDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    pub fn parse(bytes: &[u8], loader: &dyn SourceLoader) -> Result<Self> {
        ensure_pdf_signature(bytes)?;

        let doc = loader
            .load(bytes)
            .map_err(|e| PreviewError::CorruptSource(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(PreviewError::CorruptSource("document is encrypted".into()));
        }

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PreviewError::CorruptSource("document has no pages".into()));
        }

        debug!(pages = page_ids.len(), "source document parsed");
        Ok(Self { doc, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page dictionary with inherited attributes pulled down from the page tree.
    fn flattened_page(&self, index: usize) -> lopdf::Result<Dictionary> {
        let page_id = self.page_ids[index];
        let mut page = self.doc.get_dictionary(page_id)?.clone();

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(parent_id) = parent {
            if depth == MAX_TREE_DEPTH {
                break;
            }
            let node = self.doc.get_dictionary(parent_id)?;
            for key in INHERITABLE {
                if !page.has(key) {
                    if let Ok(value) = node.get(key) {
                        page.set(key.to_vec(), value.clone());
                    }
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }

        for key in DROPPED_PAGE_KEYS {
            page.remove(key);
        }
        if let Ok(annots) = page.get(b"Annots") {
            let kept = self.visible_annotations(annots);
            if kept.is_empty() {
                page.remove(b"Annots");
            } else {
                page.set("Annots", kept);
            }
        }
        Ok(page)
    }

    // Link annotations only navigate, and their targets are not in the preview.
    // Dangling entries draw nothing and are dropped too.
    fn visible_annotations(&self, annots: &Object) -> Vec<Object> {
        let items = match annots {
            Object::Array(items) => items.as_slice(),
            Object::Reference(id) => match self.doc.get_object(*id).and_then(Object::as_array) {
                Ok(items) => items.as_slice(),
                Err(_) => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        items
            .iter()
            .filter(|item| {
                let dict = match item {
                    Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
                    other => other.as_dict().ok(),
                };
                dict.is_some_and(|d| {
                    d.get(b"Subtype")
                        .and_then(Object::as_name)
                        .map_or(true, |subtype| subtype != b"Link")
                })
            })
            .cloned()
            .collect()
    }
}

/// Preview under construction. Owned by one generation only.
pub struct PreviewDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    // source id -> preview id, shared across copied pages
    imported: BTreeMap<ObjectId, ObjectId>,
}

impl Default for PreviewDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            imported: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.kids
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Appends a page built from scratch. `Type` and `Parent` are filled in.
    pub fn add_page(&mut self, mut page: Dictionary) -> ObjectId {
        page.set("Type", "Page");
        page.set("Parent", Object::Reference(self.pages_id));
        let id = self.doc.add_object(page);
        self.kids.push(id);
        id
    }

    /// Copies source pages `0..count` one by one. Pages that fail are
    /// skipped and reported.
    pub fn copy_leading_pages(
        &mut self,
        source: &SourceDocument,
        count: usize,
    ) -> Vec<PageCopyWarning> {
        let mut warnings = Vec::new();
        for index in 0..count.min(source.page_count()) {
            match self.copy_page(source, index) {
                Ok(id) => debug!(page = index + 1, ?id, "copied source page"),
                Err(e) => {
                    let warning = PageCopyWarning {
                        page_index: index,
                        reason: e.to_string(),
                    };
                    warn!(page = index + 1, reason = %warning.reason, "skipping source page");
                    warnings.push(warning);
                }
            }
        }
        warnings
    }

    fn copy_page(&mut self, source: &SourceDocument, index: usize) -> lopdf::Result<ObjectId> {
        let page = source.flattened_page(index)?;

        let mut copier = PageCopier {
            src: &source.doc,
            committed: &self.imported,
            staged: BTreeMap::new(),
            pending: Vec::new(),
            objects: Vec::new(),
            next_id: self.doc.max_id + 1,
        };
        let mut copied = copier.copy_page_dict(&page)?;
        let PageCopier {
            staged, objects, next_id, ..
        } = copier;

        // Nothing touches the preview until the whole page graph resolved.
        self.doc.max_id = next_id - 1;
        self.doc.objects.extend(objects);
        self.imported.extend(staged);

        let media_box = copied
            .get(b"MediaBox")
            .ok()
            .and_then(|o| resolve_box(&self.doc, o))
            .unwrap_or(LETTER);
        copied.set("MediaBox", media_box.to_object());
        Ok(self.add_page(copied))
    }

    /// Effective box of a page already in the preview (CropBox, then MediaBox).
    pub fn page_box(&self, page_id: ObjectId) -> PageBox {
        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return A4;
        };
        [b"CropBox".as_slice(), b"MediaBox"]
            .into_iter()
            .find_map(|key| page.get(key).ok().and_then(|o| resolve_box(&self.doc, o)))
            .unwrap_or(A4)
    }

    /// Clockwise display rotation of a page already in the preview.
    pub fn page_rotation(&self, page_id: ObjectId) -> i64 {
        self.doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Rotate").ok())
            .and_then(|obj| match obj {
                Object::Reference(id) => self.doc.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|obj| obj.as_i64().ok())
            .map_or(0, normalize_rotation)
    }

    /// Writes the page tree and catalog and hands back the finished document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.kids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        };
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc
    }
}

/// Maps a `/Rotate` value onto 0, 90, 180 or 270. Values that are not a
/// multiple of 90 are ignored by viewers and count as 0.
pub fn normalize_rotation(rotate: i64) -> i64 {
    let r = rotate.rem_euclid(360);
    if r % 90 == 0 {
        r
    } else {
        0
    }
}

fn resolve_box(doc: &Document, obj: &Object) -> Option<PageBox> {
    match obj {
        Object::Array(arr) => PageBox::from_array(arr),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| PageBox::from_array(arr)),
        _ => None,
    }
}

/// Deep copy of one page's object graph into the preview, staged so a
/// failure leaves the preview untouched.
///
/// Indirect objects are copied from a work list rather than by recursion,
/// so arbitrarily long reference chains cannot exhaust the stack.
struct PageCopier<'a> {
    src: &'a Document,
    committed: &'a BTreeMap<ObjectId, ObjectId>,
    staged: BTreeMap<ObjectId, ObjectId>,
    // (source id, preview id) allocated but not yet copied
    pending: Vec<(ObjectId, ObjectId)>,
    objects: Vec<(ObjectId, Object)>,
    next_id: u32,
}

impl PageCopier<'_> {
    fn copy_page_dict(&mut self, page: &Dictionary) -> lopdf::Result<Dictionary> {
        let src = self.src;
        let copied = self.copy_dict(page)?;
        while let Some((source_id, new_id)) = self.pending.pop() {
            let source = src.get_object(source_id)?;
            let object = self.copy_object(source)?;
            self.objects.push((new_id, object));
        }
        Ok(copied)
    }

    // Direct objects only; references are queued.
    fn copy_object(&mut self, obj: &Object) -> lopdf::Result<Object> {
        Ok(match obj {
            Object::Reference(id) => self.copy_reference(*id)?,
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item))
                    .collect::<lopdf::Result<_>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(dict)?),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dict(&stream.dict)?;
                Object::Stream(copied)
            }
            other => other.clone(),
        })
    }

    fn copy_dict(&mut self, dict: &Dictionary) -> lopdf::Result<Dictionary> {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.copy_object(value)?);
        }
        Ok(out)
    }

    fn copy_reference(&mut self, id: ObjectId) -> lopdf::Result<Object> {
        if let Some(mapped) = self.committed.get(&id).or_else(|| self.staged.get(&id)) {
            return Ok(Object::Reference(*mapped));
        }

        let source = self.src.get_object(id)?;
        if is_page_tree_node(source) {
            return Ok(Object::Null);
        }

        let new_id = (self.next_id, 0);
        self.next_id += 1;
        // Registered up front so cycles resolve to the same id.
        self.staged.insert(id, new_id);
        self.pending.push((id, new_id));
        Ok(Object::Reference(new_id))
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    obj.as_dict()
        .ok()
        .and_then(|d| d.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
        .is_some_and(|name| name == b"Page" || name == b"Pages")
}

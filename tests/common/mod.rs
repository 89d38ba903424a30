#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// PDF whose pages each show "Source page N". Pages listed in `broken`
/// point at a content stream that does not exist.
pub fn source_pdf(pages: usize, broken: &[usize]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..pages {
        let content_id: ObjectId = if broken.contains(&i) {
            (50_000 + i as u32, 0)
        } else {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 18.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Source page {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn text_content(doc: &mut Document, text: &str) -> ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 18.into()]),
            Operation::new("Td", vec![72.into(), 400.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Two pages under an intermediate `/Pages` node that carries an offset
/// CropBox `[50 100 450 700]` and `/Rotate 90`. The MediaBox comes from the
/// root node. The second page overrides the rotation with 0.
pub fn nested_tree_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let mid_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..2 {
        let content_id = text_content(&mut doc, &format!("Source page {}", i + 1));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => mid_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        };
        if i == 1 {
            page.set("Rotate", 0i64);
        }
        kids.push(doc.add_object(page).into());
    }

    doc.objects.insert(
        mid_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => kids,
            "Count" => 2i64,
            "CropBox" => vec![50.into(), 100.into(), 450.into(), 700.into()],
            "Rotate" => 90i64,
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![mid_id.into()],
            "Count" => 2i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    finish(doc, root_id)
}

/// One page carrying a FreeText annotation.
pub fn annotated_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let content_id = text_content(&mut doc, "Source page 1");
    let note_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "FreeText",
        "Rect" => vec![72.into(), 600.into(), 300.into(), 640.into()],
        "Contents" => Object::string_literal("Signed off"),
        "DA" => Object::string_literal("/Helv 12 Tf 0 g"),
        "P" => page_id,
    });
    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Annots" => vec![note_id.into()],
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );
    finish(doc, pages_id)
}

/// One page whose `/Resources/Properties/P0` starts a `/Next` chain of
/// `len` dictionaries.
pub fn reference_chain_pdf(len: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let ids: Vec<ObjectId> = (0..len).map(|_| doc.new_object_id()).collect();
    for (i, id) in ids.iter().enumerate() {
        let mut link = dictionary! { "Index" => i as i64 };
        if let Some(next) = ids.get(i + 1) {
            link.set("Next", *next);
        }
        doc.objects.insert(*id, Object::Dictionary(link));
    }

    let content_id = text_content(&mut doc, "Source page 1");
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => dictionary! {
            "Properties" => dictionary! { "P0" => ids[0] },
        },
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );
    finish(doc, pages_id)
}

/// Strings shown with `Tj` on each page of `pdf`, in page order.
pub fn shown_text_per_page(pdf: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            Content::decode(&raw)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Tj")
                .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
                .collect()
        })
        .collect()
}

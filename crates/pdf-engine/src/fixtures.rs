//! Small generated documents for tests in this workspace.

use crate::PageSize;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One US Letter page.
pub fn single_page() -> Vec<u8> {
    blank_pdf(&[PageSize::LETTER])
}

/// Serialised [`document`].
pub fn blank_pdf(sizes: &[PageSize]) -> Vec<u8> {
    save(document(sizes))
}

/// One Letter page whose trailer carries a standard security handler entry.
pub fn encrypted() -> Vec<u8> {
    let mut doc = document(&[PageSize::LETTER]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    save(doc)
}

/// Builds a document with one page per entry of `sizes`. Every page carries a
/// short line of Courier text and inherits its resources from the page tree
/// root, so consumers have to cope with inherited `/Resources`.
pub fn document(sizes: &[PageSize]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::with_capacity(sizes.len());
    for (index, size) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(72)]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("fixture page {}", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().expect("fixture content should encode");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width_pt),
                Object::Real(size.height_pt),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
            "Resources" => resources_id,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture document should serialise");
    out
}

//! Fixtures shared by the unit tests of the `pdf` module.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use super::document::PdfDocument;

/// Build a PDF with one page per marker. Each page draws its marker with
/// Helvetica; the MediaBox lives on the page tree root so pages inherit it.
pub fn create_test_pdf(markers: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::with_capacity(markers.len());
    for marker in markers {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*marker)]),
                Operation::new("ET", vec![]),
            ],
        };

        let content_bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    #[allow(clippy::cast_possible_wrap)]
    let count = kids.len() as i64;
    let page_tree = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        ),
    ]);
    doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap_or_default();
    output
}

/// The first string shown with `Tj` on a page, i.e. the marker drawn by
/// [`create_test_pdf`].
pub fn page_marker(doc: &PdfDocument, page_num: usize) -> String {
    let Ok(bytes) = doc.page_content(page_num) else {
        return String::new();
    };
    let Ok(content) = Content::decode(&bytes) else {
        return String::new();
    };

    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .find_map(|op| match op.operands.first() {
            Some(Object::String(text, _)) => Some(String::from_utf8_lossy(text).into_owned()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Encode a solid-color RGBA PNG.
pub fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, alpha]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap_or_default();
    out.into_inner()
}

/// Encode a solid-color RGB JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 90, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .unwrap_or_default();
    out.into_inner()
}

/// TrueType font used by text overlay tests.
pub fn test_font() -> &'static [u8] {
    include_bytes!("../../tests/fixtures/DejaVuSans-ExtraLight.ttf")
}

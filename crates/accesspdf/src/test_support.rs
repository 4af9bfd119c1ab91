//! In-memory fixture documents for unit tests.

use accesspdf_parse::PdfDocument;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A 2x2 RGB image XObject whose pixels are all `fill`.
pub(crate) fn image_stream(fill: u8) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2i64,
            "Height" => 2i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        vec![fill; 12],
    )
}

/// Standard Type1 font dictionary.
pub(crate) fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Build a document with one page per content entry. `resources` receives
/// the document so it can add image objects, and returns the shared
/// resource dictionary.
pub(crate) fn document_with(
    contents: &[&[u8]],
    resources: impl FnOnce(&mut Document) -> Dictionary,
) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id: ObjectId = doc.new_object_id();
    let resources = resources(&mut doc);
    let resources_id = doc.add_object(resources);
    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Pages of text with Helvetica as `/F1` and Helvetica-Bold as `/F2`.
pub(crate) fn text_pdf(contents: &[&[u8]]) -> PdfDocument {
    let doc = document_with(contents, |_| {
        dictionary! {
            "Font" => dictionary! {
                "F1" => font("Helvetica"),
                "F2" => font("Helvetica-Bold"),
            },
        }
    });
    PdfDocument::from_document(doc).expect("fixture document")
}

/// Empty pages.
pub(crate) fn blank(pages: usize) -> PdfDocument {
    let contents: Vec<&[u8]> = vec![b"".as_slice(); pages];
    text_pdf(&contents)
}

/// Text pages that also carry images `/Im1`, `/Im2`, ... filled with the
/// given byte values.
pub(crate) fn image_pdf(contents: &[&[u8]], fills: &[u8]) -> PdfDocument {
    let doc = document_with(contents, |doc| {
        let mut xobjects = Dictionary::new();
        for (i, fill) in fills.iter().enumerate() {
            let id = doc.add_object(image_stream(*fill));
            xobjects.set(format!("Im{}", i + 1), id);
        }
        dictionary! {
            "Font" => dictionary! { "F1" => font("Helvetica") },
            "XObject" => xobjects,
        }
    });
    PdfDocument::from_document(doc).expect("fixture document")
}

/// Reload a document through bytes, as a save/open cycle would.
pub(crate) fn reload(doc: &mut PdfDocument) -> PdfDocument {
    let bytes = doc.to_bytes().expect("serialize fixture");
    PdfDocument::load_mem(&bytes).expect("reload fixture")
}

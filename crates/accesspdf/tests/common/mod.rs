//! Fixture PDFs for integration tests, built in memory with lopdf.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use accesspdf::{PdfDocument, StructElement, StructTree};
use accesspdf::accesspdf_core::StructRole;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A 2x2 RGB image whose pixels are all `fill`.
fn image(fill: u8) -> Stream {
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

/// Serialize a document with one page per entry of `contents`, sharing
/// Helvetica as `/F1`, Helvetica-Bold as `/F2`, and one image per entry
/// of `image_fills` as `/Im1`, `/Im2`, ...
pub fn build_pdf(contents: &[&[u8]], image_fills: &[u8]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id: ObjectId = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let mut xobjects = Dictionary::new();
    for (i, fill) in image_fills.iter().enumerate() {
        let id = doc.add_object(image(*fill));
        xobjects.set(format!("Im{}", i + 1), id);
    }
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => regular, "F2" => bold },
        "XObject" => xobjects,
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
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
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Single column of three body paragraphs.
pub fn three_paragraphs() -> Vec<u8> {
    build_pdf(
        &[b"BT /F1 12 Tf 72 720 Td (The committee met on Tuesday to review the budget.) Tj ET \
            BT /F1 12 Tf 72 690 Td (It was agreed that the proposal should go ahead.) Tj ET \
            BT /F1 12 Tf 72 660 Td (The next meeting is planned for the spring.) Tj ET"],
        &[],
    )
}

/// A heading over body text, for full-pipeline runs.
pub fn report_with_heading() -> Vec<u8> {
    let mut content = b"BT /F2 24 Tf 72 740 Td (Annual Report) Tj ET ".to_vec();
    for i in 0..6 {
        content.extend_from_slice(
            format!(
                "BT /F1 12 Tf 72 {} Td (This is the body text of paragraph number {i}.) Tj ET ",
                700 - i * 20
            )
            .as_bytes(),
        );
    }
    build_pdf(&[&content], &[])
}

/// One ruled table of `rows` x `cols` cells below a caption line.
pub fn ruled_table(rows: usize, cols: usize) -> Vec<u8> {
    let mut content = b"BT /F1 12 Tf 72 760 Td (Quarterly figures) Tj ET ".to_vec();
    for r in 0..rows {
        for c in 0..cols {
            content.extend_from_slice(
                format!("{} {} 100 20 re S ", 72 + c * 100, 600 - r * 20).as_bytes(),
            );
        }
    }
    build_pdf(&[&content], &[])
}

/// Three distinct images drawn on one page.
pub fn three_images() -> Vec<u8> {
    build_pdf(
        &[b"q 100 0 0 100 72 600 cm /Im1 Do Q \
            q 100 0 0 100 72 450 cm /Im2 Do Q \
            q 100 0 0 100 72 300 cm /Im3 Do Q"],
        &[40, 120, 200],
    )
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn elements(doc: &PdfDocument) -> Vec<StructElement> {
    StructTree::find(doc)
        .expect("structure tree")
        .elements(doc)
}

pub fn with_role(doc: &PdfDocument, role: StructRole) -> Vec<StructElement> {
    elements(doc).into_iter().filter(|e| e.role == role).collect()
}

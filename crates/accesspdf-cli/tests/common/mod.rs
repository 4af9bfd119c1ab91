#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::{Document, Object, Stream, dictionary};

pub fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("accesspdf").unwrap();
    cmd.env_remove("ACCESSPDF_LOG");
    cmd
}

/// A single-page untagged PDF showing `text`, optionally drawing one
/// 2x2 image.
pub fn pdf_bytes(text: &str, with_image: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    };
    if with_image {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2i64,
                "Height" => 2i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
            },
            vec![0, 255, 255, 0],
        ));
        resources.set("XObject", dictionary! { "Im1" => Object::Reference(image_id) });
        content.push_str(" q 50 0 0 50 72 500 cm /Im1 Do Q");
    }

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => Object::Reference(content_id),
        "Resources" => resources,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn write_pdf(dir: &Path, name: &str, text: &str, with_image: bool) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(text, with_image)).unwrap();
    path
}

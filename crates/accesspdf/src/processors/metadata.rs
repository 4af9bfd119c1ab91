//! Document-level metadata: `/Lang`, title, `/MarkInfo` and
//! `/ViewerPreferences /DisplayDocTitle`.

use accesspdf_core::{PdfError, ProcessorResult, detect_language_or};
use accesspdf_parse::replay::shown_text;
use accesspdf_parse::{PdfDocument, dict_string, encode_text_string};
use lopdf::Object;
use tracing::{debug, warn};

use super::{Processor, ensure_catalog_flag, ensure_mark_info};
use crate::config::Config;
use crate::timebox::run_with_deadline;
use crate::xmp;

/// Text fed to language detection is cut at this many characters.
const LANGUAGE_SAMPLE_CHARS: usize = 5000;
const MAX_TITLE_CHARS: usize = 200;
pub const UNTITLED: &str = "Untitled Document";

pub struct MetadataProcessor;

impl Processor for MetadataProcessor {
    fn name(&self) -> &'static str {
        "Metadata"
    }

    fn process(&self, doc: &mut PdfDocument, config: &Config) -> Result<ProcessorResult, PdfError> {
        let mut result = ProcessorResult::new(self.name());
        let mut changes = 0;

        if !has_lang(doc)? {
            let lang = detect_language_or(&document_text(doc), &config.metadata.default_lang);
            debug!(%lang, "setting document language");
            doc.catalog_mut()?.set("Lang", Object::string_literal(lang));
            changes += 1;
        }

        if docinfo_title(doc).is_none() {
            set_title(doc, config, &mut result)?;
            changes += 1;
        }

        if ensure_mark_info(doc)? {
            changes += 1;
        }
        if ensure_catalog_flag(doc, "ViewerPreferences", "DisplayDocTitle")? {
            changes += 1;
        }

        Ok(result.with_changes(changes))
    }
}

fn has_lang(doc: &PdfDocument) -> Result<bool, PdfError> {
    let catalog = doc.catalog()?;
    Ok(dict_string(doc.inner(), catalog, b"Lang").is_some_and(|l| !l.trim().is_empty()))
}

/// Non-empty `/Title` of the information dictionary.
pub fn docinfo_title(doc: &PdfDocument) -> Option<String> {
    let info = doc.info_dict()?;
    dict_string(doc.inner(), info, b"Title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Shown text of every page, in stream order, capped for detection.
fn document_text(doc: &PdfDocument) -> String {
    let mut text = String::new();
    for index in 0..doc.page_count() {
        let Ok(ops) = doc.page_operators(index) else {
            continue;
        };
        for op in ops.iter().filter(|o| o.shows_text()) {
            text.push_str(&shown_text(op));
            text.push(' ');
            if text.chars().count() >= LANGUAGE_SAMPLE_CHARS {
                return text.chars().take(LANGUAGE_SAMPLE_CHARS).collect();
            }
        }
    }
    text
}

/// First shown string longer than two characters, cut to 200 characters.
pub fn derive_title(doc: &PdfDocument) -> String {
    for index in 0..doc.page_count() {
        let Ok(ops) = doc.page_operators(index) else {
            continue;
        };
        for op in ops.iter().filter(|o| o.shows_text()) {
            let text = shown_text(op);
            let text = text.trim();
            if text.chars().count() > 2 {
                return text.chars().take(MAX_TITLE_CHARS).collect();
            }
        }
    }
    UNTITLED.to_string()
}

/// Write the information-dictionary title, then try to mirror it into the
/// XMP packet under a deadline. An existing XMP title wins over a derived
/// one and is left in place.
fn set_title(doc: &mut PdfDocument, config: &Config, result: &mut ProcessorResult) -> Result<(), PdfError> {
    let packet = xmp::read_packet(doc);
    let xmp_title = packet
        .as_ref()
        .and_then(|(_, bytes)| std::str::from_utf8(bytes).ok())
        .and_then(xmp::read_title);

    let title = xmp_title.clone().unwrap_or_else(|| derive_title(doc));
    doc.info_dict_mut()?.set("Title", encode_text_string(&title));
    if xmp_title.is_some() {
        return Ok(());
    }

    let (packet_id, bytes) = match packet {
        Some((id, bytes)) => (Some(id), Some(bytes)),
        None => (None, None),
    };
    let worker_title = title.clone();
    let timeout = config.metadata.xmp_timeout();
    match run_with_deadline("accesspdf-xmp", timeout, move || {
        xmp::retitle_packet(bytes, &worker_title)
    }) {
        Ok(Ok(xml)) => xmp::write_packet(doc, packet_id, xml)?,
        Ok(Err(e)) => {
            warn!(error = %e, "XMP title not updated");
            result.warn(format!("XMP metadata not updated: {e}"));
        }
        Err(e) => {
            warn!(error = %e, "XMP title update abandoned");
            result.warn(format!("XMP metadata update {e}; document info title was set"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{blank, text_pdf};
    use lopdf::{Stream, dictionary};

    fn run(doc: &mut PdfDocument) -> ProcessorResult {
        MetadataProcessor.process(doc, &Config::default()).unwrap()
    }

    fn catalog_string(doc: &PdfDocument, key: &[u8]) -> Option<String> {
        dict_string(doc.inner(), doc.catalog().unwrap(), key)
    }

    #[test]
    fn sets_all_metadata_once() {
        let mut doc = text_pdf(&[b"BT /F1 24 Tf 72 700 Td (Quarterly Review) Tj ET"]);
        let result = run(&mut doc);
        assert!(result.success);
        assert_eq!(result.changes_made, 4);
        assert_eq!(catalog_string(&doc, b"Lang").as_deref(), Some("en-US"));
        assert_eq!(docinfo_title(&doc).as_deref(), Some("Quarterly Review"));

        let (_, packet) = xmp::read_packet(&doc).unwrap();
        let xml = String::from_utf8(packet).unwrap();
        assert_eq!(xmp::read_title(&xml).as_deref(), Some("Quarterly Review"));

        let prefs = doc.catalog().unwrap().get(b"ViewerPreferences").unwrap();
        assert_eq!(
            doc.resolve_dict(prefs).unwrap().get(b"DisplayDocTitle").unwrap(),
            &Object::Boolean(true)
        );

        assert_eq!(run(&mut doc).changes_made, 0);
    }

    #[test]
    fn french_text_is_detected() {
        let mut doc = text_pdf(&[
            b"BT /F1 12 Tf (Le rapport annuel de la soci\xe9t\xe9 est publi\xe9 pour les membres et le public) Tj ET",
        ]);
        run(&mut doc);
        assert_eq!(catalog_string(&doc, b"Lang").as_deref(), Some("fr-FR"));
    }

    #[test]
    fn existing_title_and_lang_are_kept() {
        let mut doc = text_pdf(&[b"BT /F1 12 Tf (Something else entirely) Tj ET"]);
        doc.catalog_mut()
            .unwrap()
            .set("Lang", Object::string_literal("de-DE"));
        doc.info_dict_mut()
            .unwrap()
            .set("Title", Object::string_literal("Kept"));
        let result = run(&mut doc);
        assert_eq!(result.changes_made, 2);
        assert_eq!(catalog_string(&doc, b"Lang").as_deref(), Some("de-DE"));
        assert_eq!(docinfo_title(&doc).as_deref(), Some("Kept"));
    }

    #[test]
    fn short_strings_do_not_become_the_title() {
        let doc = text_pdf(&[b"BT /F1 12 Tf (1) Tj (ab) Tj (Introduction) Tj ET"]);
        assert_eq!(derive_title(&doc), "Introduction");
        assert_eq!(derive_title(&blank(1)), UNTITLED);
    }

    #[test]
    fn long_title_is_truncated() {
        let long = format!("BT /F1 12 Tf ({}) Tj ET", "x".repeat(300));
        let doc = text_pdf(&[long.as_bytes()]);
        assert_eq!(derive_title(&doc).chars().count(), 200);
    }

    #[test]
    fn xmp_title_is_preferred_and_kept() {
        let mut doc = blank(1);
        let packet = xmp::new_packet("From XMP");
        let id = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            packet.clone().into_bytes(),
        ));
        doc.catalog_mut().unwrap().set("Metadata", id);
        run(&mut doc);
        assert_eq!(docinfo_title(&doc).as_deref(), Some("From XMP"));
        let (_, bytes) = xmp::read_packet(&doc).unwrap();
        assert_eq!(bytes, packet.into_bytes());
    }

    #[test]
    fn malformed_xmp_is_a_warning() {
        let mut doc = text_pdf(&[b"BT /F1 12 Tf (Title text) Tj ET"]);
        let id = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            b"<not-xmp/>".to_vec(),
        ));
        doc.catalog_mut().unwrap().set("Metadata", id);
        let result = run(&mut doc);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("XMP"));
        assert_eq!(docinfo_title(&doc).as_deref(), Some("Title text"));
    }
}

//! Read-only accessibility analysis.

use std::path::Path;

use accesspdf_core::{AccessibilityIssue, AnalysisResult, PdfError, Severity, StructRole};
use accesspdf_parse::{PdfDocument, dict_string};
use lopdf::Object;
use tracing::warn;

use crate::processors::docinfo_title;
use crate::struct_tree::StructTree;

/// Open `path` and analyse it.
pub fn analyze_file(path: impl AsRef<Path>) -> Result<AnalysisResult, PdfError> {
    let doc = PdfDocument::load(path.as_ref())?;
    Ok(analyze(&doc))
}

/// Describe the document's structure, metadata and images, and list the
/// accessibility problems found. The document is not modified.
pub fn analyze(doc: &PdfDocument) -> AnalysisResult {
    let mut result = AnalysisResult {
        page_count: doc.page_count(),
        is_tagged: is_marked(doc) && StructTree::is_tagged(doc),
        lang: doc
            .catalog()
            .ok()
            .and_then(|c| dict_string(doc.inner(), c, b"Lang"))
            .filter(|l| !l.trim().is_empty()),
        title: docinfo_title(doc),
        ..AnalysisResult::default()
    };

    if let Some(tree) = StructTree::find(doc) {
        let elements = tree.elements(doc);
        result.figures_without_alt = elements
            .iter()
            .filter(|e| e.role == StructRole::Figure && e.alt_text.is_none())
            .count();
        result.role_counts = tree.role_counts(doc);
    }

    match doc.document_images() {
        Ok(images) => result.images = images,
        Err(e) => {
            warn!(error = %e, "image inventory failed");
            result.issues.push(AccessibilityIssue::new(
                "image-extraction",
                Severity::Warning,
                "Failed to extract images from PDF.",
            ));
        }
    }

    build_issues(&mut result);
    result
}

/// `/MarkInfo /Marked true` on the catalog.
fn is_marked(doc: &PdfDocument) -> bool {
    doc.catalog()
        .ok()
        .and_then(|c| c.get(b"MarkInfo").ok())
        .and_then(|m| doc.resolve_dict(m))
        .and_then(|m| m.get(b"Marked").ok())
        .is_some_and(|marked| matches!(doc.resolve(marked), Object::Boolean(true)))
}

fn build_issues(result: &mut AnalysisResult) {
    if !result.is_tagged {
        result.issues.push(AccessibilityIssue::new(
            "tagged-pdf",
            Severity::Error,
            "PDF is not tagged. Screen readers cannot interpret the document structure.",
        ));
    }
    if result.lang.is_none() {
        result.issues.push(AccessibilityIssue::new(
            "document-lang",
            Severity::Error,
            "Document language is not set.",
        ));
    }
    if result.title.is_none() {
        result.issues.push(AccessibilityIssue::new(
            "document-title",
            Severity::Warning,
            "Document title is not set in metadata.",
        ));
    }

    // Untagged images have no Figure to carry alt text at all.
    let missing = if result.is_tagged {
        result.figures_without_alt
    } else {
        result.images.len()
    };
    if missing > 0 {
        result.issues.push(AccessibilityIssue::new(
            "image-alt-text",
            Severity::Error,
            format!("{missing} image(s) missing alt text."),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::processors::{MetadataProcessor, Processor, TaggerProcessor};
    use crate::test_support::{image_pdf, text_pdf};

    fn rules(result: &AnalysisResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.rule.as_str()).collect()
    }

    #[test]
    fn untagged_document_reports_every_rule() {
        let doc = image_pdf(&[b"BT /F1 12 Tf (Hi) Tj ET /Im1 Do /Im2 Do"], &[10, 20]);
        let result = analyze(&doc);
        assert_eq!(result.page_count, 1);
        assert!(!result.is_tagged);
        assert_eq!(result.images.len(), 2);
        assert_eq!(
            rules(&result),
            vec!["tagged-pdf", "document-lang", "document-title", "image-alt-text"]
        );
        assert!(result.issues[3].message.starts_with("2 image(s)"));
        assert!(result.has_errors());
    }

    #[test]
    fn remediated_document_is_clean_except_figures() {
        let mut doc = image_pdf(&[b"BT /F1 12 Tf (Quarterly report) Tj ET /Im1 Do"], &[10]);
        let config = Config::default();
        TaggerProcessor.process(&mut doc, &config).unwrap();
        MetadataProcessor.process(&mut doc, &config).unwrap();

        let result = analyze(&doc);
        assert!(result.is_tagged);
        assert_eq!(result.lang.as_deref(), Some("en-US"));
        assert_eq!(result.title.as_deref(), Some("Quarterly report"));
        assert_eq!(result.role_count("P"), 1);
        assert_eq!(result.role_count("Figure"), 1);
        assert_eq!(result.figures_without_alt, 1);
        assert_eq!(rules(&result), vec!["image-alt-text"]);
    }

    #[test]
    fn figures_with_alt_are_not_reported() {
        let mut doc = image_pdf(&[b"/Im1 Do"], &[10]);
        TaggerProcessor.process(&mut doc, &Config::default()).unwrap();
        let tree = StructTree::find(&doc).unwrap();
        let figure = tree.elements(&doc)[1].id;
        StructTree::set_alt_text(&mut doc, figure, "A bar chart").unwrap();

        let result = analyze(&doc);
        assert_eq!(result.figures_without_alt, 0);
        assert!(!rules(&result).contains(&"image-alt-text"));
    }

    #[test]
    fn marked_flag_alone_is_not_tagged() {
        let mut doc = text_pdf(&[b"BT /F1 12 Tf (Hi) Tj ET"]);
        crate::processors::ensure_mark_info(&mut doc).unwrap();
        assert!(!analyze(&doc).is_tagged);
    }
}

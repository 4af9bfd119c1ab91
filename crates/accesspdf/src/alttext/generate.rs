//! Fill in AI drafts for sidecar entries awaiting review.

use accesspdf_core::SidecarFile;
use accesspdf_parse::PdfDocument;
use accesspdf_parse::replay::shown_text;
use tracing::{debug, info, warn};

use super::extract::{extract_by_hash, prepare_for_provider};
use crate::config::AiConfig;
use crate::processors::docinfo_title;
use crate::providers::{AltTextProvider, AltTextRequest};

/// Characters of page text sent along as context.
const CONTEXT_CHARS: usize = 500;

/// Outcome of [`generate_drafts`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftReport {
    pub drafted: usize,
    /// Entries the provider judged decorative. Their status stays
    /// `needs_review`; a reviewer decides.
    pub decorative: usize,
    /// Ids of the entries counted in `decorative`.
    pub suggested_decorative: Vec<String>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Ask `provider` for a draft for every entry with status `needs_review`
/// and an empty draft. Reviewed entries are never touched, and a failure
/// on one image only records a warning.
pub fn generate_drafts(
    doc: &PdfDocument,
    sidecar: &mut SidecarFile,
    provider: &dyn AltTextProvider,
    config: &AiConfig,
) -> DraftReport {
    let mut report = DraftReport::default();
    let pending: Vec<String> = sidecar.pending_drafts().map(|e| e.hash.clone()).collect();
    if pending.is_empty() {
        return report;
    }
    if let Some(problem) = provider.preflight() {
        warn!(provider = provider.name(), %problem, "provider preflight failed");
        report.warnings.push(format!("{}: {problem}", provider.name()));
        report.skipped = pending.len();
        return report;
    }

    let title = docinfo_title(doc).unwrap_or_default();
    for hash in pending {
        let Some(entry) = sidecar.get_entry_mut(&hash) else {
            continue;
        };
        let image = match extract_by_hash(doc, &hash) {
            Ok(Some(image)) => image,
            Ok(None) => {
                report.skipped += 1;
                report.warnings.push(format!("{}: image not found in document", entry.id));
                continue;
            }
            Err(e) => {
                report.skipped += 1;
                report.warnings.push(format!("{}: {e}", entry.id));
                continue;
            }
        };
        let png = match prepare_for_provider(&image, config.max_image_dim) {
            Ok(png) => png,
            Err(e) => {
                report.skipped += 1;
                report.warnings.push(format!("{}: {e}", entry.id));
                continue;
            }
        };

        let request = AltTextRequest {
            caption: entry.caption.clone(),
            surrounding_text: page_text(doc, entry.page.saturating_sub(1)),
            page: entry.page,
            document_title: title.clone(),
            ..AltTextRequest::png(png)
        };
        let result = provider.generate(&request);
        if let Some(error) = result.error {
            report.skipped += 1;
            report.warnings.push(format!("{}: {error}", entry.id));
            continue;
        }
        let draft = result.alt_text.trim();
        if result.is_decorative {
            debug!(id = %entry.id, "provider suggests decorative");
            if !draft.is_empty() {
                entry.ai_draft = draft.to_string();
            }
            report.decorative += 1;
            report.suggested_decorative.push(entry.id.clone());
            continue;
        }
        if draft.is_empty() {
            debug!(id = %entry.id, "provider returned no text");
            report.skipped += 1;
            continue;
        }
        entry.ai_draft = draft.to_string();
        report.drafted += 1;
    }
    info!(
        provider = provider.name(),
        drafted = report.drafted,
        skipped = report.skipped,
        "alt-text drafts generated"
    );
    report
}

/// Leading text shown on page `index`, whitespace collapsed.
fn page_text(doc: &PdfDocument, index: usize) -> String {
    let Ok(ops) = doc.page_operators(index) else {
        return String::new();
    };
    let joined: Vec<String> = ops
        .iter()
        .map(shown_text)
        .filter(|t| !t.trim().is_empty())
        .collect();
    let text = joined.join(" ");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(CONTEXT_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use accesspdf_core::AltTextStatus;
    use crate::providers::{AltTextResult, NoOpProvider, ProviderError};
    use crate::test_support::image_pdf;
    use std::sync::Mutex;

    /// Answers from a script and records each request.
    struct Scripted {
        answers: Mutex<Vec<AltTextResult>>,
        seen: Mutex<Vec<AltTextRequest>>,
    }

    impl Scripted {
        fn new(mut answers: Vec<AltTextResult>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl AltTextProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, request: &AltTextRequest) -> AltTextResult {
            self.seen.lock().unwrap().push(request.clone());
            self.answers.lock().unwrap().pop().unwrap_or_default()
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn text(alt: &str) -> AltTextResult {
        AltTextResult {
            alt_text: alt.to_string(),
            confidence: 0.8,
            ..AltTextResult::default()
        }
    }

    fn sidecar_for(doc: &PdfDocument) -> SidecarFile {
        let mut sidecar = SidecarFile::new("doc.pdf");
        for image in doc.document_images().unwrap() {
            sidecar.upsert(&image);
        }
        sidecar
    }

    #[test]
    fn drafts_fill_pending_entries() {
        let doc = image_pdf(&[b"BT /F1 12 Tf (Sales by region) Tj ET /Im1 Do /Im2 Do"], &[10, 20]);
        let mut sidecar = sidecar_for(&doc);
        let provider = Scripted::new(vec![text(" A map of regions "), text("A bar chart")]);

        let report = generate_drafts(&doc, &mut sidecar, &provider, &AiConfig::default());
        assert_eq!(report.drafted, 2);
        assert!(report.warnings.is_empty());
        assert_eq!(sidecar.images[0].ai_draft, "A map of regions");
        assert_eq!(sidecar.images[1].ai_draft, "A bar chart");
        assert!(sidecar.images.iter().all(|e| e.status == AltTextStatus::NeedsReview));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].mime_type, "image/png");
        assert_eq!(seen[0].page, 1);
        assert!(seen[0].surrounding_text.contains("Sales by region"));
        assert!(seen[0].image.starts_with(b"\x89PNG"));
    }

    #[test]
    fn reviewed_entries_are_not_sent() {
        let doc = image_pdf(&[b"/Im1 Do /Im2 Do"], &[10, 20]);
        let mut sidecar = sidecar_for(&doc);
        sidecar.images[0].status = AltTextStatus::Approved;
        sidecar.images[0].alt_text = "Logo".to_string();
        let provider = Scripted::new(vec![text("Second")]);

        let report = generate_drafts(&doc, &mut sidecar, &provider, &AiConfig::default());
        assert_eq!(report.drafted, 1);
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
        assert!(sidecar.images[0].ai_draft.is_empty());
        assert_eq!(sidecar.images[1].ai_draft, "Second");
    }

    #[test]
    fn failures_become_warnings() {
        let doc = image_pdf(&[b"/Im1 Do /Im2 Do"], &[10, 20]);
        let mut sidecar = sidecar_for(&doc);
        let provider = Scripted::new(vec![
            AltTextResult::failed(ProviderError::Failed("timeout".into())),
            AltTextResult {
                is_decorative: true,
                ..AltTextResult::default()
            },
        ]);

        let report = generate_drafts(&doc, &mut sidecar, &provider, &AiConfig::default());
        assert_eq!(report.drafted, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.decorative, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].ends_with("timeout"));
        assert_eq!(report.suggested_decorative, vec![sidecar.images[1].id.clone()]);
    }

    #[test]
    fn decorative_suggestion_still_needs_review() {
        let doc = image_pdf(&[b"/Im1 Do"], &[10]);
        let mut sidecar = sidecar_for(&doc);
        let provider = Scripted::new(vec![AltTextResult {
            alt_text: "Divider line".into(),
            is_decorative: true,
            ..AltTextResult::default()
        }]);

        let report = generate_drafts(&doc, &mut sidecar, &provider, &AiConfig::default());
        assert_eq!(report.decorative, 1);
        assert_eq!(sidecar.images[0].status, AltTextStatus::NeedsReview);
        assert_eq!(sidecar.images[0].ai_draft, "Divider line");
        assert!(sidecar.actionable().next().is_none());
    }

    #[test]
    fn noop_provider_leaves_drafts_empty() {
        let doc = image_pdf(&[b"/Im1 Do"], &[10]);
        let mut sidecar = sidecar_for(&doc);
        let report = generate_drafts(&doc, &mut sidecar, &NoOpProvider, &AiConfig::default());
        assert_eq!(report.drafted, 0);
        assert_eq!(report.skipped, 1);
        assert!(sidecar.images[0].ai_draft.is_empty());
    }
}

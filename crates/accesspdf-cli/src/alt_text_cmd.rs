use std::path::Path;

use accesspdf::accesspdf_core::AltTextStatus;
use accesspdf::alttext::{SidecarStore, generate_drafts};
use accesspdf::providers::provider_from_config;
use accesspdf::{AltTextProvider, Config, PdfDocument};

use crate::shared::require_file;

pub fn stats(sidecar: &Path) -> Result<(), i32> {
    require_file(sidecar)?;
    let file = SidecarStore::load(sidecar).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    let stats = file.stats();
    println!("Document: {}", file.document);
    println!("Total:    {}", stats.total);
    for status in AltTextStatus::ALL {
        let count = match status {
            AltTextStatus::NeedsReview => stats.needs_review,
            AltTextStatus::Approved => stats.approved,
            AltTextStatus::Decorative => stats.decorative,
        };
        println!("{:<13} {count}", format!("{status}:"));
    }
    Ok(())
}

pub fn generate(file: &Path, sidecar: Option<&Path>, config: &Config) -> Result<(), i32> {
    require_file(file)?;
    let fail = |e: accesspdf::PdfError| {
        eprintln!("Error: {e}");
        1
    };
    let provider = provider_from_config(&config.ai).map_err(fail)?;
    let doc = PdfDocument::load(file).map_err(|e| fail(e.into()))?;

    let (mut sidecar_file, path) = match sidecar {
        Some(path) => (SidecarStore::load(path).map_err(fail)?, path.to_path_buf()),
        None => SidecarStore::load_or_create(file).map_err(fail)?,
    };
    for image in doc.document_images().map_err(|e| fail(e.into()))? {
        sidecar_file.upsert(&image);
    }

    let report = generate_drafts(&doc, &mut sidecar_file, &provider, &config.ai);
    SidecarStore::save(&sidecar_file, &path).map_err(fail)?;
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    for id in &report.suggested_decorative {
        println!("  {id}: provider suggests decorative; review before approving");
    }
    println!(
        "Drafted {} ({} suggested decorative, {} skipped) using {}; sidecar: {}",
        report.drafted,
        report.decorative,
        report.skipped,
        provider.name(),
        path.display()
    );
    Ok(())
}

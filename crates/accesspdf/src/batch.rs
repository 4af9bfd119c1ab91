//! Remediating a directory of PDFs in parallel.
//!
//! Documents are independent, so each one runs its own [`Pipeline::run`]
//! on a rayon worker. A document that fails to open, fails to save, or
//! panics is recorded in [`BatchResult::failed`] and the rest continue.

use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use accesspdf_core::{BatchResult, PdfError, RemediationResult};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::alttext::SidecarStore;
use crate::pipeline::{Pipeline, panic_message};

/// Output subdirectory used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "accessible";

/// One planned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Reviewed sidecar to inject, when one exists for this document.
    pub alt_text: Option<PathBuf>,
}

/// Where a batch reads from and writes to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Defaults to `<dir>/accessible`.
    pub output_dir: Option<PathBuf>,
    /// Directory searched for `<stem>.alttext.yaml` files.
    pub alt_text_dir: Option<PathBuf>,
    pub recursive: bool,
    /// Worker threads; 0 uses one per core.
    pub workers: usize,
}

/// List the PDFs under `dir` (sorted) and the output path for each:
/// `<output_dir>/<relative dir>/<stem><suffix>.pdf`. The output
/// directory itself is never scanned.
pub fn plan_batch(dir: &Path, options: &BatchOptions, suffix: &str) -> Result<Vec<BatchItem>, PdfError> {
    if !dir.is_dir() {
        return Err(PdfError::IoError(format!("not a directory: {}", dir.display())));
    }
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| dir.join(DEFAULT_OUTPUT_DIR));
    let skip = output_dir.canonicalize().ok();

    let mut inputs = Vec::new();
    collect_pdfs(dir, options.recursive, skip.as_deref(), &mut inputs)?;
    inputs.sort();

    Ok(inputs
        .into_iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative = input
                .parent()
                .and_then(|p| p.strip_prefix(dir).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let output = output_dir.join(&relative).join(format!("{stem}{suffix}.pdf"));
            let alt_text = options.alt_text_dir.as_ref().and_then(|alt_dir| {
                let candidate = SidecarStore::path_for(&alt_dir.join(&relative).join(format!("{stem}.pdf")));
                candidate.is_file().then_some(candidate)
            });
            BatchItem {
                input,
                output,
                alt_text,
            }
        })
        .collect())
}

fn collect_pdfs(dir: &Path, recursive: bool, skip: Option<&Path>, out: &mut Vec<PathBuf>) -> Result<(), PdfError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive && skip != path.canonicalize().ok().as_deref() {
                collect_pdfs(&path, recursive, skip, out)?;
            }
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Run `items` on a pool of `workers` threads. Results keep plan order.
pub fn run_batch(pipeline: &Pipeline, items: &[BatchItem], workers: usize) -> Result<BatchResult, PdfError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PdfError::Other(format!("cannot start worker pool: {e}")))?;
    info!(documents = items.len(), workers = pool.current_num_threads(), "starting batch");

    let outcomes: Vec<Result<RemediationResult, String>> =
        pool.install(|| items.par_iter().map(|item| run_one(pipeline, item)).collect());

    let mut batch = BatchResult::default();
    for (item, outcome) in items.iter().zip(outcomes) {
        match outcome {
            Ok(result) => batch.results.push(result),
            Err(message) => {
                warn!(input = %item.input.display(), error = %message, "document failed");
                batch.failed.push((item.input.clone(), message));
            }
        }
    }
    info!(succeeded = batch.succeeded(), failed = batch.failed.len(), "batch finished");
    Ok(batch)
}

/// Plan and run a whole directory.
pub fn process_directory(pipeline: &Pipeline, dir: &Path, options: &BatchOptions) -> Result<BatchResult, PdfError> {
    let items = plan_batch(dir, options, &pipeline.config().output.suffix)?;
    run_batch(pipeline, &items, options.workers)
}

fn run_one(pipeline: &Pipeline, item: &BatchItem) -> Result<RemediationResult, String> {
    let work = || pipeline.run(&item.input, &item.output, item.alt_text.as_deref());
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
    }
}

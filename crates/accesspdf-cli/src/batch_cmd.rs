use std::path::PathBuf;

use accesspdf::{BatchOptions, Config, Pipeline, plan_batch, run_batch};

/// Exit code when at least one document failed.
pub const BATCH_FAILURE: i32 = 2;

pub fn run(dir: PathBuf, options: BatchOptions, config: Config) -> Result<(), i32> {
    if !dir.is_dir() {
        eprintln!("Error: not a directory: {}", dir.display());
        return Err(1);
    }
    let items = plan_batch(&dir, &options, &config.output.suffix).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    if items.is_empty() {
        println!("No PDF files found in {}", dir.display());
        return Ok(());
    }

    let pipeline = Pipeline::new(config);
    let batch = run_batch(&pipeline, &items, options.workers).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;

    for result in &batch.results {
        let status = if result.all_succeeded() { "ok" } else { "partial" };
        println!(
            "{status:<8} {} -> {} ({} change(s))",
            result.source_path.display(),
            result.output_path.display(),
            result.total_changes()
        );
    }
    for (path, error) in &batch.failed {
        println!("failed   {}: {error}", path.display());
    }
    println!();
    println!(
        "Total: {}  Succeeded: {}  Failed: {}",
        batch.total(),
        batch.succeeded(),
        batch.failed.len()
    );

    if batch.failed.is_empty() {
        Ok(())
    } else {
        Err(BATCH_FAILURE)
    }
}

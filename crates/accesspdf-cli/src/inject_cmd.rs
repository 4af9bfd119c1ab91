use std::path::Path;

use accesspdf::{Config, default_output_path, inject_file};

use crate::shared::require_file;

pub fn run(file: &Path, sidecar: &Path, output: Option<&Path>, config: &Config) -> Result<(), i32> {
    require_file(file)?;
    require_file(sidecar)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(file, &config.output.suffix));

    let report = inject_file(file, sidecar, &output).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    println!(
        "Injected {} alt text(s) ({} existing figure(s), {} new) into {}",
        report.injected(),
        report.matched_existing,
        report.created,
        output.display()
    );
    Ok(())
}

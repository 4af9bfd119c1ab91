use std::path::Path;

use accesspdf::{Config, Pipeline, RemediationResult, default_output_path};

use crate::shared::require_file;

pub fn run(file: &Path, output: Option<&Path>, alt_text: Option<&Path>, config: Config) -> Result<(), i32> {
    require_file(file)?;
    if let Some(sidecar) = alt_text {
        require_file(sidecar)?;
    }
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(file, &config.output.suffix));

    let result = Pipeline::new(config)
        .run(file, &output, alt_text)
        .map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?;
    print_summary(&result);
    Ok(())
}

pub fn print_summary(result: &RemediationResult) {
    for r in &result.processor_results {
        let status = if r.success { "ok" } else { "FAILED" };
        print!("{:<16} {status:<6} {} change(s)", r.processor_name, r.changes_made);
        if let Some(ref error) = r.error {
            print!("  {error}");
        }
        println!();
    }
    for warning in result.warnings() {
        println!("  warning: {warning}");
    }
    println!();
    println!("Output:  {}", result.output_path.display());
    if let Some(ref sidecar) = result.sidecar_path {
        println!("Sidecar: {}", sidecar.display());
    }
    println!("Total changes: {}", result.total_changes());
}

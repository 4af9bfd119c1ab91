use std::path::Path;

use accesspdf::accesspdf_core::Severity;
use accesspdf::analyze_file;

use crate::cli::ReportFormat;
use crate::shared::require_file;

pub fn run(file: &Path, format: ReportFormat) -> Result<(), i32> {
    require_file(file)?;
    let analysis = analyze_file(file).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })?;

    match format {
        ReportFormat::Text => {
            println!("File:    {}", file.display());
            println!("Pages:   {}", analysis.page_count);
            println!("Tagged:  {}", if analysis.is_tagged { "yes" } else { "no" });
            println!("Lang:    {}", analysis.lang.as_deref().unwrap_or("(not set)"));
            println!("Title:   {}", analysis.title.as_deref().unwrap_or("(not set)"));
            println!("Images:  {}", analysis.images.len());
            if !analysis.role_counts.is_empty() {
                let roles: Vec<String> = analysis
                    .role_counts
                    .iter()
                    .map(|(role, n)| format!("{role}={n}"))
                    .collect();
                println!("Tags:    {}", roles.join(", "));
            }
            println!();
            if analysis.issues.is_empty() {
                println!("No issues found.");
            } else {
                for issue in &analysis.issues {
                    let severity = match issue.severity {
                        Severity::Error => "ERROR",
                        Severity::Warning => "WARNING",
                        Severity::Info => "INFO",
                    };
                    print!("[{severity}] {}: {}", issue.rule, issue.message);
                    if let Some(page) = issue.page {
                        print!(" (page {page})");
                    }
                    println!();
                }
                let errors = analysis
                    .issues
                    .iter()
                    .filter(|i| i.severity == Severity::Error)
                    .count();
                println!();
                println!(
                    "Summary: {errors} error(s), {} other issue(s)",
                    analysis.issues.len() - errors
                );
            }
        }
        ReportFormat::Json => {
            let output = serde_json::json!({
                "file": file.display().to_string(),
                "analysis": analysis,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    return Err(1);
                }
            }
        }
    }
    Ok(())
}

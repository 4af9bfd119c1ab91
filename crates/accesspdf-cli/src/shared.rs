use std::path::Path;

use accesspdf::Config;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter, e.g. `accesspdf=debug`.
pub const LOG_ENV: &str = "ACCESSPDF_LOG";

/// Install the stderr log subscriber. `ACCESSPDF_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: Option<&Path>) -> Result<Config, i32> {
    Config::load(path).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })
}

/// Fail with exit code 1 when `file` does not exist.
pub fn require_file(file: &Path) -> Result<(), i32> {
    if file.is_file() {
        Ok(())
    } else {
        eprintln!("Error: file not found: {}", file.display());
        Err(1)
    }
}

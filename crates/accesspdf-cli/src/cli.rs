use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Check and repair the accessibility of PDF documents.
#[derive(Debug, Parser)]
#[command(name = "accesspdf", about, version)]
pub struct Cli {
    /// Configuration file (default: ./accesspdf.yaml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report accessibility problems without changing the file
    Check {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Write a remediated copy of a PDF
    Fix {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path. Default: <stem>_accessible.pdf next to the input
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Reviewed alt-text sidecar to inject
        #[arg(long, value_name = "YAML")]
        alt_text: Option<PathBuf>,
    },

    /// Remediate every PDF in a directory
    Batch {
        /// Directory containing PDF files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output directory. Default: <DIR>/accessible
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Directory with <stem>.alttext.yaml sidecars to inject
        #[arg(long, value_name = "DIR")]
        alt_text_dir: Option<PathBuf>,

        /// Search subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Worker threads (default: from config, 0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Write reviewed alt text into a PDF without other repairs
    Inject {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Reviewed alt-text sidecar
        #[arg(long, value_name = "YAML")]
        sidecar: PathBuf,

        /// Output path. Default: <stem>_accessible.pdf next to the input
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Work with alt-text sidecar files
    #[command(name = "alt-text", subcommand)]
    AltText(AltTextCommand),
}

#[derive(Debug, Subcommand)]
pub enum AltTextCommand {
    /// Count sidecar entries by review status
    Stats {
        /// Sidecar file
        #[arg(value_name = "YAML")]
        sidecar: PathBuf,
    },

    /// Draft alt text for pending images with the configured provider
    Generate {
        /// PDF file whose sidecar should be filled
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Sidecar to update. Default: <FILE stem>.alttext.yaml
        #[arg(long, value_name = "YAML")]
        sidecar: Option<PathBuf>,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

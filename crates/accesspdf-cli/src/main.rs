mod alt_text_cmd;
mod batch_cmd;
mod check_cmd;
mod cli;
mod fix_cmd;
mod inject_cmd;
mod shared;

use accesspdf::BatchOptions;
use clap::Parser;
use cli::{AltTextCommand, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    shared::init_logging(cli.verbose);

    let result = run(cli);
    if let Err(code) = result {
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<(), i32> {
    let config = shared::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Check { ref file, format } => check_cmd::run(file, format),
        Commands::Fix {
            ref file,
            ref output,
            ref alt_text,
        } => fix_cmd::run(file, output.as_deref(), alt_text.as_deref(), config),
        Commands::Batch {
            dir,
            output_dir,
            alt_text_dir,
            recursive,
            workers,
        } => {
            let options = BatchOptions {
                output_dir,
                alt_text_dir,
                recursive,
                workers: workers.unwrap_or(config.batch.workers),
            };
            batch_cmd::run(dir, options, config)
        }
        Commands::Inject {
            ref file,
            ref sidecar,
            ref output,
        } => inject_cmd::run(file, sidecar, output.as_deref(), &config),
        Commands::AltText(AltTextCommand::Stats { ref sidecar }) => alt_text_cmd::stats(sidecar),
        Commands::AltText(AltTextCommand::Generate {
            ref file,
            ref sidecar,
        }) => alt_text_cmd::generate(file, sidecar.as_deref(), &config),
    }
}

//! bindery - flat HTML to EPUB converter

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(name = "bindery")]
#[command(version, about = "Convert a flat HTML document into an EPUB book", long_about = None)]
#[command(after_help = "EXAMPLES:
    bindery                  Use bindery.json in the current directory
    bindery travel.json      Use an explicit settings file
    bindery -q travel.json   Suppress progress output")]
struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(value_name = "CONFIG", default_value = "bindery.json")]
    config: PathBuf,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.quiet {
        println!("bindery {}", env!("CARGO_PKG_VERSION"));
        println!("settings: {}", cli.config.display());
    }

    match bindery::convert(&cli.config) {
        Ok(summary) => {
            if !cli.quiet {
                if !summary.has_cover {
                    println!("note: no cover image found");
                }
                if !summary.has_preface {
                    println!("note: no preface included");
                }
                println!(
                    "done: {} written with {} chapters",
                    summary.output.display(),
                    summary.chapters
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

//! extract_rooms: pull reservation records out of saved calendar pages.
//!
//! Each `<name>.html` argument produces `<name>` beside it (other names get a
//! `_processed` suffix), one tab-separated record per line.

use anyhow::{bail, Result};
use clap::Parser;
use roomledger::{config, pipeline::process_html_file};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Extract room reservations from calendar HTML")]
struct Args {
    /// Date used for pages that carry none, YYYY/MM/DD. Defaults to today.
    #[arg(short, long)]
    date: Option<String>,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let missing: Vec<&PathBuf> = args.files.iter().filter(|p| !p.is_file()).collect();
    if !missing.is_empty() {
        bail!("files not found: {:?}", missing);
    }
    let date = args.date.unwrap_or_else(config::today);

    info!(files = args.files.len(), "extracting");
    let mut total = 0usize;
    let mut failed = 0usize;
    for file in &args.files {
        match process_html_file(file, &date) {
            Ok(processed) => {
                println!(
                    "{} -> {} ({} records)",
                    file.display(),
                    processed.intermediate.display(),
                    processed.records.len()
                );
                total += processed.records.len();
            }
            Err(e) => {
                error!(path = %file.display(), "{:#}", e);
                failed += 1;
            }
        }
    }

    println!(
        "{} files, {} records extracted",
        args.files.len() - failed,
        total
    );
    if failed > 0 {
        bail!("{} files could not be processed", failed);
    }
    Ok(())
}

//! merge_ledgers: combine intermediate record files into the grouped ledger
//! and the flat table. Inputs are sorted by path before merging.

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;
use roomledger::{aggregate, write_outputs};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Merge intermediate reservation files")]
struct Args {
    /// Glob pattern selecting input files, e.g. "tmp/*_20250718_*".
    /// Saved `.html` pages matching it are ignored.
    #[arg(short, long)]
    pattern: Option<String>,
    #[arg(long, default_value = "combined_output.txt")]
    text: PathBuf,
    #[arg(long, default_value = "combined.csv")]
    table: PathBuf,
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut files = args.files;
    if let Some(pattern) = &args.pattern {
        for entry in glob(pattern).with_context(|| format!("bad glob pattern {:?}", pattern))? {
            match entry {
                Ok(path) if path.is_file() && path.extension().map_or(true, |e| e != "html") => {
                    files.push(path)
                }
                Ok(_) => {}
                Err(e) => warn!("cannot read glob entry: {}", e),
            }
        }
    }
    if files.is_empty() {
        bail!("no input files given");
    }
    files.sort();
    files.dedup();
    info!(files = files.len(), "merging");

    let table = aggregate(&files)?;
    write_outputs(&table, &args.text, &args.table)?;
    println!(
        "{} reservations in {} rooms -> {}, {}",
        table.reservation_count(),
        table.room_count(),
        args.text.display(),
        args.table.display()
    );
    Ok(())
}

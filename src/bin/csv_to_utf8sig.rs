//! csv_to_utf8sig: rewrite CSV files as UTF-8 with a byte-order mark so
//! spreadsheet tools pick up the encoding. Inputs may be UTF-8, Big5 or GBK.
//!
//! - a single file goes to `-o <path>`, back over itself with `--overwrite`,
//!   or to `<stem>_utf8sig.csv` beside it;
//! - a directory converts every `*.csv` directly inside it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;
use roomledger::ledger::rewrite_csv_with_bom;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Re-encode UTF-8, Big5 or GBK CSV files as UTF-8 with BOM")]
struct Args {
    /// CSV file or directory of CSV files.
    input: PathBuf,
    /// Output path (single-file mode only).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Replace the input files in place.
    #[arg(long)]
    overwrite: bool,
    /// List what would be converted without writing anything.
    #[arg(long)]
    dry_run: bool,
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_utf8sig.csv", stem))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn convert(input: &Path, output: Option<&Path>, overwrite: bool, dry_run: bool) -> Result<()> {
    if !is_csv(input) {
        bail!("not a CSV file: {:?}", input);
    }
    let target = match output {
        Some(p) => p.to_path_buf(),
        None if overwrite => input.to_path_buf(),
        None => default_output(input),
    };
    if dry_run {
        println!("{} -> {}", input.display(), target.display());
        return Ok(());
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {:?}", parent))?;
    }
    let rows = rewrite_csv_with_bom(input, &target)?;
    info!(input = %input.display(), output = %target.display(), rows, "converted");
    Ok(())
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.input.is_file() {
        return convert(
            &args.input,
            args.output.as_deref(),
            args.overwrite,
            args.dry_run,
        );
    }
    if !args.input.is_dir() {
        bail!("path does not exist: {:?}", args.input);
    }
    if args.output.is_some() {
        warn!("--output is ignored in directory mode");
    }

    let pattern = format!("{}/*.csv", args.input.display());
    let mut ok = 0usize;
    let mut failed = 0usize;
    let mut paths = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern")? {
        match entry {
            Ok(p) => paths.push(p),
            Err(e) => warn!("cannot read glob entry: {}", e),
        }
    }
    if paths.is_empty() {
        warn!(dir = %args.input.display(), "no CSV files found");
    }

    for path in paths {
        match convert(&path, None, args.overwrite, args.dry_run) {
            Ok(()) => ok += 1,
            Err(e) => {
                error!(path = %path.display(), "{:#}", e);
                failed += 1;
            }
        }
    }

    println!("converted: {}, failed: {}", ok, failed);
    if failed > 0 {
        bail!("{} files failed to convert", failed);
    }
    Ok(())
}

use anyhow::Result;
use clap::Parser;
use roomledger::{config::Config, pipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Combine saved room-booking calendar pages into a reservation ledger"
)]
struct Args {
    /// Query date, YYYY/MM/DD. Defaults to the configured fallback date or today.
    #[arg(short, long)]
    date: Option<String>,
    /// Building ids, comma-separated or repeated.
    #[arg(short, long, value_delimiter = ',')]
    buildings: Vec<String>,
    /// YAML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) resolve configuration ────────────────────────────────────
    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.snapshot_dir {
        config.snapshot_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    let date = args.date.unwrap_or_else(|| config.fallback_date());
    let buildings = if args.buildings.is_empty() {
        config.default_buildings.clone()
    } else {
        args.buildings
    };
    info!(
        date = %date,
        buildings = ?buildings.iter().map(|b| config.building_name(b)).collect::<Vec<_>>(),
        "startup"
    );

    // ─── 3) run ──────────────────────────────────────────────────────
    let summary = pipeline::run(&config, &date, &buildings)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for b in &summary.buildings {
            println!("{} ({}): {} records", b.name, b.id, b.records);
        }
        for id in &summary.skipped {
            println!("{}: skipped", config.building_name(id));
        }
        println!(
            "{} reservations in {} rooms",
            summary.total_reservations, summary.rooms
        );
        println!("ledger: {}", summary.text_path.display());
        println!("table:  {}", summary.table_path.display());
    }
    Ok(())
}

// src/pipeline.rs

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, instrument, warn};

use crate::{
    aggregate::aggregate,
    config::Config,
    extract::{extract, read_snapshot},
    intermediate::write_intermediate,
    ledger::write_outputs,
    record::ReservationRecord,
    snapshot::{
        combined_output_paths, detect_period, intermediate_path_for, snapshot_path, Period,
        SnapshotName, MIN_COMPLETE_SNAPSHOT_LEN,
    },
};

/// Records pulled from one saved page and where they were written.
#[derive(Debug)]
pub struct ProcessedSnapshot {
    pub records: Vec<ReservationRecord>,
    pub intermediate: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildingSummary {
    pub id: String,
    pub name: String,
    pub records: usize,
    pub intermediate_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub date: String,
    pub buildings: Vec<BuildingSummary>,
    /// Requested buildings that could not be processed.
    pub skipped: Vec<String>,
    pub rooms: usize,
    pub total_reservations: usize,
    pub text_path: PathBuf,
    pub table_path: PathBuf,
    pub elapsed_ms: u64,
}

/// Accepts `YYYY/MM/DD` or `YYYY-MM-DD`, returns `YYYY/MM/DD`.
pub fn normalize_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .with_context(|| format!("invalid date {:?}, expected YYYY/MM/DD", raw))?;
    Ok(date.format("%Y/%m/%d").to_string())
}

/// Extract one saved page and write its intermediate file beside it.
#[instrument(level = "info", skip(html_path), fields(path = %html_path.as_ref().display()))]
pub fn process_html_file<P: AsRef<Path>>(
    html_path: P,
    fallback_date: &str,
) -> Result<ProcessedSnapshot> {
    let html_path = html_path.as_ref();
    let html = read_snapshot(html_path)?;
    inspect_snapshot(html_path, &html);

    let records = extract(&html, fallback_date);
    let intermediate = intermediate_path_for(html_path);
    write_intermediate(&records, &intermediate)?;
    info!(
        records = records.len(),
        output = %intermediate.display(),
        "processed snapshot"
    );
    Ok(ProcessedSnapshot {
        records,
        intermediate,
    })
}

/// Warn about pages that look truncated or were saved under the wrong period.
fn inspect_snapshot(path: &Path, html: &str) {
    if html.chars().count() < MIN_COMPLETE_SNAPSHOT_LEN {
        warn!(path = %path.display(), len = html.len(), "snapshot looks incomplete");
    }
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(SnapshotName::parse)
        .map(|n| n.period);
    if let (Some(named), Some(seen)) = (named, detect_period(html)) {
        if named != seen {
            warn!(
                path = %path.display(),
                named = named.as_str(),
                detected = seen.as_str(),
                "snapshot period does not match its content"
            );
        }
    }
}

/// Process the morning and afternoon pages of one building.
fn process_building(config: &Config, date: &str, id: &str) -> Result<BuildingSummary> {
    let mut records = 0usize;
    let mut intermediate_files = Vec::with_capacity(Period::ALL.len());
    for period in Period::ALL {
        let path = snapshot_path(&config.snapshot_dir, id, date, period);
        if !path.is_file() {
            bail!("missing {} snapshot {:?}", period.as_str(), path);
        }
        let processed = process_html_file(&path, date)?;
        records += processed.records.len();
        intermediate_files.push(processed.intermediate);
    }
    Ok(BuildingSummary {
        id: id.to_string(),
        name: config.building_name(id),
        records,
        intermediate_files,
    })
}

/// Turn the saved pages of `buildings` for `date` into the combined ledger
/// and flat table under `config.output_dir`.
///
/// Buildings are processed in parallel; one that fails is logged and left
/// out. Fails if none succeed or the outputs cannot be written.
#[instrument(level = "info", skip(config, buildings), fields(buildings = buildings.len()))]
pub fn run(config: &Config, date: &str, buildings: &[String]) -> Result<RunSummary> {
    let start = Instant::now();
    let date = normalize_date(date)?;

    // Two workers on the same building would write the same files.
    let mut unique: Vec<String> = Vec::with_capacity(buildings.len());
    for id in buildings {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }

    let results: Vec<(String, Result<BuildingSummary>)> = unique
        .par_iter()
        .map(|id| (id.clone(), process_building(config, &date, id)))
        .collect();

    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    for (id, result) in results {
        match result {
            Ok(summary) => {
                info!(building = %summary.name, records = summary.records, "building done");
                processed.push(summary);
            }
            Err(e) => {
                warn!(building = %config.building_name(&id), error = %e, "skipping building");
                skipped.push(id);
            }
        }
    }
    if processed.is_empty() {
        bail!("no building could be processed for {}", date);
    }

    let mut files: Vec<PathBuf> = processed
        .iter()
        .flat_map(|b| b.intermediate_files.iter().cloned())
        .collect();
    let before = files.len();
    files.retain(|p| p.is_file());
    if files.len() != before {
        warn!(missing = before - files.len(), "intermediate files disappeared");
    }
    files.sort();

    let table = aggregate(&files)?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {:?}", config.output_dir))?;
    let ids: Vec<String> = processed.iter().map(|b| b.id.clone()).collect();
    let (text_path, table_path) = combined_output_paths(&config.output_dir, &date, &ids);
    write_outputs(&table, &text_path, &table_path)?;

    let summary = RunSummary {
        date,
        buildings: processed,
        skipped,
        rooms: table.room_count(),
        total_reservations: table.reservation_count(),
        text_path,
        table_path,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        rooms = summary.rooms,
        reservations = summary.total_reservations,
        elapsed_ms = summary.elapsed_ms,
        "run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_normalise_to_slashes() -> Result<()> {
        assert_eq!(normalize_date("2025/07/18")?, "2025/07/18");
        assert_eq!(normalize_date("2025-07-18")?, "2025/07/18");
        Ok(())
    }

    #[test]
    fn bad_dates_are_rejected() {
        assert!(normalize_date("18/07/2025").is_err());
        assert!(normalize_date("2025/13/01").is_err());
        assert!(normalize_date("").is_err());
    }
}

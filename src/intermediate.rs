// src/intermediate.rs
//
// One reservation per line, four tab-separated fields:
// room, time range, meeting name, organizer. No header.

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};
use tracing::{debug, instrument};

use crate::record::ReservationRecord;

const BOM: char = '\u{feff}';

/// Write `records` in the given order, one tab-joined line each.
#[instrument(level = "debug", skip(records, path), fields(path = %path.as_ref().display(), records = records.len()))]
pub fn write_intermediate<P: AsRef<Path>>(records: &[ReservationRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("creating intermediate file {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record.fields().join("\t"))
            .with_context(|| format!("writing intermediate file {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing intermediate file {:?}", path))?;
    debug!("wrote intermediate file");
    Ok(())
}

/// Read a text file as whitespace-trimmed lines. A leading byte-order mark
/// is dropped.
pub fn read_intermediate<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading intermediate file {:?}", path))?;
    Ok(split_lines(&text))
}

fn split_lines(text: &str) -> Vec<String> {
    text.strip_prefix(BOM)
        .unwrap_or(text)
        .lines()
        .map(|l| l.trim().to_string())
        .collect()
}

// src/ledger.rs

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use encoding_rs::{Encoding, BIG5, GBK, UTF_8};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};
use tracing::{debug, info, instrument};

use crate::aggregate::GroupedTable;

/// Column labels of the flat table: room, time, meeting name, organizer.
pub const FLAT_TABLE_HEADER: [&str; 4] = ["會議室", "會議時間", "會議名稱", "借用人"];

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Grouped ledger: each room name on its own line followed by its slots,
/// one field per line (time, name, organizer).
pub fn write_grouped_text<W: Write>(table: &GroupedTable, mut w: W) -> std::io::Result<()> {
    for (room, slots) in table.rooms() {
        writeln!(w, "{}", room)?;
        for slot in slots {
            writeln!(w, "{}", slot.time_range)?;
            writeln!(w, "{}", slot.meeting_name)?;
            writeln!(w, "{}", slot.organizer)?;
        }
    }
    Ok(())
}

/// Flat table: a header row, then one row per slot with the room repeated.
/// Slots with an empty time range are not emitted.
pub fn write_flat_table<W: Write>(table: &GroupedTable, w: W) -> Result<usize> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(w);
    writer.write_record(FLAT_TABLE_HEADER)?;

    let mut rows = 0usize;
    for (room, slots) in table.rooms() {
        for slot in slots.iter().filter(|s| !s.time_range.is_empty()) {
            writer.write_record([
                room.as_str(),
                slot.time_range.as_str(),
                slot.meeting_name.as_str(),
                slot.organizer.as_str(),
            ])?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

/// Write the grouped ledger to `text_path` and the flat table to
/// `table_path`, both UTF-8 with a byte-order mark.
#[instrument(level = "info", skip_all, fields(text = %text_path.as_ref().display(), table = %table_path.as_ref().display()))]
pub fn write_outputs<P: AsRef<Path>, Q: AsRef<Path>>(
    table: &GroupedTable,
    text_path: P,
    table_path: Q,
) -> Result<()> {
    let text_path = text_path.as_ref();
    let table_path = table_path.as_ref();

    let mut text = create_with_bom(text_path)?;
    write_grouped_text(table, &mut text)
        .with_context(|| format!("writing grouped ledger {:?}", text_path))?;
    text.flush()
        .with_context(|| format!("flushing grouped ledger {:?}", text_path))?;

    let mut flat = create_with_bom(table_path)?;
    let rows = write_flat_table(table, &mut flat)
        .with_context(|| format!("writing flat table {:?}", table_path))?;
    flat.flush()
        .with_context(|| format!("flushing flat table {:?}", table_path))?;

    info!(rooms = table.room_count(), rows, "wrote ledger outputs");
    Ok(())
}

fn create_with_bom(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut w = BufWriter::new(file);
    w.write_all(BOM)
        .with_context(|| format!("writing byte-order mark to {:?}", path))?;
    Ok(w)
}

/// Decode CSV bytes of unknown origin. UTF-8 (a leading byte-order mark is
/// dropped) is tried first, then Big5 and GBK for files exported by older
/// Traditional and Simplified Chinese tools. `None` if no candidate decodes
/// the bytes without replacement characters.
pub fn decode_csv_bytes(bytes: &[u8]) -> Option<(String, &'static Encoding)> {
    let body = bytes.strip_prefix(BOM).unwrap_or(bytes);
    [UTF_8, BIG5, GBK].into_iter().find_map(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| (text.into_owned(), encoding))
    })
}

/// Re-encode a CSV file in UTF-8, Big5 or GBK as UTF-8 with a byte-order
/// mark and CRLF row endings. Returns the number of rows written. `input`
/// and `output` may be the same path.
#[instrument(level = "debug", skip_all, fields(input = %input.as_ref().display()))]
pub fn rewrite_csv_with_bom<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    let input = input.as_ref();
    let output = output.as_ref();

    let bytes = fs::read(input).with_context(|| format!("reading {:?}", input))?;
    let (text, encoding) = decode_csv_bytes(&bytes)
        .with_context(|| format!("{:?} is not UTF-8, Big5 or GBK", input))?;
    info!(input = %input.display(), encoding = encoding.name(), "detected source encoding");

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let rows = rdr
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {:?}", input))?;

    let mut out = create_with_bom(output)?;
    {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::CRLF)
            .from_writer(&mut out);
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    out.flush()
        .with_context(|| format!("flushing {:?}", output))?;
    debug!(rows = rows.len(), output = %output.display(), "re-encoded csv");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Slot;
    use tempfile::tempdir;

    fn slot(time: &str, name: &str, organizer: &str) -> Slot {
        Slot {
            time_range: time.into(),
            meeting_name: name.into(),
            organizer: organizer.into(),
        }
    }

    fn sample() -> GroupedTable {
        let mut table = GroupedTable::new();
        table.push("Room A", slot("2025/07/18 09:00~10:00", "Sync", "Eng Alice"));
        table.push("Room B", slot("2025/07/18 13:00~14:00", "Budget, Q3", ""));
        table.push("Room A", slot("2025/07/18 11:00~12:00", "Review", "QA"));
        table
    }

    #[test]
    fn grouped_text_layout() -> Result<()> {
        let mut buf = Vec::new();
        write_grouped_text(&sample(), &mut buf)?;
        assert_eq!(
            String::from_utf8(buf)?,
            "Room A\n\
             2025/07/18 09:00~10:00\nSync\nEng Alice\n\
             2025/07/18 11:00~12:00\nReview\nQA\n\
             Room B\n\
             2025/07/18 13:00~14:00\nBudget, Q3\n\n"
        );
        Ok(())
    }

    #[test]
    fn flat_table_single_row() -> Result<()> {
        let mut table = GroupedTable::new();
        table.push("Room A", slot("2025/07/18 09:00~10:00", "Sync", "Eng Alice"));

        let mut buf = Vec::new();
        let rows = write_flat_table(&table, &mut buf)?;
        assert_eq!(rows, 1);
        assert_eq!(
            String::from_utf8(buf)?,
            "會議室,會議時間,會議名稱,借用人\r\n\
             Room A,2025/07/18 09:00~10:00,Sync,Eng Alice\r\n"
        );
        Ok(())
    }

    #[test]
    fn flat_table_quotes_and_skips_empty_times() -> Result<()> {
        let mut table = sample();
        table.push("Room C", slot("", "Ghost", ""));

        let mut buf = Vec::new();
        let rows = write_flat_table(&table, &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert_eq!(rows, 3);
        assert!(text.contains("Room B,2025/07/18 13:00~14:00,\"Budget, Q3\",\r\n"));
        assert!(!text.contains("Ghost"));
        Ok(())
    }

    #[test]
    fn flat_table_is_deterministic() -> Result<()> {
        let table = sample();
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_flat_table(&table, &mut first)?;
        write_flat_table(&table, &mut second)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn outputs_carry_bom() -> Result<()> {
        let dir = tempdir()?;
        let text_path = dir.path().join("combined_output.txt");
        let csv_path = dir.path().join("combined.csv");

        write_outputs(&sample(), &text_path, &csv_path)?;

        let text = fs::read(&text_path)?;
        let csv = fs::read(&csv_path)?;
        assert!(text.starts_with(BOM));
        assert!(csv.starts_with(BOM));
        assert!(String::from_utf8(csv[BOM.len()..].to_vec())?.starts_with("會議室,"));
        Ok(())
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no_such_dir").join("out.txt");
        let csv_path = dir.path().join("out.csv");
        assert!(write_outputs(&sample(), &missing, &csv_path).is_err());
    }

    #[test]
    fn rewrite_adds_bom_once() -> Result<()> {
        let dir = tempdir()?;
        let plain = dir.path().join("plain.csv");
        fs::write(&plain, "a,b\n\"x, y\",z\n")?;

        let rows = rewrite_csv_with_bom(&plain, &plain)?;
        assert_eq!(rows, 2);
        rewrite_csv_with_bom(&plain, &plain)?;

        let bytes = fs::read(&plain)?;
        assert!(bytes.starts_with(BOM));
        assert_eq!(&bytes[BOM.len()..], b"a,b\r\n\"x, y\",z\r\n");
        Ok(())
    }

    #[test]
    fn big5_csv_is_re_encoded_as_utf8() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("legacy.csv");
        let output = dir.path().join("legacy_utf8sig.csv");
        // "會議室,a" in Big5
        fs::write(&input, b"\xB7\x7C\xC4\xB3\xAB\xC7,a\r\n")?;

        let rows = rewrite_csv_with_bom(&input, &output)?;
        assert_eq!(rows, 1);
        let bytes = fs::read(&output)?;
        assert!(bytes.starts_with(BOM));
        assert_eq!(String::from_utf8(bytes[BOM.len()..].to_vec())?, "會議室,a\r\n");
        Ok(())
    }

    #[test]
    fn source_encoding_is_reported() {
        let (text, encoding) = decode_csv_bytes("\u{feff}會議室".as_bytes()).unwrap();
        assert_eq!((text.as_str(), encoding), ("會議室", UTF_8));

        let (text, encoding) = decode_csv_bytes(b"\xB7\x7C\xC4\xB3\xAB\xC7").unwrap();
        assert_eq!((text.as_str(), encoding), ("會議室", BIG5));
    }

    #[test]
    fn undecodable_csv_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("binary.csv");
        fs::write(&input, [0xFFu8, 0xFF, 0xFF])?;
        assert!(decode_csv_bytes(&[0xFF, 0xFF, 0xFF]).is_none());
        assert!(rewrite_csv_with_bom(&input, dir.path().join("out.csv")).is_err());
        Ok(())
    }
}

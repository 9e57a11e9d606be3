// src/aggregate.rs

use anyhow::Result;
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, info, instrument, trace};

use crate::{intermediate::read_intermediate, record::ReservationRecord};

/// One reservation under a room: time range, meeting name, organizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub time_range: String,
    pub meeting_name: String,
    pub organizer: String,
}

/// Reservations grouped by room. Rooms iterate in first-seen order and slots
/// in insertion order.
#[derive(Debug, Default, Clone)]
pub struct GroupedTable {
    rooms: IndexMap<String, Vec<Slot>>,
}

impl GroupedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot under `room`, creating the room on first sight.
    pub fn push(&mut self, room: &str, slot: Slot) {
        self.rooms.entry(room.to_string()).or_default().push(slot);
    }

    pub fn push_record(&mut self, record: ReservationRecord) {
        let ReservationRecord {
            room,
            time_range,
            meeting_name,
            organizer,
        } = record;
        self.push(
            &room,
            Slot {
                time_range,
                meeting_name,
                organizer,
            },
        );
    }

    /// Rooms with their slots, in first-seen order.
    pub fn rooms(&self) -> indexmap::map::Iter<'_, String, Vec<Slot>> {
        self.rooms.iter()
    }

    pub fn get(&self, room: &str) -> Option<&[Slot]> {
        self.rooms.get(room).map(Vec::as_slice)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total number of slots across all rooms.
    pub fn reservation_count(&self) -> usize {
        self.rooms.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Shape of one intermediate-file line. Older page versions produced lines
/// without an organizer column.
#[derive(Debug, PartialEq, Eq)]
pub enum LineShape<'a> {
    Full {
        room: &'a str,
        time_range: &'a str,
        meeting_name: &'a str,
        organizer: &'a str,
    },
    NoOrganizer {
        room: &'a str,
        time_range: &'a str,
        meeting_name: &'a str,
    },
    Malformed,
}

impl<'a> LineShape<'a> {
    pub fn parse(line: &'a str) -> Self {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        match *fields.as_slice() {
            [room, time_range, meeting_name, organizer, ..] => LineShape::Full {
                room,
                time_range,
                meeting_name,
                organizer,
            },
            [room, time_range, meeting_name] => LineShape::NoOrganizer {
                room,
                time_range,
                meeting_name,
            },
            _ => LineShape::Malformed,
        }
    }

    /// Normalise to a full record; `None` for malformed lines.
    pub fn into_record(self) -> Option<ReservationRecord> {
        match self {
            LineShape::Full {
                room,
                time_range,
                meeting_name,
                organizer,
            } => Some(ReservationRecord::new(
                room,
                time_range,
                meeting_name,
                organizer,
            )),
            LineShape::NoOrganizer {
                room,
                time_range,
                meeting_name,
            } => Some(ReservationRecord::new(room, time_range, meeting_name, "")),
            LineShape::Malformed => None,
        }
    }
}

/// Parse a single trimmed line. Blank and short lines yield `None`.
pub fn parse_line(line: &str) -> Option<ReservationRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    LineShape::parse(line).into_record()
}

/// Merge intermediate files, in the order given, into one table.
///
/// Callers sort `paths` beforehand; this function does not reorder them.
/// Lines with fewer than three fields are skipped.
#[instrument(level = "info", skip(paths), fields(files = paths.len()))]
pub fn aggregate<P: AsRef<Path>>(paths: &[P]) -> Result<GroupedTable> {
    let mut table = GroupedTable::new();
    for path in paths {
        let path = path.as_ref();
        let lines = read_intermediate(path)?;
        let mut added = 0usize;
        let mut skipped = 0usize;
        for line in &lines {
            match parse_line(line) {
                Some(record) => {
                    table.push_record(record);
                    added += 1;
                }
                None if line.is_empty() => {}
                None => {
                    skipped += 1;
                    trace!(line = %line, "skipping short line");
                }
            }
        }
        debug!(path = %path.display(), added, skipped, "merged intermediate file");
    }
    info!(
        rooms = table.room_count(),
        reservations = table.reservation_count(),
        "aggregation finished"
    );
    Ok(table)
}

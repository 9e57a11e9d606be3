// src/extract.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs, path::Path};
use tracing::{debug, instrument, trace};

use crate::record::{format_time_range, join_organizer, ReservationRecord, RoomHeading};

static QUERY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"value="(20\d{2}/\d{2}/\d{2})""#).expect("query date pattern"));

static ROOM_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="Title ToggleTitle"[^>]*>.*?<div class="Room">([^<]+)</div>"#)
        .expect("room heading pattern")
});

static BOOKING_BUTTON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<button[^>]+class="[^"]*Calendar_block[^"]*meetingRecordBtn[^"]*"[^>]*>(.*?)</button>"#,
    )
    .expect("booking button pattern")
});

// The page sometimes renders the token as "text Dis" or "text  Dis".
static COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="Company text\s*Dis">([^<]+)</div>"#).expect("company pattern")
});

static DEPARTMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="Department">([^<]+)</div>"#).expect("department pattern")
});

static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="Section">([^<]+?)(?:\s*<span[^>]*>[^<]*</span>)?</div>"#)
        .expect("section pattern")
});

static START_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-starttime="([^"]+)""#).expect("start time pattern"));

static END_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-endtime="([^"]+)""#).expect("end time pattern"));

/// A booking button as found in the page.
#[derive(Debug)]
struct Booking<'a> {
    offset: usize,
    /// `<button ...>` up to and including the closing `>`. Time attributes
    /// are read from here only so nested elements cannot supply them.
    open_tag: &'a str,
    /// Everything between the open tag and `</button>`.
    body: &'a str,
}

/// Why a booking was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    NoPrecedingRoom,
    NoMeetingName,
    NoTimeRange,
}

/// Extract every reservation from one rendered calendar page.
///
/// Bookings are attributed to the nearest room heading that starts before
/// them. Bookings with no such heading, no meeting name, or a missing start
/// or end time are skipped; nothing else is filtered or reordered.
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn extract(html: &str, fallback_date: &str) -> Vec<ReservationRecord> {
    let query_date = find_query_date(html).unwrap_or_else(|| {
        debug!(fallback_date, "no query date in document, using fallback");
        fallback_date
    });
    let rooms = find_room_headings(html);
    trace!(rooms = rooms.len(), query_date, "located room headings");

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for booking in find_bookings(html) {
        match parse_booking(&booking, &rooms, query_date) {
            Ok(record) => records.push(record),
            Err(reason) => {
                skipped += 1;
                debug!(offset = booking.offset, ?reason, "skipping booking");
            }
        }
    }

    debug!(
        rooms = rooms.len(),
        records = records.len(),
        skipped,
        "extraction finished"
    );
    records
}

/// Read a saved snapshot and extract it. Fails only if the file cannot be
/// read or is not valid UTF-8.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn extract_file<P: AsRef<Path>>(path: P, fallback_date: &str) -> Result<Vec<ReservationRecord>> {
    let html = read_snapshot(path)?;
    Ok(extract(&html, fallback_date))
}

/// Read a saved page as UTF-8 text, dropping a leading byte-order mark.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading snapshot {:?}", path))?;
    let mut text =
        String::from_utf8(bytes).with_context(|| format!("snapshot {:?} is not UTF-8", path))?;
    if text.starts_with('\u{feff}') {
        text.replace_range(..'\u{feff}'.len_utf8(), "");
    }
    Ok(text)
}

/// First `value="YYYY/MM/DD"` attribute in the document.
pub fn find_query_date(html: &str) -> Option<&str> {
    QUERY_DATE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Room headings in document order; offsets are strictly increasing.
pub fn find_room_headings(html: &str) -> Vec<RoomHeading> {
    ROOM_HEADING
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let name = c.get(1)?.as_str().trim();
            Some(RoomHeading {
                name: name.to_string(),
                offset: whole.start(),
            })
        })
        .collect()
}

fn find_bookings(html: &str) -> impl Iterator<Item = Booking<'_>> {
    BOOKING_BUTTON.captures_iter(html).filter_map(|c| {
        let whole = c.get(0)?;
        let body = c.get(1)?;
        Some(Booking {
            offset: whole.start(),
            open_tag: &html[whole.start()..body.start()],
            body: body.as_str(),
        })
    })
}

/// The heading with the greatest offset strictly less than `offset`.
fn owning_room(rooms: &[RoomHeading], offset: usize) -> Option<&RoomHeading> {
    let idx = rooms.partition_point(|r| r.offset < offset);
    idx.checked_sub(1).map(|i| &rooms[i])
}

fn first_capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn parse_booking(
    booking: &Booking<'_>,
    rooms: &[RoomHeading],
    query_date: &str,
) -> Result<ReservationRecord, Skip> {
    let room = owning_room(rooms, booking.offset).ok_or(Skip::NoPrecedingRoom)?;
    let meeting_name = first_capture(&COMPANY, booking.body).ok_or(Skip::NoMeetingName)?;

    let department = first_capture(&DEPARTMENT, booking.body).unwrap_or("");
    let person = first_capture(&SECTION, booking.body).unwrap_or("");

    let start = first_capture(&START_TIME, booking.open_tag).ok_or(Skip::NoTimeRange)?;
    let end = first_capture(&END_TIME, booking.open_tag).ok_or(Skip::NoTimeRange)?;

    Ok(ReservationRecord {
        room: room.name.clone(),
        time_range: format_time_range(query_date, start, end),
        meeting_name: meeting_name.to_string(),
        organizer: join_organizer(department, person),
    })
}

// src/record.rs

/// One reserved slot for a meeting room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRecord {
    pub room: String,
    /// `"<date> <start>~<end>"`, with start/end passed through verbatim.
    pub time_range: String,
    pub meeting_name: String,
    /// Department and person, space-joined. May be empty.
    pub organizer: String,
}

impl ReservationRecord {
    pub fn new(
        room: impl Into<String>,
        time_range: impl Into<String>,
        meeting_name: impl Into<String>,
        organizer: impl Into<String>,
    ) -> Self {
        Self {
            room: room.into(),
            time_range: time_range.into(),
            meeting_name: meeting_name.into(),
            organizer: organizer.into(),
        }
    }

    /// The four fields in intermediate-file column order.
    pub fn fields(&self) -> [&str; 4] {
        [
            &self.room,
            &self.time_range,
            &self.meeting_name,
            &self.organizer,
        ]
    }
}

/// A room label and where its heading block starts in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHeading {
    pub name: String,
    pub offset: usize,
}

/// `"{date} {start}~{end}"`
pub fn format_time_range(date: &str, start: &str, end: &str) -> String {
    format!("{} {}~{}", date, start, end)
}

/// Joins department and person with a single space, dropping whichever is empty.
pub fn join_organizer(department: &str, person: &str) -> String {
    format!("{} {}", department, person).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organizer_joins_both_parts() {
        assert_eq!(join_organizer("Eng", "Alice"), "Eng Alice");
    }

    #[test]
    fn organizer_falls_back_to_whichever_part_exists() {
        assert_eq!(join_organizer("", "Alice"), "Alice");
        assert_eq!(join_organizer("Eng", ""), "Eng");
        assert_eq!(join_organizer("", ""), "");
    }

    #[test]
    fn time_range_passes_times_through() {
        assert_eq!(
            format_time_range("2025/07/18", "09:00", "10:30"),
            "2025/07/18 09:00~10:30"
        );
    }
}

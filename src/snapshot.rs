// src/snapshot.rs
//
// File naming for saved calendar pages and the files derived from them:
//   <snapshot_dir>/<building>_<YYYYMMDD>_<period>.html   raw page
//   <snapshot_dir>/<building>_<YYYYMMDD>_<period>        intermediate records
//   <output_dir>/<YYYYMMDD>_buildings_<ids>_combined_output.txt / _combined.csv

use anyhow::{bail, Error};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

/// Pages shorter than this are likely to have been captured before the
/// calendar finished rendering.
pub const MIN_COMPLETE_SNAPSHOT_LEN: usize = 30_000;

static AFTERNOON_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"1[3-7]:").expect("afternoon time pattern"));
static MORNING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0[8-9]:|1[0-2]:").expect("morning time pattern"));

/// Half-day view the calendar page was showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Period {
    Morning,
    Afternoon,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Morning, Period::Afternoon];

    pub fn as_str(&self) -> &str {
        match self {
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(Period::Morning),
            "afternoon" => Ok(Period::Afternoon),
            other => bail!("unknown period {:?}", other),
        }
    }
}

/// Guess which half of the day a page shows by counting time-shaped tokens.
/// `None` when the counts tie.
pub fn detect_period(html: &str) -> Option<Period> {
    let afternoon = AFTERNOON_TIME.find_iter(html).count();
    let morning = MORNING_TIME.find_iter(html).count();
    match afternoon.cmp(&morning) {
        std::cmp::Ordering::Greater => Some(Period::Afternoon),
        std::cmp::Ordering::Less => Some(Period::Morning),
        std::cmp::Ordering::Equal => None,
    }
}

/// `2025/07/18` -> `20250718`
pub fn compact_date(date: &str) -> String {
    date.replace('/', "")
}

/// Parsed `<building>_<YYYYMMDD>_<period>.html` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotName {
    pub building: String,
    pub date: String,
    pub period: Period,
}

impl SnapshotName {
    pub fn new(building: &str, date: &str, period: Period) -> Self {
        Self {
            building: building.to_string(),
            date: compact_date(date),
            period,
        }
    }

    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".html")?;
        let mut parts = stem.splitn(3, '_');
        let building = parts.next()?;
        let date = parts.next()?;
        let period: Period = parts.next()?.parse().ok()?;
        if building.is_empty() || date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            building: building.to_string(),
            date: date.to_string(),
            period,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.html", self.building, self.date, self.period.as_str())
    }
}

pub fn snapshot_path(dir: &Path, building: &str, date: &str, period: Period) -> PathBuf {
    dir.join(SnapshotName::new(building, date, period).file_name())
}

/// Where the records extracted from `html_path` are written: the same path
/// without `.html`, or with `_processed` appended for other names.
pub fn intermediate_path_for(html_path: &Path) -> PathBuf {
    let raw = html_path.as_os_str().to_string_lossy();
    match raw.strip_suffix(".html") {
        Some(stem) => PathBuf::from(stem),
        None => PathBuf::from(format!("{}_processed", raw)),
    }
}

/// Grouped ledger and flat table paths for a run.
pub fn combined_output_paths(
    output_dir: &Path,
    date: &str,
    building_ids: &[String],
) -> (PathBuf, PathBuf) {
    let prefix = format!("{}_buildings_{}", compact_date(date), building_ids.join("_"));
    (
        output_dir.join(format!("{}_combined_output.txt", prefix)),
        output_dir.join(format!("{}_combined.csv", prefix)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_name_round_trip() {
        let name = SnapshotName::new("6", "2025/07/18", Period::Afternoon);
        assert_eq!(name.file_name(), "6_20250718_afternoon.html");
        assert_eq!(SnapshotName::parse("6_20250718_afternoon.html"), Some(name));
    }

    #[test]
    fn snapshot_name_rejects_other_files() {
        assert_eq!(SnapshotName::parse("6_20250718_evening.html"), None);
        assert_eq!(SnapshotName::parse("6_2025071_morning.html"), None);
        assert_eq!(SnapshotName::parse("6_20250718_morning"), None);
        assert_eq!(SnapshotName::parse("page_source.html"), None);
    }

    #[test]
    fn intermediate_path_strips_html() {
        assert_eq!(
            intermediate_path_for(Path::new("tmp/6_20250718_morning.html")),
            PathBuf::from("tmp/6_20250718_morning")
        );
        assert_eq!(
            intermediate_path_for(Path::new("tmp/page_source")),
            PathBuf::from("tmp/page_source_processed")
        );
    }

    #[test]
    fn combined_paths() {
        let (text, csv) = combined_output_paths(
            Path::new("output"),
            "2025/07/18",
            &["6".to_string(), "20".to_string()],
        );
        assert_eq!(
            text,
            PathBuf::from("output/20250718_buildings_6_20_combined_output.txt")
        );
        assert_eq!(csv, PathBuf::from("output/20250718_buildings_6_20_combined.csv"));
    }

    #[test]
    fn period_detection() {
        assert_eq!(
            detect_period(r#"data-starttime="13:00" data-endtime="14:30""#),
            Some(Period::Afternoon)
        );
        assert_eq!(
            detect_period(r#"data-starttime="08:30" data-endtime="09:00""#),
            Some(Period::Morning)
        );
        assert_eq!(detect_period("no times"), None);
    }

    #[test]
    fn period_parsing_is_case_insensitive() {
        assert_eq!(" MORNING ".parse::<Period>().ok(), Some(Period::Morning));
        assert_eq!("Afternoon".parse::<Period>().ok(), Some(Period::Afternoon));
        assert!("night".parse::<Period>().is_err());
    }
}

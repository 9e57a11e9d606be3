// src/config.rs

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Known buildings on the booking site, by id.
static DEFAULT_BUILDINGS: &[(&str, &str)] = &[
    ("4", "仁愛大樓"),
    ("6", "松仁大樓"),
    ("10", "國泰證券總公司"),
    ("12", "瑞湖大樓"),
    ("15", "信義安和大樓"),
    ("19", "台中忠明大樓"),
    ("20", "A3置地廣場"),
    ("22", "高雄資訊開發中心"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding saved calendar pages and their intermediate files.
    pub snapshot_dir: PathBuf,
    /// Directory receiving the combined ledger and flat table.
    pub output_dir: PathBuf,
    pub default_buildings: Vec<String>,
    pub buildings: BTreeMap<String, String>,
    /// Date used when a page carries none. Today's date when unset.
    pub fallback_date: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("./tmp"),
            output_dir: PathBuf::from("./output"),
            default_buildings: vec!["6".to_string()],
            buildings: DEFAULT_BUILDINGS
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            fallback_date: None,
        }
    }
}

impl Config {
    /// Load a YAML config. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {:?}", path))?;
        debug!(path = %path.display(), buildings = config.buildings.len(), "loaded config");
        Ok(config)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn building_name(&self, id: &str) -> String {
        self.buildings
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("未知建築物({})", id))
    }

    pub fn fallback_date(&self) -> String {
        self.fallback_date.clone().unwrap_or_else(today)
    }
}

/// Today's local date as `YYYY/MM/DD`.
pub fn today() -> String {
    Local::now().format("%Y/%m/%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_know_all_buildings() {
        let config = Config::default();
        assert_eq!(config.buildings.len(), 8);
        assert_eq!(config.building_name("20"), "A3置地廣場");
        assert_eq!(config.building_name("99"), "未知建築物(99)");
        assert_eq!(config.default_buildings, vec!["6"]);
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("roomledger.yaml");
        fs::write(
            &path,
            "output_dir: /srv/ledger\nfallback_date: \"2025/07/18\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.output_dir, PathBuf::from("/srv/ledger"));
        assert_eq!(config.snapshot_dir, PathBuf::from("./tmp"));
        assert_eq!(config.fallback_date(), "2025/07/18");
        assert_eq!(config.buildings.len(), 8);
        Ok(())
    }

    #[test]
    fn today_is_slash_formatted() {
        let d = today();
        assert_eq!(d.len(), 10);
        assert_eq!(&d[4..5], "/");
        assert_eq!(&d[7..8], "/");
    }
}

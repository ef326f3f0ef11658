//! Durable per-year, per-cell store of fetched weather data.
//!
//! The whole cache is one JSON document shaped
//! `{ "<year>": { "<cell-id>": WeatherRecord } }`. It is read once at start
//! and rewritten after every successful batch.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::grid::Cell;

/// Metric name to its values, as returned by the archive API.
pub type Series = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub bounds: [[f64; 2]; 2],
    #[serde(default)]
    pub daily: Series,
    #[serde(default)]
    pub hourly: Series,
    /// Fields written by other tools; kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WeatherRecord {
    /// Builds the record for `cell` from one per-location API result.
    pub fn from_entry(cell: &Cell, entry: &Value) -> Result<Self> {
        Ok(WeatherRecord {
            id: cell.id.clone(),
            lat: cell.lat,
            lon: cell.lon,
            bounds: cell.bounds,
            daily: series(entry, "daily")?,
            hourly: series(entry, "hourly")?,
            extra: BTreeMap::new(),
        })
    }
}

fn series(entry: &Value, key: &str) -> Result<Series> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(Series::new()),
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("`{}` is not a map of value arrays", key)),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache {
    years: BTreeMap<String, BTreeMap<String, WeatherRecord>>,
}

impl Cache {
    pub fn contains(&self, year: i32, cell_id: &str) -> bool {
        self.years
            .get(&year.to_string())
            .is_some_and(|cells| cells.contains_key(cell_id))
    }

    pub fn insert(&mut self, year: i32, record: WeatherRecord) {
        self.years
            .entry(year.to_string())
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// Number of cells cached for `year`.
    pub fn count(&self, year: i32) -> usize {
        self.years.get(&year.to_string()).map_or(0, BTreeMap::len)
    }

    /// Year keys present in the document, including ones this run does not fetch.
    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }
}

#[cfg(test)]
impl Cache {
    pub fn get(&self, year: i32, cell_id: &str) -> Option<&WeatherRecord> {
        self.years.get(&year.to_string())?.get(cell_id)
    }
}

/// Reads and writes the cache document at an explicit path.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cache. A missing file is an empty cache; an unreadable or
    /// malformed one is logged and also treated as empty.
    pub fn load(&self) -> Cache {
        match self.try_load() {
            Ok(cache) => cache,
            Err(e) => {
                warn!(
                    "Failed to load cache `{}`: {:#}. Starting with an empty cache",
                    self.path.display(),
                    e
                );
                Cache::default()
            }
        }
    }

    fn try_load(&self) -> Result<Cache> {
        if !self.path.exists() {
            debug!("No cache at `{}`", self.path.display());
            return Ok(Cache::default());
        }

        let file = File::open(&self.path)?;
        let cache = serde_json::from_reader(BufReader::new(file))?;

        Ok(cache)
    }

    /// Writes the cache to a temporary file next to the target and renames it
    /// into place, so a crash mid-write leaves the previous document intact.
    pub fn save(&self, cache: &Cache) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in `{}`", dir.display()))?;

        let mut writer = BufWriter::new(&mut tmp);
        serde_json::to_writer(&mut writer, cache).context("Failed to serialise cache")?;
        writer.flush()?;
        drop(writer);

        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write cache `{}`", self.path.display()))?;

        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------

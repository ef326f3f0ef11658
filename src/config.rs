//! Run configuration.
//!
//! Everything here is fixed at start time. The command line may replace the
//! cache location and the year list; the rest are constants.

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use thiserror::Error;

use crate::grid::{BoundingBox, GridSpec};

pub const ARCHIVE_ENDPOINT: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_CACHE_FILE: &str = "weather_cache.json";

/// Germany.
pub const DEFAULT_BBOX: BoundingBox = BoundingBox {
    min_lat: 47.0,
    max_lat: 55.2,
    min_lon: 5.5,
    max_lon: 15.2,
};
pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLS: usize = 5;
pub const DEFAULT_YEARS: [i32; 3] = [2024, 2023, 2022];

/// Open-Meteo free tier limits.
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_SLEEP_BETWEEN_BATCHES: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bounding box latitude range is empty or invalid ({min} .. {max})")]
    Latitude { min: f64, max: f64 },

    #[error("bounding box longitude range is empty or invalid ({min} .. {max})")]
    Longitude { min: f64, max: f64 },

    #[error("grid needs at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("batch size must be at least 1")]
    EmptyBatch,

    #[error("at least one attempt per batch is required")]
    NoAttempts,

    #[error("no years to fetch")]
    NoYears,

    #[error("year {0} is outside the supported calendar range")]
    Year(i32),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub grid: GridSpec,
    /// Calendar years to backfill, processed in this order.
    pub years: Vec<i32>,
    pub cache_path: PathBuf,
    pub fetch: FetchSettings,
}

/// Knobs for the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub endpoint: String,
    /// Locations per API call.
    pub batch_size: usize,
    pub sleep_between_batches: Duration,
    /// Attempts per batch, the first one included.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            endpoint: ARCHIVE_ENDPOINT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            sleep_between_batches: DEFAULT_SLEEP_BETWEEN_BATCHES,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridSpec {
                bbox: DEFAULT_BBOX,
                rows: DEFAULT_ROWS,
                cols: DEFAULT_COLS,
            },
            years: DEFAULT_YEARS.to_vec(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            fetch: FetchSettings::default(),
        }
    }
}

impl Config {
    /// Applies command line overrides. An empty year list keeps the defaults.
    pub fn with_overrides(mut self, cache: Option<PathBuf>, years: &[i32]) -> Self {
        if let Some(path) = cache {
            self.cache_path = path;
        }
        if !years.is_empty() {
            self.years = years.to_vec();
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;

        if self.fetch.batch_size == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        if self.fetch.max_retries == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.years.is_empty() {
            return Err(ConfigError::NoYears);
        }
        if let Some(&year) = self.years.iter().find(|&&y| !is_representable(y)) {
            return Err(ConfigError::Year(year));
        }

        Ok(())
    }
}

fn is_representable(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 1, 1).is_some() && NaiveDate::from_ymd_opt(year, 12, 31).is_some()
}

// -- Tests -------------------------------------------------------------------

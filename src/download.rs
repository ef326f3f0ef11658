//! Requests against the Open-Meteo historical archive.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use log::debug;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::{config::FetchSettings, grid::Cell};

pub const HOURLY_METRICS: &str = "temperature_2m,precipitation,wind_speed_10m";
pub const DAILY_METRICS: &str = "temperature_2m_max,precipitation_sum,wind_speed_10m_max";
const TIMEZONE: &str = "GMT";
const WIND_SPEED_UNIT: &str = "ms";

/// One multi-location request covering a full calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveQuery {
    /// `(lat, lon)` pairs; results come back in this order.
    pub locations: Vec<(f64, f64)>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ArchiveQuery {
    pub fn for_cells(cells: &[&Cell], year: i32) -> Result<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| anyhow!("Year {} is out of range", year))?;
        let end_date = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| anyhow!("Year {} is out of range", year))?;

        Ok(ArchiveQuery {
            locations: cells.iter().map(|c| (c.lat, c.lon)).collect(),
            start_date,
            end_date,
        })
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let latitudes = join(self.locations.iter().map(|(lat, _)| lat));
        let longitudes = join(self.locations.iter().map(|(_, lon)| lon));

        vec![
            ("latitude", latitudes),
            ("longitude", longitudes),
            ("start_date", self.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", self.end_date.format("%Y-%m-%d").to_string()),
            ("hourly", HOURLY_METRICS.to_string()),
            ("daily", DAILY_METRICS.to_string()),
            ("timezone", TIMEZONE.to_string()),
            ("wind_speed_unit", WIND_SPEED_UNIT.to_string()),
        ]
    }
}

fn join<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Status and raw body of a completed request.
#[derive(Debug, Clone)]
pub struct ArchiveResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network request failed")]
    Network(#[source] reqwest::Error),

    #[error("Failed to read response body")]
    Body(#[source] reqwest::Error),
}

/// Performs a GET for a query. Only the transport is abstracted; status
/// handling lives with the caller.
pub trait ArchiveApi {
    async fn get(&self, query: &ArchiveQuery) -> Result<ArchiveResponse, TransportError>;
}

pub struct OpenMeteoArchive {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenMeteoArchive {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;

        Ok(OpenMeteoArchive {
            client,
            endpoint: settings.endpoint.clone(),
            timeout: settings.request_timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(e)
        }
    }
}

impl ArchiveApi for OpenMeteoArchive {
    async fn get(&self, query: &ArchiveQuery) -> Result<ArchiveResponse, TransportError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .build()
            .map_err(TransportError::Network)?;

        debug!("GET {}", request.url());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| match self.classify(e) {
            TransportError::Network(e) => TransportError::Body(e),
            other => other,
        })?;

        Ok(ArchiveResponse { status, body })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::{generate_cells, BoundingBox};

    fn cells() -> Vec<Cell> {
        let bbox = BoundingBox {
            min_lat: 47.0,
            max_lat: 55.2,
            min_lon: 5.5,
            max_lon: 15.2,
        };
        generate_cells(&bbox, 10, 5)
    }

    #[test]
    fn should_pair_coordinates_in_cell_order() {
        let cells = cells();
        let picked = vec![&cells[0], &cells[1], &cells[7]];

        let query = ArchiveQuery::for_cells(&picked, 2024).unwrap();
        let params = query.params();

        assert_eq!(query.location_count(), 3);
        assert_eq!(params[0], ("latitude", "47.41,47.41,48.23".to_string()));
        assert_eq!(params[1], ("longitude", "6.47,8.41,10.35".to_string()));
    }

    #[test]
    fn should_cover_full_calendar_year() {
        let cells = cells();
        let query = ArchiveQuery::for_cells(&[&cells[0]], 2023).unwrap();
        let params = query.params();

        assert!(params.contains(&("start_date", "2023-01-01".to_string())));
        assert!(params.contains(&("end_date", "2023-12-31".to_string())));
        assert!(params.contains(&("timezone", "GMT".to_string())));
        assert!(params.contains(&("wind_speed_unit", "ms".to_string())));
        assert!(params.contains(&("daily", DAILY_METRICS.to_string())));
        assert!(params.contains(&("hourly", HOURLY_METRICS.to_string())));
    }

    #[test]
    fn should_reject_out_of_range_year() {
        let cells = cells();

        assert!(ArchiveQuery::for_cells(&[&cells[0]], i32::MAX).is_err());
    }

    #[test]
    fn should_build_client_from_settings() {
        let archive = OpenMeteoArchive::new(&FetchSettings::default()).unwrap();

        assert_eq!(archive.timeout, Duration::from_secs(30));
        assert!(archive.endpoint.starts_with("https://archive-api.open-meteo.com"));
    }
}

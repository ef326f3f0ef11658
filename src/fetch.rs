//! The fetch loop: years, then batches, one call in flight at a time.
//!
//! Each batch either gets skipped (nothing missing), fetched and merged,
//! abandoned after bounded retries, or aborts the whole run on a 429.

use anyhow::{anyhow, bail, Context, Error, Result};
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    cache::{Cache, CacheStore, WeatherRecord},
    cli::create_spinner,
    config::FetchSettings,
    download::{ArchiveApi, ArchiveQuery},
    grid::Cell,
    plan::{missing, plan},
    session::Session,
};

#[derive(Debug)]
pub enum Outcome {
    Completed,
    RateLimited,
    /// The cache could not be written or a query could not be built.
    Failed(Error),
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub session: Session,
}

/// Result of the bounded retry loop for one batch.
#[derive(Debug)]
pub enum Attempt {
    Fetched(Vec<Value>),
    GaveUp,
    RateLimited,
}

enum Failure {
    RateLimited,
    Transient(Error),
}

/// Fetches every missing (year, cell) pair, saving after each successful batch.
///
/// The report always carries the session, so the call tally is available
/// however the run ended. Failed batches are logged and left for the next run.
pub async fn run<A: ArchiveApi>(
    api: &A,
    store: &CacheStore,
    cells: &[Cell],
    years: &[i32],
    settings: &FetchSettings,
) -> RunReport {
    let mut session = Session::new();

    let outcome = match fetch_years(api, store, cells, years, settings, &mut session).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::Failed(e),
    };

    RunReport { outcome, session }
}

async fn fetch_years<A: ArchiveApi>(
    api: &A,
    store: &CacheStore,
    cells: &[Cell],
    years: &[i32],
    settings: &FetchSettings,
    session: &mut Session,
) -> Result<Outcome> {
    let mut cache = store.load();
    let batches = plan(cells, settings.batch_size);

    info!(
        "Starting progressive fetch for {} locations, years: {:?}",
        cells.len(),
        years
    );

    for &year in years {
        info!("=== Fetching data for year {} ===", year);

        for batch in &batches {
            let missing = missing(batch, &cache, year);

            if missing.is_empty() {
                info!(
                    "Skipping batch {}/{} - already fetched",
                    batch.number, batch.total
                );
                continue;
            }

            let query = ArchiveQuery::for_cells(&missing, year)?;

            info!(
                "Fetching batch {}/{} ({} missing cells)",
                batch.number,
                batch.total,
                query.location_count()
            );

            match fetch_with_retry(api, &query, settings, session).await {
                Attempt::RateLimited => return Ok(Outcome::RateLimited),
                Attempt::GaveUp => {
                    error!(
                        "Could not fetch batch {}/{} for {} after {} attempts",
                        batch.number, batch.total, year, settings.max_retries
                    );
                }
                Attempt::Fetched(entries) => match merge(&mut cache, year, &missing, &entries) {
                    Ok(merged) => {
                        store.save(&cache).with_context(|| {
                            format!("Could not record batch {} for {}", batch.number, year)
                        })?;
                        debug!(
                            "Saved {} of {} cells to `{}`",
                            merged,
                            missing.len(),
                            store.path().display()
                        );
                    }
                    Err(e) => error!(
                        "Discarding batch {}/{} for {}: {:#}",
                        batch.number, batch.total, year, e
                    ),
                },
            }

            throttle(settings).await;
        }
    }

    info!("Done fetching all specified years");

    Ok(Outcome::Completed)
}

/// Issues the query up to `max_retries` times, waiting `retry_delay` between
/// attempts. Every attempt counts towards the session, the 429 included.
pub async fn fetch_with_retry<A: ArchiveApi>(
    api: &A,
    query: &ArchiveQuery,
    settings: &FetchSettings,
    session: &mut Session,
) -> Attempt {
    for attempt in 1..=settings.max_retries {
        session.increment();

        match request(api, query).await {
            Ok(entries) => return Attempt::Fetched(entries),
            Err(Failure::RateLimited) => {
                warn!("Rate limit hit (429)");
                return Attempt::RateLimited;
            }
            Err(Failure::Transient(e)) if attempt < settings.max_retries => {
                warn!(
                    "Request failed: {:#}. Retrying in {}s ({}/{})",
                    e,
                    settings.retry_delay.as_secs(),
                    attempt,
                    settings.max_retries
                );
                sleep(settings.retry_delay).await;
            }
            Err(Failure::Transient(e)) => {
                warn!(
                    "Request failed: {:#} ({}/{})",
                    e, attempt, settings.max_retries
                );
            }
        }
    }

    Attempt::GaveUp
}

async fn request<A: ArchiveApi>(api: &A, query: &ArchiveQuery) -> Result<Vec<Value>, Failure> {
    let response = api
        .get(query)
        .await
        .map_err(|e| Failure::Transient(e.into()))?;

    if response.status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Failure::RateLimited);
    }
    if !response.status.is_success() {
        return Err(Failure::Transient(anyhow!(
            "Server responded with {}",
            response.status
        )));
    }

    let body: Value = serde_json::from_str(&response.body)
        .context("Response body is not valid JSON")
        .map_err(Failure::Transient)?;

    Ok(normalise(body))
}

/// A single-location response arrives as a bare object rather than a list.
pub fn normalise(body: Value) -> Vec<Value> {
    match body {
        Value::Array(entries) => entries,
        other => vec![other],
    }
}

/// Stores the `i`-th entry as the record of the `i`-th cell. Entries carrying
/// an error marker are skipped so that cell stays missing.
///
/// Fails without touching the cache if the counts differ, since the pairing
/// could not be trusted.
pub fn merge(cache: &mut Cache, year: i32, cells: &[&Cell], entries: &[Value]) -> Result<usize> {
    if entries.len() != cells.len() {
        bail!(
            "requested {} locations but received {} results",
            cells.len(),
            entries.len()
        );
    }

    let mut merged = 0;

    for (cell, entry) in cells.iter().zip(entries) {
        if let Some(reason) = upstream_error(entry) {
            warn!("Error in data for {}: {}", cell.id, reason);
            continue;
        }

        match WeatherRecord::from_entry(cell, entry) {
            Ok(record) => {
                cache.insert(year, record);
                merged += 1;
            }
            Err(e) => warn!("Skipping {}: {:#}", cell.id, e),
        }
    }

    Ok(merged)
}

fn upstream_error(entry: &Value) -> Option<String> {
    let Some(object) = entry.as_object() else {
        return Some("result is not an object".to_string());
    };

    match object.get("error") {
        None | Some(Value::Bool(false)) | Some(Value::Null) => None,
        Some(_) => Some(
            object
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API Error")
                .to_string(),
        ),
    }
}

async fn throttle(settings: &FetchSettings) {
    let delay = settings.sleep_between_batches;
    if delay.is_zero() {
        return;
    }

    let bar = create_spinner(format!("Sleeping {}s before next batch...", delay.as_secs()));
    sleep(delay).await;
    bar.finish_and_clear();
}

// -- Tests -------------------------------------------------------------------

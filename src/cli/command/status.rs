//! Reports cache coverage without touching the network.

use anyhow::Result;

use crate::{
    cache::{Cache, CacheStore},
    cli::Target,
    grid::Cell,
    plan::{missing, plan},
};

use super::make_config;

#[derive(Debug, PartialEq)]
pub struct YearCoverage {
    pub year: i32,
    pub cached: usize,
    pub cells: usize,
    pub pending_batches: usize,
    pub batches: usize,
}

pub fn status(target: &Target) -> Result<String> {
    let config = make_config(target)?;
    let cells = config.grid.cells();
    let store = CacheStore::new(&config.cache_path);
    let cache = store.load();

    let mut lines = vec![format!("Cache `{}`", store.path().display())];

    for year in &config.years {
        let c = coverage(&cache, &cells, *year, config.fetch.batch_size);
        lines.push(format!(
            "  {}: {}/{} cells cached, {} of {} batches pending",
            c.year, c.cached, c.cells, c.pending_batches, c.batches
        ));
    }

    let others: Vec<&str> = cache
        .years()
        .filter(|y| !config.years.iter().any(|wanted| wanted.to_string() == *y))
        .collect();
    if !others.is_empty() {
        lines.push(format!("  Other years in cache: {}", others.join(", ")));
    }

    Ok(lines.join("\n"))
}

pub fn coverage(cache: &Cache, cells: &[Cell], year: i32, batch_size: usize) -> YearCoverage {
    let batches = plan(cells, batch_size);
    let pending: Vec<usize> = batches
        .iter()
        .map(|batch| missing(batch, cache, year).len())
        .collect();

    YearCoverage {
        year,
        cached: cells.len() - pending.iter().sum::<usize>(),
        cells: cells.len(),
        pending_batches: pending.iter().filter(|&&n| n > 0).count(),
        batches: batches.len(),
    }
}

// -- Tests -------------------------------------------------------------------

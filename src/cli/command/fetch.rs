use anyhow::Result;
use log::info;

use crate::{
    cache::CacheStore,
    cli::Target,
    download::OpenMeteoArchive,
    fetch::{run, Outcome},
};

use super::make_config;

pub async fn fetch(target: &Target) -> Result<Outcome> {
    let config = make_config(target)?;
    let cells = config.grid.cells();
    let store = CacheStore::new(&config.cache_path);
    let api = OpenMeteoArchive::new(&config.fetch)?;

    info!("Using cache `{}`", store.path().display());

    let report = run(&api, &store, &cells, &config.years, &config.fetch).await;

    println!("\n{}", report.session);

    Ok(report.outcome)
}

// -- Tests -------------------------------------------------------------------

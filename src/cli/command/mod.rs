pub mod fetch;
pub mod grid;
pub mod status;

use anyhow::Result;
pub use fetch::fetch;
pub use grid::grid;
pub use status::status;

use crate::{cli::Target, config::Config};

/// Default configuration with the command line overrides applied, validated.
pub fn make_config(target: &Target) -> Result<Config> {
    let config = Config::default().with_overrides(target.cache.clone(), &target.years);
    config.validate()?;

    Ok(config)
}

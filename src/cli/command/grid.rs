use anyhow::Result;

use crate::config::Config;

/// Renders the default grid as a JSON array of cells.
pub fn grid() -> Result<String> {
    let config = Config::default();
    config.grid.validate()?;

    Ok(serde_json::to_string_pretty(&config.grid.cells())?)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use serde_json::Value;

    use super::*;

    #[test]
    fn should_render_all_cells() {
        let rendered: Value = serde_json::from_str(&grid().unwrap()).unwrap();
        let cells = rendered.as_array().unwrap();

        assert_eq!(cells.len(), 50);
        assert_eq!(cells[0]["id"], "cell-0-0");
        assert_eq!(cells[0]["r"], 0);
        assert_eq!(cells[0]["lat"], 47.41);
        assert_eq!(cells[49]["id"], "cell-9-4");
    }
}

//! Splits a bounding box into a fixed grid of cells.

use serde::Serialize;

use crate::config::ConfigError;

/// Region extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// A bounding box together with its grid resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub bbox: BoundingBox,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.bbox;
        if !(b.min_lat.is_finite() && b.max_lat.is_finite() && b.min_lat < b.max_lat) {
            return Err(ConfigError::Latitude {
                min: b.min_lat,
                max: b.max_lat,
            });
        }
        if !(b.min_lon.is_finite() && b.max_lon.is_finite() && b.min_lon < b.max_lon) {
            return Err(ConfigError::Longitude {
                min: b.min_lon,
                max: b.max_lon,
            });
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }

        Ok(())
    }

    pub fn cells(&self) -> Vec<Cell> {
        generate_cells(&self.bbox, self.rows, self.cols)
    }
}

/// One tile of the grid. `lat`/`lon` is the rounded center used as the query location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub id: String,
    #[serde(rename = "r")]
    pub row: usize,
    #[serde(rename = "c")]
    pub col: usize,
    pub lat: f64,
    pub lon: f64,
    /// `[[min_lat, min_lon], [max_lat, max_lon]]`
    pub bounds: [[f64; 2]; 2],
}

/// Generates `rows * cols` cells in row-major order.
///
/// The order is stable across runs and decides batch membership, so caches
/// written by earlier runs stay valid as long as the bounding box and resolution are unchanged.
pub fn generate_cells(bbox: &BoundingBox, rows: usize, cols: usize) -> Vec<Cell> {
    let lat_step = (bbox.max_lat - bbox.min_lat) / rows as f64;
    let lon_step = (bbox.max_lon - bbox.min_lon) / cols as f64;

    let mut cells = Vec::with_capacity(rows * cols);

    for r in 0..rows {
        for c in 0..cols {
            let lat_min = bbox.min_lat + r as f64 * lat_step;
            let lat_max = lat_min + lat_step;
            let lon_min = bbox.min_lon + c as f64 * lon_step;
            let lon_max = lon_min + lon_step;

            cells.push(Cell {
                id: cell_id(r, c),
                row: r,
                col: c,
                lat: round4(lat_min + lat_step / 2.0),
                lon: round4(lon_min + lon_step / 2.0),
                bounds: [[lat_min, lon_min], [lat_max, lon_max]],
            });
        }
    }

    cells
}

pub fn cell_id(row: usize, col: usize) -> String {
    format!("cell-{}-{}", row, col)
}

// Rounds on the exact decimal expansion rather than on `value * 1e4`.
fn round4(value: f64) -> f64 {
    format!("{:.4}", value).parse().unwrap_or(value)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    fn area(cell: &Cell) -> f64 {
        let [[lat_min, lon_min], [lat_max, lon_max]] = cell.bounds;
        (lat_max - lat_min) * (lon_max - lon_min)
    }

    fn germany() -> BoundingBox {
        BoundingBox {
            min_lat: 47.0,
            max_lat: 55.2,
            min_lon: 5.5,
            max_lon: 15.2,
        }
    }

    #[test]
    fn should_generate_rows_times_cols_cells() {
        let cells = generate_cells(&germany(), 10, 5);

        assert_eq!(cells.len(), 50);

        let ids: HashSet<&str> = cells.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn should_match_first_cell_geometry() {
        let cells = generate_cells(&germany(), 10, 5);
        let first = &cells[0];

        assert_eq!(first.id, "cell-0-0");
        assert_eq!(first.lat, 47.41);
        assert_eq!(first.lon, 6.47);

        let [[lat_min, lon_min], [lat_max, lon_max]] = first.bounds;
        assert!((lat_min - 47.0).abs() < 1e-9);
        assert!((lon_min - 5.5).abs() < 1e-9);
        assert!((lat_max - 47.82).abs() < 1e-9);
        assert!((lon_max - 7.44).abs() < 1e-9);
    }

    #[test]
    fn should_order_cells_row_major() {
        let cells = generate_cells(&germany(), 3, 4);
        let order: Vec<(usize, usize)> = cells.iter().map(|c| (c.row, c.col)).collect();

        let mut expected = Vec::new();
        for r in 0..3 {
            for c in 0..4 {
                expected.push((r, c));
            }
        }

        assert_eq!(order, expected);
        assert_eq!(cells[5].id, "cell-1-1");
    }

    #[test]
    fn should_tile_the_bounding_box() {
        for (rows, cols) in [(1, 1), (10, 5), (7, 3), (13, 17)] {
            let bbox = germany();
            let cells = generate_cells(&bbox, rows, cols);
            let total: f64 = cells.iter().map(area).sum();

            let expected = (bbox.max_lat - bbox.min_lat) * (bbox.max_lon - bbox.min_lon);
            assert!((total - expected).abs() < 1e-9, "{}x{}", rows, cols);

            let last = cells.last().unwrap();
            assert!((last.bounds[1][0] - bbox.max_lat).abs() < 1e-9);
            assert!((last.bounds[1][1] - bbox.max_lon).abs() < 1e-9);
        }
    }

    #[test]
    fn should_share_edges_between_neighbours() {
        let cells = generate_cells(&germany(), 2, 2);

        // cell-0-0 max lon is cell-0-1 min lon; cell-0-0 max lat is cell-1-0 min lat
        assert_eq!(cells[0].bounds[1][1], cells[1].bounds[0][1]);
        assert_eq!(cells[0].bounds[1][0], cells[2].bounds[0][0]);
    }

    #[test]
    fn should_round_to_four_decimals() {
        assert_eq!(round4(47.41000000000001), 47.41);
        assert_eq!(round4(6.469999999), 6.47);
        assert_eq!(round4(-3.14159), -3.1416);
    }

    #[test]
    fn should_round_stored_value_not_decimal_spelling() {
        // both are stored just below the midpoint
        assert_eq!(round4(2.00005), 2.0);
        assert_eq!(round4(0.00015), 0.0001);
        assert_eq!(round4(47.41005), 47.41);
        // stored just above
        assert_eq!(round4(1.00005), 1.0001);
        // exact tie goes to even
        assert_eq!(round4(0.03125), 0.0312);
    }

    #[test]
    fn should_reject_invalid_grid() {
        let mut spec = GridSpec {
            bbox: germany(),
            rows: 10,
            cols: 5,
        };
        assert!(spec.validate().is_ok());

        spec.rows = 0;
        assert_eq!(
            spec.validate(),
            Err(ConfigError::EmptyGrid { rows: 0, cols: 5 })
        );

        spec.rows = 10;
        spec.bbox.max_lat = spec.bbox.min_lat;
        assert!(matches!(spec.validate(), Err(ConfigError::Latitude { .. })));

        spec.bbox = germany();
        spec.bbox.min_lon = f64::NAN;
        assert!(matches!(spec.validate(), Err(ConfigError::Longitude { .. })));
    }
}

//! Slices the grid into batches and works out what is still missing.

use crate::{cache::Cache, grid::Cell};

/// A contiguous run of cells fetched together in one call.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 1-based position, for progress output.
    pub number: usize,
    pub total: usize,
    pub cells: &'a [Cell],
}

pub fn plan(cells: &[Cell], batch_size: usize) -> Vec<Batch<'_>> {
    let total = cells.len().div_ceil(batch_size);

    cells
        .chunks(batch_size)
        .enumerate()
        .map(|(idx, chunk)| Batch {
            number: idx + 1,
            total,
            cells: chunk,
        })
        .collect()
}

/// Cells of `batch` with no record for `year`, in batch order.
pub fn missing<'a>(batch: &Batch<'a>, cache: &Cache, year: i32) -> Vec<&'a Cell> {
    batch
        .cells
        .iter()
        .filter(|cell| !cache.contains(year, &cell.id))
        .collect()
}

// -- Tests -------------------------------------------------------------------

//! Elevation mapping: per-cell height aggregation from streaming laser
//! scans, plus conservative interpolation of unmeasured cells.

use nalgebra::Point3;

use crate::elevation_cell::ElevationCell;
use crate::sliding_grid::SlidingGrid;

/// A [`SlidingGrid`] of [`ElevationCell`].
pub struct ElevationGrid {
    grid: SlidingGrid<ElevationCell>,
}

impl ElevationGrid {
    pub fn new(width: usize, height: usize, resolution: f64, origin: Point3<f64>) -> Self {
        ElevationGrid { grid: SlidingGrid::new(width, height, resolution, origin) }
    }

    pub fn grid(&self) -> &SlidingGrid<ElevationCell> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut SlidingGrid<ElevationCell> {
        &mut self.grid
    }

    /// Adds every in-grid point's Z as a height measurement to its cell;
    /// points outside the footprint are silently dropped.
    pub fn add_scan(&mut self, points_world: &[Point3<f64>]) {
        for p in points_world {
            if let Some(cell) = self.grid.entry_world_mut(p) {
                cell.add_measurement(p.z);
            }
        }
    }

    /// Writes a conservatively interpolated copy of this grid into
    /// `target`. Measured cells are copied through unchanged. An
    /// unmeasured cell is filled only when bracketed by measured cells on
    /// two opposite sides: either row `y-1` and row `y+1` each contain at
    /// least one measured cell among their 3-cell span centered at `x`, or
    /// the symmetric condition holds for columns `x-1`/`x+1`.
    pub fn smooth_into(&self, target: &mut ElevationGrid) {
        target.grid = SlidingGrid::new(
            self.grid.width(),
            self.grid.height(),
            self.grid.resolution(),
            self.grid.origin(),
        );

        for (x, y) in self.grid.iter_indices() {
            let src = self.grid.entry(x, y).expect("in range by construction");
            if src.measurement_count() > 0 {
                *target.grid.entry_mut(x, y).unwrap() = src.clone();
                continue;
            }

            if let Some(h) = self.interpolate_at(x, y) {
                target.grid.entry_mut(x, y).unwrap().set_interpolated(h);
            }
        }
    }

    fn row_has_measurement(&self, row: i64, x_center: i64) -> bool {
        (x_center - 1..=x_center + 1).any(|x| {
            self.grid
                .entry(x, row)
                .map(|c| c.measurement_count() > 0)
                .unwrap_or(false)
        })
    }

    fn column_has_measurement(&self, col: i64, y_center: i64) -> bool {
        (y_center - 1..=y_center + 1).any(|y| {
            self.grid
                .entry(col, y)
                .map(|c| c.measurement_count() > 0)
                .unwrap_or(false)
        })
    }

    fn interpolate_at(&self, x: i64, y: i64) -> Option<f64> {
        let bracketed_rows = self.row_has_measurement(y - 1, x) && self.row_has_measurement(y + 1, x);
        let bracketed_cols = self.column_has_measurement(x - 1, y) && self.column_has_measurement(x + 1, y);

        if !bracketed_rows && !bracketed_cols {
            return None;
        }

        let mut neighbor_medians = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(c) = self.grid.entry(x + dx, y + dy) {
                    if c.measurement_count() > 0 {
                        neighbor_medians.push(c.median());
                    }
                }
            }
        }
        if neighbor_medians.is_empty() {
            return None;
        }
        neighbor_medians.sort_by(|a, b| a.partial_cmp(b).expect("median is not NaN"));
        let n = neighbor_medians.len();
        Some(if n % 2 == 1 {
            neighbor_medians[n / 2]
        } else {
            (neighbor_medians[n / 2 - 1] + neighbor_medians[n / 2]) / 2.0
        })
    }
}

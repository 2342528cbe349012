//! World-anchored 2D grid that can recenter without losing overlapping
//! content.

use nalgebra::Point3;

/// Types storable in a [`SlidingGrid`] need an explicit "no data" value to
/// reset cells slid out of the grid's footprint into.
pub trait GridCell: Clone {
    fn empty() -> Self;
}

/// A finite grid whose world origin can translate, preserving the cells
/// that remain within the new footprint.
///
/// `idx(p) = floor((p - origin) / resolution + (width/2, height/2))` maps a
/// world point to a cell index; it lies in `[0,width) x [0,height)` iff `p`
/// is within the grid's footprint.
#[derive(Debug, Clone)]
pub struct SlidingGrid<T: GridCell> {
    width: usize,
    height: usize,
    resolution: f64,
    origin: Point3<f64>,
    cells: Vec<T>,
}

impl<T: GridCell> SlidingGrid<T> {
    pub fn new(width: usize, height: usize, resolution: f64, origin: Point3<f64>) -> Self {
        assert!(width > 0 && height > 0, "grid must have positive extent");
        assert!(resolution > 0.0, "resolution must be positive");
        SlidingGrid {
            width,
            height,
            resolution,
            origin,
            cells: vec![T::empty(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    fn linear_index(&self, ix: i64, iy: i64) -> Option<usize> {
        if self.in_grid(ix, iy) {
            Some(iy as usize * self.width + ix as usize)
        } else {
            None
        }
    }

    pub fn in_grid(&self, ix: i64, iy: i64) -> bool {
        ix >= 0 && iy >= 0 && (ix as usize) < self.width && (iy as usize) < self.height
    }

    /// Maps a world-frame XY point to a grid cell index, if inside the
    /// footprint. Only X/Y participate; the grid is 2D.
    pub fn get_grid_point(&self, p: &Point3<f64>) -> Option<(i64, i64)> {
        let hw = self.width as f64 / 2.0;
        let hh = self.height as f64 / 2.0;
        let fx = (p.x - self.origin.x) / self.resolution + hw;
        let fy = (p.y - self.origin.y) / self.resolution + hh;
        let ix = fx.floor() as i64;
        let iy = fy.floor() as i64;
        if self.in_grid(ix, iy) {
            Some((ix, iy))
        } else {
            None
        }
    }

    pub fn entry(&self, ix: i64, iy: i64) -> Option<&T> {
        self.linear_index(ix, iy).map(|i| &self.cells[i])
    }

    pub fn entry_mut(&mut self, ix: i64, iy: i64) -> Option<&mut T> {
        self.linear_index(ix, iy).map(move |i| &mut self.cells[i])
    }

    pub fn entry_world(&self, p: &Point3<f64>) -> Option<&T> {
        self.get_grid_point(p).and_then(|(ix, iy)| self.entry(ix, iy))
    }

    pub fn entry_world_mut(&mut self, p: &Point3<f64>) -> Option<&mut T> {
        match self.get_grid_point(p) {
            Some((ix, iy)) => self.entry_mut(ix, iy),
            None => None,
        }
    }

    pub fn iter_indices(&self) -> impl Iterator<Item = (i64, i64)> {
        let w = self.width as i64;
        let h = self.height as i64;
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }

    /// World-space center of cell `(ix, iy)`.
    pub fn cell_center(&self, ix: i64, iy: i64) -> Point3<f64> {
        let hw = self.width as f64 / 2.0;
        let hh = self.height as f64 / 2.0;
        Point3::new(
            self.origin.x + (ix as f64 - hw + 0.5) * self.resolution,
            self.origin.y + (iy as f64 - hh + 0.5) * self.resolution,
            self.origin.z,
        )
    }

    /// Recenters the grid on `new_center_world`. Cells whose new index maps
    /// to a still-valid old index are moved across byte-for-byte; all
    /// others reset to [`GridCell::empty`].
    pub fn move_grid(&mut self, new_center_world: Point3<f64>) {
        let dx = ((new_center_world.x - self.origin.x) / self.resolution).round() as i64;
        let dy = ((new_center_world.y - self.origin.y) / self.resolution).round() as i64;

        if dx == 0 && dy == 0 {
            // origin still nudges to track the fractional remainder the
            // caller asked for (z, and any sub-cell drift).
            self.origin = new_center_world;
            return;
        }

        let mut new_cells = vec![T::empty(); self.width * self.height];
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let old_x = x + dx;
                let old_y = y + dy;
                if let Some(old_idx) = self.linear_index(old_x, old_y) {
                    let new_idx = y as usize * self.width + x as usize;
                    new_cells[new_idx] = self.cells[old_idx].clone();
                }
            }
        }
        self.cells = new_cells;
        self.origin = Point3::new(
            self.origin.x + dx as f64 * self.resolution,
            self.origin.y + dy as f64 * self.resolution,
            new_center_world.z,
        );
    }

    /// Resets every cell to [`GridCell::empty`] without moving the origin.
    pub fn clear(&mut self) {
        for c in self.cells.iter_mut() {
            *c = T::empty();
        }
    }
}

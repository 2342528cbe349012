//! Step-height terrain classification and region stamping.

use nalgebra::{Point3, Vector3};

use crate::elevation_grid::ElevationGrid;
use crate::error::MapError;
use crate::geometry::Pose;
use crate::sliding_grid::{GridCell, SlidingGrid};

/// Closed sum type of terrain classification tags. Grid cells store the tag
/// directly (no payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Unclassified,
    Traversable,
    Obstacle,
    UnknownObstacle,
}

impl GridCell for Classification {
    fn empty() -> Self {
        Classification::Unclassified
    }
}

/// A [`SlidingGrid`] of [`Classification`], derived from an [`ElevationGrid`]
/// via a local step-height test.
pub struct TraversabilityGrid {
    grid: SlidingGrid<Classification>,
    max_step_size: f64,
}

impl TraversabilityGrid {
    pub fn new(width: usize, height: usize, resolution: f64, origin: Point3<f64>, max_step_size: f64) -> Self {
        TraversabilityGrid {
            grid: SlidingGrid::new(width, height, resolution, origin),
            max_step_size,
        }
    }

    pub fn grid(&self) -> &SlidingGrid<Classification> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut SlidingGrid<Classification> {
        &mut self.grid
    }

    /// Recomputes every cell's classification from `elev` (expected to be
    /// the smoothed elevation grid) via a local step-height test against
    /// its 8 neighbors.
    pub fn classify_from(&mut self, elev: &ElevationGrid) {
        for (x, y) in self.grid.iter_indices() {
            let c = elev.grid().entry(x, y).expect("same dims as elevation grid");

            if c.is_empty() {
                *self.grid.entry_mut(x, y).unwrap() = Classification::Unclassified;
                continue;
            }

            let (cur_height, mut class) = if c.measurement_count() == 0 {
                (c.maximum(), Classification::UnknownObstacle)
            } else {
                (c.median(), Classification::Traversable)
            };

            for (nx, ny) in neighbors8(x, y) {
                let Some(n) = elev.grid().entry(nx, ny) else { continue };

                let nh = if n.measurement_count() > 0 {
                    n.median()
                } else if n.maximum() == f64::NEG_INFINITY {
                    continue;
                } else {
                    n.minimum()
                };

                if (nh - cur_height).abs() > self.max_step_size {
                    class = Classification::Obstacle;
                }
            }

            *self.grid.entry_mut(x, y).unwrap() = class;
        }
    }

    /// Overwrites every cell within Euclidean `radius` of `pose.position`
    /// that is currently `Unclassified` or `UnknownObstacle` with `class`.
    /// Upgrading to `Traversable` also seeds the paired elevation cell with
    /// its own current median, so subsequent smoothing treats it as known.
    pub fn mark_radius_as(
        &mut self,
        pose: &Pose,
        radius: f64,
        class: Classification,
        elev: &mut ElevationGrid,
    ) -> Result<(), MapError> {
        if self.grid.get_grid_point(&pose.position).is_none() {
            return Err(MapError::OutOfGrid);
        }

        let cells: Vec<(i64, i64)> = self
            .grid
            .iter_indices()
            .filter(|&(x, y)| {
                let center = self.grid.cell_center(x, y);
                (center - pose.position).norm() <= radius
            })
            .collect();

        for (x, y) in cells {
            self.stamp_cell(x, y, class, elev);
        }
        Ok(())
    }

    /// Overwrites every cell inside a `width x height` rectangle, offset
    /// forward by `forward_offset` along `pose`'s heading and rotated into
    /// world coordinates, using the same overwrite policy as
    /// [`Self::mark_radius_as`].
    pub fn mark_rect_as(
        &mut self,
        pose: &Pose,
        width: f64,
        height: f64,
        forward_offset: f64,
        class: Classification,
        elev: &mut ElevationGrid,
    ) -> Result<(), MapError> {
        if self.grid.get_grid_point(&pose.position).is_none() {
            return Err(MapError::OutOfGrid);
        }

        let heading = pose.heading();
        let forward = Vector3::new(heading.cos(), heading.sin(), 0.0);
        let lateral = Vector3::new(-heading.sin(), heading.cos(), 0.0);
        let center = pose.position + forward * forward_offset;

        let half_w = width / 2.0;
        let half_h = height / 2.0;

        let cells: Vec<(i64, i64)> = self
            .grid
            .iter_indices()
            .filter(|&(x, y)| {
                let p = self.grid.cell_center(x, y);
                let rel = p - center;
                let along = rel.dot(&forward);
                let across = rel.dot(&lateral);
                along.abs() <= half_h && across.abs() <= half_w
            })
            .collect();

        for (x, y) in cells {
            self.stamp_cell(x, y, class, elev);
        }
        Ok(())
    }

    fn stamp_cell(&mut self, x: i64, y: i64, class: Classification, elev: &mut ElevationGrid) {
        let Some(cur) = self.grid.entry(x, y).copied() else { return };
        if cur != Classification::Unclassified && cur != Classification::UnknownObstacle {
            return;
        }
        *self.grid.entry_mut(x, y).unwrap() = class;

        if class == Classification::Traversable {
            if let Some(cell) = elev.grid_mut().entry_mut(x, y) {
                if cell.measurement_count() == 0 {
                    let seed = if cell.is_empty() { 0.0 } else { cell.median() };
                    cell.add_measurement(seed);
                }
            }
        }
    }
}

fn neighbors8(x: i64, y: i64) -> impl Iterator<Item = (i64, i64)> {
    (-1..=1).flat_map(move |dy| {
        (-1..=1).filter_map(move |dx| {
            if dx == 0 && dy == 0 {
                None
            } else {
                Some((x + dx, y + dy))
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_elevation_with_bump(size: usize, base: f64, bump_xy: Option<(i64, i64)>, bump_h: f64) -> ElevationGrid {
        let mut g = ElevationGrid::new(size, size, 1.0, Point3::new(0.0, 0.0, 0.0));
        let hw = size as f64 / 2.0;
        let pts: Vec<Point3<f64>> = (0..size as i64)
            .flat_map(|y| (0..size as i64).map(move |x| (x, y)))
            .map(|(x, y)| {
                let h = if bump_xy == Some((x, y)) { bump_h } else { base };
                Point3::new(x as f64 - hw + 0.5, y as f64 - hw + 0.5, h)
            })
            .collect();
        g.add_scan(&pts);
        g
    }

    fn flat_elevation(size: usize, h: f64) -> ElevationGrid {
        flat_elevation_with_bump(size, h, None, h)
    }

    #[test]
    fn unmeasured_cell_with_no_max_is_unclassified() {
        let elev = ElevationGrid::new(5, 5, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(5, 5, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);
        for (x, y) in trav.grid().iter_indices() {
            assert_eq!(*trav.grid().entry(x, y).unwrap(), Classification::Unclassified);
        }
    }

    // an isolated one-meter step surrounds itself with an obstacle halo.
    #[test]
    fn isolated_step_produces_obstacle_halo() {
        let elev = flat_elevation_with_bump(10, 0.0, Some((4, 4)), 1.0);

        let mut trav = TraversabilityGrid::new(10, 10, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);

        let (bx, by) = (4, 4);
        assert_eq!(*trav.grid().entry(bx, by).unwrap(), Classification::Obstacle);

        for (dx, dy) in neighbors8(bx, by) {
            assert_eq!(*trav.grid().entry(dx, dy).unwrap(), Classification::Obstacle);
        }

        // distant cell stays traversable
        let far = trav.grid().entry(0, 0).unwrap();
        assert_eq!(*far, Classification::Traversable);
    }

    #[test]
    fn flat_terrain_is_traversable() {
        let elev = flat_elevation(6, 0.0);
        let mut trav = TraversabilityGrid::new(6, 6, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);
        for (x, y) in trav.grid().iter_indices() {
            assert_eq!(*trav.grid().entry(x, y).unwrap(), Classification::Traversable);
        }
    }

    #[test]
    fn mark_radius_upgrades_unclassified_and_seeds_elevation() {
        let mut elev = ElevationGrid::new(10, 10, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(10, 10, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);

        let pose = Pose::from_xy_heading(0.0, 0.0, 0.0);
        trav.mark_radius_as(&pose, 1.5, Classification::Traversable, &mut elev).unwrap();

        let (cx, cy) = trav.grid().get_grid_point(&pose.position).unwrap();
        assert_eq!(*trav.grid().entry(cx, cy).unwrap(), Classification::Traversable);
        assert!(elev.grid().entry(cx, cy).unwrap().measurement_count() > 0);
    }

    #[test]
    fn mark_radius_does_not_overwrite_obstacle() {
        let mut elev = ElevationGrid::new(10, 10, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(10, 10, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        let pose = Pose::from_xy_heading(0.0, 0.0, 0.0);
        let (cx, cy) = trav.grid().get_grid_point(&pose.position).unwrap();
        *trav.grid_mut().entry_mut(cx, cy).unwrap() = Classification::Obstacle;

        trav.mark_radius_as(&pose, 1.5, Classification::Traversable, &mut elev).unwrap();
        assert_eq!(*trav.grid().entry(cx, cy).unwrap(), Classification::Obstacle);
    }

    #[test]
    fn mark_radius_out_of_grid_errors() {
        let mut elev = ElevationGrid::new(4, 4, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(4, 4, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        let pose = Pose::from_xy_heading(100.0, 100.0, 0.0);
        let err = trav.mark_radius_as(&pose, 1.0, Classification::Traversable, &mut elev).unwrap_err();
        assert_eq!(err, MapError::OutOfGrid);
    }

    #[test]
    fn mark_rect_upgrades_cells_ahead_of_pose_and_seeds_height_zero() {
        let mut elev = ElevationGrid::new(20, 20, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(20, 20, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);

        // pose faces +X; rectangle offset 3m ahead should land around (3,0)
        let pose = Pose::from_xy_heading(0.0, 0.0, 0.0);
        trav.mark_rect_as(&pose, 2.0, 2.0, 3.0, Classification::Traversable, &mut elev).unwrap();

        let (fx, fy) = trav.grid().get_grid_point(&Point3::new(3.0, 0.0, 0.0)).unwrap();
        assert_eq!(*trav.grid().entry(fx, fy).unwrap(), Classification::Traversable);
        let cell = elev.grid().entry(fx, fy).unwrap();
        assert_eq!(cell.measurement_count(), 1);
        assert_eq!(cell.median(), 0.0);

        // behind the pose, outside the rectangle, stays unclassified
        let (bx, by) = trav.grid().get_grid_point(&Point3::new(-3.0, 0.0, 0.0)).unwrap();
        assert_eq!(*trav.grid().entry(bx, by).unwrap(), Classification::Unclassified);
    }

    #[test]
    fn mark_rect_rotates_with_pose_heading() {
        let mut elev = ElevationGrid::new(20, 20, 1.0, Point3::new(0.0, 0.0, 0.0));
        let mut trav = TraversabilityGrid::new(20, 20, 1.0, Point3::new(0.0, 0.0, 0.0), 0.2);
        trav.classify_from(&elev);

        // pose facing +Y (90 deg): forward offset should land on +Y axis, not +X
        let pose = Pose::from_xy_heading(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        trav.mark_rect_as(&pose, 1.0, 1.0, 3.0, Classification::Traversable, &mut elev).unwrap();

        let (fx, fy) = trav.grid().get_grid_point(&Point3::new(0.0, 3.0, 0.0)).unwrap();
        assert_eq!(*trav.grid().entry(fx, fy).unwrap(), Classification::Traversable);

        let (ox, oy) = trav.grid().get_grid_point(&Point3::new(3.0, 0.0, 0.0)).unwrap();
        assert_eq!(*trav.grid().entry(ox, oy).unwrap(), Classification::Unclassified);
    }
}

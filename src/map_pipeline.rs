//! Orchestrates scan ingest, motion-triggered grid recentering, and the
//! elevation -> interpolation -> classification pipeline.

use log::{debug, info};
use nalgebra::Point3;

use crate::config::MapConfig;
use crate::elevation_grid::ElevationGrid;
use crate::error::MapError;
use crate::geometry::Pose;
use crate::grid_dump::GridDump;
use crate::traversability::{Classification, TraversabilityGrid};

/// One laser scan: per-beam ranges with an angular start/step and a
/// validity mask.
#[derive(Debug, Clone)]
pub struct LaserScan {
    pub ranges: Vec<f32>,
    pub angle_min: f32,
    pub angle_step: f32,
    pub valid: Vec<bool>,
}

impl LaserScan {
    /// Converts valid beams to points in the laser's own frame (Z = 0: a
    /// planar scanner).
    pub fn points_in_laser_frame(&self) -> Vec<Point3<f64>> {
        self.ranges
            .iter()
            .zip(self.valid.iter())
            .enumerate()
            .filter_map(|(i, (r, &valid))| {
                if !valid || !r.is_finite() {
                    return None;
                }
                let angle = self.angle_min as f64 + i as f64 * self.angle_step as f64;
                Some(Point3::new(*r as f64 * angle.cos(), *r as f64 * angle.sin(), 0.0))
            })
            .collect()
    }
}

/// Pull-based scan source the map pipeline's owning session drives. Scan
/// acquisition and the transforms are external collaborators; this
/// interface is the only seam the core depends on.
pub trait ScanSource {
    fn next_scan(&mut self) -> Option<LaserScan>;
}

/// An axis-aligned box in body frame to mask out of incoming scans (e.g. a
/// wheel footprint), configured at construction.
#[derive(Debug, Clone, Copy)]
pub struct MaskBox {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl MaskBox {
    fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.0 && p.x <= self.max.0 && p.y >= self.min.1 && p.y <= self.max.1
    }
}

/// Orchestrates the traversability map pipeline: scan ingest, motion
/// tracking, region stamping. Owns both the elevation grid and its derived
/// traversability grid.
pub struct MapPipeline {
    config: MapConfig,
    wheel_masks: Vec<MaskBox>,
    elevation: ElevationGrid,
    smoothed: ElevationGrid,
    traversability: TraversabilityGrid,
    last_body_to_odo: Option<Pose>,
    last_laser_to_odo: Option<Pose>,
}

impl MapPipeline {
    pub fn new(config: MapConfig, wheel_masks: Vec<MaskBox>) -> Self {
        let origin = Point3::new(0.0, 0.0, 0.0);
        MapPipeline {
            elevation: ElevationGrid::new(config.width, config.height, config.resolution, origin),
            smoothed: ElevationGrid::new(config.width, config.height, config.resolution, origin),
            traversability: TraversabilityGrid::new(
                config.width,
                config.height,
                config.resolution,
                origin,
                config.max_step_size,
            ),
            wheel_masks,
            config,
            last_body_to_odo: None,
            last_laser_to_odo: None,
        }
    }

    pub fn traversability(&self) -> &TraversabilityGrid {
        &self.traversability
    }

    pub fn traversability_mut(&mut self) -> &mut TraversabilityGrid {
        &mut self.traversability
    }

    pub fn elevation(&self) -> &ElevationGrid {
        &self.smoothed
    }

    /// Ingests one scan. Returns `true` iff the motion since the last
    /// accepted ingest passed the recompute thresholds and the caller
    /// should follow up with [`Self::compute_new_map`].
    pub fn ingest(&mut self, scan: &LaserScan, body_to_odo: Pose, laser_to_body: Pose) -> bool {
        let laser_to_odo = body_to_odo.compose(&laser_to_body);

        let (delta_d, delta_theta) = match self.last_laser_to_odo {
            Some(prev) => {
                let dd = prev.distance(&laser_to_odo);
                let cos_angle = prev.y_axis_world().dot(&laser_to_odo.y_axis_world()).clamp(-1.0, 1.0);
                (dd, cos_angle.acos())
            }
            None => (f64::INFINITY, f64::INFINITY), // first scan always triggers a recompute
        };

        self.maybe_recenter(&body_to_odo, delta_d);

        let accepted_points = self.filter_and_transform(scan, &body_to_odo, &laser_to_body);
        self.elevation.add_scan(&accepted_points);

        if self.last_laser_to_odo.is_some() && delta_d < 0.05 && delta_theta < 5f64.to_radians() {
            debug!("scan accepted, motion below recompute threshold (d={delta_d:.3}, theta={delta_theta:.3})");
            return false;
        }

        self.last_body_to_odo = Some(body_to_odo);
        self.last_laser_to_odo = Some(laser_to_odo);
        info!("scan ingested; motion threshold exceeded, caller should recompute map");
        true
    }

    /// Smooths the elevation grid and reclassifies the traversability grid
    /// from it. Call after an [`Self::ingest`] that returned `true`.
    pub fn compute_new_map(&mut self) {
        self.elevation.smooth_into(&mut self.smoothed);
        self.traversability.classify_from(&self.smoothed);
    }

    fn maybe_recenter(&mut self, body_to_odo: &Pose, delta_d: f64) {
        let grid = self.elevation.grid();
        let outside = grid.get_grid_point(&body_to_odo.position).is_none();

        if outside {
            // first scan / robot wholly outside the grid: recenter onto the robot
            self.recenter_all(body_to_odo.position);
            return;
        }

        let near_boundary = self.near_boundary(body_to_odo.position);
        if near_boundary {
            let heading = body_to_odo.heading();
            let forward = nalgebra::Vector3::new(heading.cos(), heading.sin(), 0.0);
            let advance = if delta_d.is_finite() { delta_d } else { 0.0 };
            let new_center = body_to_odo.position + forward * (advance * 2.0 / 3.0);
            self.recenter_all(new_center);
        }
    }

    fn near_boundary(&self, p: Point3<f64>) -> bool {
        let grid = self.elevation.grid();
        let hw = grid.width() as f64 / 2.0 * grid.resolution();
        let hh = grid.height() as f64 / 2.0 * grid.resolution();
        let dx = (p.x - grid.origin().x).abs();
        let dy = (p.y - grid.origin().y).abs();
        (hw - dx) < self.config.boundary_size || (hh - dy) < self.config.boundary_size
    }

    fn recenter_all(&mut self, center: Point3<f64>) {
        info!("recentering traversability map at ({:.2}, {:.2})", center.x, center.y);
        self.elevation.grid_mut().move_grid(center);
        self.smoothed.grid_mut().move_grid(center);
        self.traversability.grid_mut().move_grid(center);
    }

    fn filter_and_transform(&self, scan: &LaserScan, body_to_odo: &Pose, laser_to_body: &Pose) -> Vec<Point3<f64>> {
        scan.points_in_laser_frame()
            .into_iter()
            .map(|p| laser_to_body.transform_point(&p))
            .filter(|p_body| !self.wheel_masks.iter().any(|m| m.contains(p_body)))
            .map(|p_body| body_to_odo.transform_point(&p_body))
            .collect()
    }

    /// Row-major snapshot for a map consumer with no notion of the
    /// internal grid types.
    pub fn grid_dump(&self) -> GridDump {
        GridDump::from_maps(&self.smoothed, &self.traversability)
    }

    /// Convenience wrapper erroring out when the pose lies outside the
    /// traversability grid.
    pub fn mark_radius_as(&mut self, pose: &Pose, radius: f64, class: Classification) -> Result<(), MapError> {
        self.traversability.mark_radius_as(pose, radius, class, &mut self.smoothed)
    }

    /// Convenience wrapper over [`TraversabilityGrid::mark_rect_as`] for
    /// stamping a rectangular footprint (e.g. the robot's own body) through
    /// the pipeline, erroring out when the pose lies outside the
    /// traversability grid.
    pub fn mark_rect_as(
        &mut self,
        pose: &Pose,
        width: f64,
        height: f64,
        forward_offset: f64,
        class: Classification,
    ) -> Result<(), MapError> {
        self.traversability.mark_rect_as(pose, width, height, forward_offset, class, &mut self.smoothed)
    }
}

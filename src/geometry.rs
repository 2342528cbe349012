//! Pose representation and the small set of rigid-body transforms the map
//! pipeline and planner need.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// A robot or sensor pose in a world-fixed frame: position plus orientation.
///
/// Heading is derived, not stored: it is the yaw of `orientation` projected
/// onto the world Z axis (see [`Pose::heading`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Pose { position, orientation }
    }

    /// Pose at the origin with identity orientation.
    pub fn identity() -> Self {
        Pose {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Construct from a 2D position and a heading, at z = 0.
    pub fn from_xy_heading(x: f64, y: f64, heading: f64) -> Self {
        Pose {
            position: Point3::new(x, y, 0.0),
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, heading),
        }
    }

    /// Heading in radians: the world-Z-axis projection of `orientation`,
    /// i.e. the direction the rotated body-X axis points in the XY plane.
    pub fn heading(&self) -> f64 {
        let body_x = self.orientation * Vector3::x();
        body_x.y.atan2(body_x.x)
    }

    /// This pose expressed as a rigid-body transform, usable to compose
    /// frames (e.g. `body_to_odo * laser_to_body`).
    pub fn as_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
    }

    pub fn from_isometry(iso: Isometry3<f64>) -> Self {
        Pose {
            position: Point3::from(iso.translation.vector),
            orientation: iso.rotation,
        }
    }

    /// Compose `self` (e.g. body_to_odo) with `other` (e.g. laser_to_body)
    /// to get e.g. laser_to_odo, matching `self ∘ other` transform order.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose::from_isometry(self.as_isometry() * other.as_isometry())
    }

    /// Transform a point given in this pose's local frame into the parent
    /// frame this pose is expressed in.
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.as_isometry() * p
    }

    /// Unit vector along this pose's local Y axis, expressed in the parent
    /// frame. Used by [`crate::map_pipeline::MapPipeline`] to measure the
    /// laser's angular change between scans.
    pub fn y_axis_world(&self) -> Vector3<f64> {
        self.orientation * Vector3::y()
    }

    /// Euclidean distance between two pose positions.
    pub fn distance(&self, other: &Pose) -> f64 {
        (self.position - other.position).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn heading_of_identity_is_zero() {
        assert_relative_eq!(Pose::identity().heading(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn heading_round_trips_through_quaternion() {
        let p = Pose::from_xy_heading(0.0, 0.0, FRAC_PI_2);
        assert_relative_eq!(p.heading(), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn compose_translates_through_rotation() {
        let body_to_odo = Pose::from_xy_heading(1.0, 0.0, FRAC_PI_2);
        let laser_to_body = Pose::from_xy_heading(1.0, 0.0, 0.0);
        let laser_to_odo = body_to_odo.compose(&laser_to_body);
        // rotating (1,0,0) by +90deg about z gives (0,1,0), then translate by (1,0,0)
        assert_relative_eq!(laser_to_odo.position.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(laser_to_odo.position.y, 1.0, epsilon = 1e-9);
    }
}

//! Map consumer interface: a flattened, row-major snapshot of the
//! traversability map.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::elevation_grid::ElevationGrid;
use crate::traversability::{Classification, TraversabilityGrid};

/// Row-major snapshot of the map, suitable for serialization out to a
/// consumer that has no notion of `SlidingGrid`/`ElevationCell` types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDump {
    pub width: usize,
    pub height: usize,
    /// Median height, or `+inf` where there is no measurement.
    pub height_field: Vec<f64>,
    /// Cell max, or `-inf` where there is no measurement.
    pub max: Vec<f64>,
    pub interpolated: Vec<bool>,
    /// Classification encoded as a small integer (see [`classification_to_code`]).
    pub traversability: Vec<u8>,
    pub origin: (f64, f64, f64),
}

/// `UNCLASSIFIED = 0, TRAVERSABLE = 1, OBSTACLE = 2, UNKNOWN_OBSTACLE = 3`.
pub fn classification_to_code(c: Classification) -> u8 {
    match c {
        Classification::Unclassified => 0,
        Classification::Traversable => 1,
        Classification::Obstacle => 2,
        Classification::UnknownObstacle => 3,
    }
}

impl GridDump {
    pub fn from_maps(elev: &ElevationGrid, trav: &TraversabilityGrid) -> Self {
        let w = elev.grid().width();
        let h = elev.grid().height();
        let mut height_field = Vec::with_capacity(w * h);
        let mut max = Vec::with_capacity(w * h);
        let mut interpolated = Vec::with_capacity(w * h);
        let mut traversability = Vec::with_capacity(w * h);

        for y in 0..h as i64 {
            for x in 0..w as i64 {
                let cell = elev.grid().entry(x, y).expect("in range by construction");
                height_field.push(cell.median());
                max.push(cell.maximum());
                interpolated.push(cell.interpolated());
                let class = *trav.grid().entry(x, y).expect("same dims as elevation grid");
                traversability.push(classification_to_code(class));
            }
        }

        let o: Point3<f64> = elev.grid().origin();
        GridDump { width: w, height: h, height_field, max, interpolated, traversability, origin: (o.x, o.y, o.z) }
    }

    /// Serializes the dump to a JSON string for a consumer outside the
    /// process (e.g. a logging sidecar or visualization tool). JSON has no
    /// representation for non-finite floats, so this fails with a
    /// `serde_json` error on a dump containing unmeasured cells (`+inf`/
    /// `-inf` sentinels); callers that need to ship those should map the
    /// sentinels to `null` themselves before serializing.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<GridDump> {
        serde_json::from_str(s)
    }
}

//! Traversability mapping and kinodynamic best-first trajectory planning
//! for a ground robot reading a planar laser scanner.
//!
//! The crate couples two pieces: a sliding, world-fixed elevation/
//! traversability map that ingests scans under a moving vehicle
//! ([`map_pipeline`]), and a best-first search over (pose, heading) nodes
//! that produces a drivable waypoint sequence ([`planner`]). The planner
//! never touches the map directly — it is polymorphic over a small set of
//! oracles the embedding application supplies.

pub mod config;
pub mod elevation_cell;
pub mod elevation_grid;
pub mod error;
pub mod geometry;
pub mod grid_dump;
pub mod map_pipeline;
pub mod planner;
pub mod sliding_grid;
pub mod traversability;
pub mod tree;

pub use config::{init_logging, MapConfig};
pub use error::{MapError, PlannerError};
pub use geometry::Pose;
pub use grid_dump::GridDump;
pub use map_pipeline::{LaserScan, MapPipeline, MaskBox, ScanSource};
pub use planner::{HeadingInterval, PlanOutcome, Planner, PlannerOracles, TreeSearchConf, Waypoint};
pub use traversability::Classification;
pub use tree::{SearchTree, TreeNode};

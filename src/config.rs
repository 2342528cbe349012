//! Serde-backed configuration for the map pipeline.
//!
//! [`crate::planner::TreeSearchConf`] lives next to the planner it
//! configures; this module holds the map side.

use serde::{Deserialize, Serialize};

/// Map pipeline configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapConfig {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Meters per cell.
    pub resolution: f64,
    /// Distance (m) to a grid edge that triggers a recenter.
    pub boundary_size: f64,
    /// Step-height classification threshold (m).
    pub max_step_size: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            width: 200,
            height: 200,
            resolution: 0.1,
            boundary_size: 3.0,
            max_step_size: 0.2,
        }
    }
}

/// Initializes the crate's logging backend. Call once from an embedding
/// binary's `main`; tests and library consumers are free to wire their own.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

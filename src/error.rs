//! Closed error kinds for the map and planner.
//!
//! Running out of headings to try, exhausting the expansion budget, and
//! finding nothing feasible from the root are deliberately *not*
//! represented here: none of the three is a bug, so they surface as plain
//! control flow instead (a pruned child, a `PlanOutcome::reached_goal ==
//! false`, and an empty waypoint vector, respectively).

use thiserror::Error;

/// Errors from traversability/elevation map operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// Region stamping (`mark_radius_as`/`mark_rect_as`) was called with a
    /// pose outside the grid's footprint. Non-recoverable for that call;
    /// the caller should recenter the grid first.
    #[error("pose lies outside the grid footprint")]
    OutOfGrid,
}

/// Errors from the search tree / planner.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    /// The optional heuristic-consistency audit found a parent/child pair
    /// violating `parent.heuristic <= edge_cost + child.heuristic`. This
    /// indicates a bug in the caller's `Heuristic`/`Cost` oracles, not in
    /// the planner itself.
    #[error("heuristic inconsistent between node {parent} and child {child}: parent.heuristic={parent_heuristic}, edge_cost={edge_cost}, child.heuristic={child_heuristic}")]
    BadOracle {
        parent: usize,
        child: usize,
        parent_heuristic: f64,
        edge_cost: f64,
        child_heuristic: f64,
    },
}

//! Best-first kinodynamic search over (pose, heading) nodes.
//!
//! The planner is polymorphic over a small capability set — `IsTerminal`,
//! `Heuristic`, `CostForNode`, `NextDirections`, `ProjectPose` — expressed
//! as the single [`PlannerOracles`] trait so the core never knows anything
//! about the map representation backing it.

use std::collections::BinaryHeap;
use std::cmp::Ordering;

use nalgebra::Point3;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::geometry::Pose;
use crate::tree::{SearchTree, TreeNode};

/// A heading interval `[lo, hi]` (radians, world frame) in which travel is
/// locally admissible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingInterval {
    pub lo: f64,
    pub hi: f64,
}

/// The five capabilities the planner core needs from its embedding
/// application. Implementations are expected to be pure functions of a
/// fixed map snapshot taken when the oracle set was constructed; callers
/// must not mutate the map during expansion.
pub trait PlannerOracles {
    fn is_terminal(&self, node: &TreeNode) -> bool;
    /// Admissible (never overestimates) distance-to-goal estimate, >= 0.
    fn heuristic(&self, node: &TreeNode) -> f64;
    /// Cost of the edge into `node`, >= 0.
    fn cost_for_node(&self, node: &TreeNode) -> f64;
    /// Locally admissible heading intervals in world frame at `pose`.
    fn next_directions(&self, pose: &Pose, safety: f64, width: f64) -> Vec<HeadingInterval>;
    /// Applies the robot's kinematic projection; `None` if infeasible.
    fn project_pose(&self, pose: &Pose, heading: f64, distance: f64) -> Option<Pose>;
}

/// Planner configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeSearchConf {
    /// Hard cap on total nodes expanded.
    pub max_tree_size: usize,
    /// Edge length in meters for each expansion.
    pub step_distance: f64,
    /// Max headings drawn per direction interval.
    pub angular_sampling: usize,
    /// Exponential cost discount per depth level, in (0, 1].
    pub discount_factor: f64,
    /// Clearance passed through to `NextDirections`.
    pub obstacle_safety_distance: f64,
    /// Robot radius passed through to `NextDirections`.
    pub robot_width: f64,
    pub position_tolerance: f64,
    pub heading_tolerance: f64,
}

impl Default for TreeSearchConf {
    fn default() -> Self {
        TreeSearchConf {
            max_tree_size: 2000,
            step_distance: 0.5,
            angular_sampling: 5,
            discount_factor: 1.0,
            obstacle_safety_distance: 0.3,
            robot_width: 0.5,
            position_tolerance: 0.2,
            heading_tolerance: 0.2,
        }
    }
}

/// A single planned waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point3<f64>,
    pub heading: f64,
    pub position_tolerance: f64,
    pub heading_tolerance: f64,
}

/// Result of [`Planner::plan`]. `reached_goal` distinguishes "a terminal
/// node was found" from "the budget was exhausted and this is the
/// best-so-far leaf"; both cases can produce a non-empty `waypoints`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub waypoints: Vec<Waypoint>,
    pub reached_goal: bool,
}

impl PlanOutcome {
    fn empty() -> Self {
        PlanOutcome { waypoints: Vec::new(), reached_goal: false }
    }
}

/// Priority queue entry; orders by ascending `heuristic_cost`, ties broken
/// by insertion order (FIFO) for determinism.
struct QueueEntry {
    node_id: usize,
    heuristic_cost: OrderedFloat<f64>,
    sequence: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.heuristic_cost == other.heuristic_cost && self.sequence == other.sequence
    }
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest heuristic_cost
        // (and, on ties, the earliest inserted) pops first.
        other
            .heuristic_cost
            .cmp(&self.heuristic_cost)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Runs the best-first kinodynamic search tree expansion.
pub struct Planner;

impl Planner {
    /// Default angular step used to bound interior heading-sample count
    /// within a direction interval.
    const INTERIOR_ANGULAR_STEP: f64 = 0.02;

    /// Expands a search tree from `start` against `oracles` until a
    /// terminal node is found or `conf.max_tree_size` nodes have been
    /// created, whichever comes first. Reaching the budget is not a
    /// failure: the best-so-far leaf is returned.
    pub fn plan(start: Pose, conf: &TreeSearchConf, oracles: &dyn PlannerOracles) -> PlanOutcome {
        let root_probe = TreeNode::candidate(
            start,
            0.0,
            0,
            0.0,
            0.0,
            conf.position_tolerance,
            conf.heading_tolerance,
        );
        let root_heuristic = oracles.heuristic(&root_probe);
        let mut tree = SearchTree::new(start, root_heuristic, conf.position_tolerance, conf.heading_tolerance);

        let mut queue: BinaryHeap<QueueEntry> = BinaryHeap::new();
        let mut sequence: u64 = 0;
        queue.push(QueueEntry {
            node_id: tree.root(),
            heuristic_cost: OrderedFloat(tree.get(tree.root()).unwrap().heuristic_cost()),
            sequence,
        });

        let mut best_goal: Option<usize> = None;
        let mut best_goal_cost = f64::INFINITY;

        while let Some(entry) = queue.pop() {
            if tree.size() >= conf.max_tree_size {
                break;
            }
            let Some(node) = tree.get(entry.node_id) else { continue };
            let node = node.clone();

            if oracles.is_terminal(&node) {
                if node.cost < best_goal_cost {
                    best_goal_cost = node.cost;
                    best_goal = Some(node.id);
                }
                continue; // terminal nodes are recorded, not expanded
            }

            let intervals = oracles.next_directions(&node.pose, conf.obstacle_safety_distance, conf.robot_width);
            let headings = Self::sample_headings(&intervals, conf.angular_sampling);

            for theta in headings {
                if tree.size() >= conf.max_tree_size {
                    break;
                }
                let Some(new_pose) = oracles.project_pose(&node.pose, theta, conf.step_distance) else { continue };

                let mut child = TreeNode::candidate(
                    new_pose,
                    theta,
                    node.depth + 1,
                    0.0,
                    0.0,
                    conf.position_tolerance,
                    conf.heading_tolerance,
                );
                // edge_cost uses CostForNode on the (not-yet-attached) child;
                // oracles only need pose/depth, which are already set.
                let edge_cost = oracles.cost_for_node(&child);
                child.cost = node.cost + conf.discount_factor.powi(node.depth as i32) * edge_cost;
                child.heuristic = oracles.heuristic(&child);

                let child_id = tree.add_child(node.id, child);

                sequence += 1;
                queue.push(QueueEntry {
                    node_id: child_id,
                    heuristic_cost: OrderedFloat(tree.get(child_id).unwrap().heuristic_cost()),
                    sequence,
                });
            }
        }

        if let Some(id) = best_goal {
            return PlanOutcome { waypoints: tree.build_trajectory_to(id), reached_goal: true };
        }

        // root never produced a feasible child at all (no admissible
        // headings, or every projection was infeasible): empty result.
        if tree.size() == 1 {
            return PlanOutcome::empty();
        }

        // no terminal was reached, so take the current leaf with the
        // smallest heuristic_cost, breaking ties by node id for determinism.
        let best_leaf = tree
            .leaves()
            .min_by(|a, b| {
                a.heuristic_cost()
                    .partial_cmp(&b.heuristic_cost())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|n| n.id);

        match best_leaf {
            Some(id) => PlanOutcome { waypoints: tree.build_trajectory_to(id), reached_goal: false },
            None => PlanOutcome::empty(),
        }
    }

    /// Emits both interval endpoints plus up to `angular_sampling - 2`
    /// uniformly spaced interior samples per interval, de-duplicated by
    /// exact equality across the whole multiset.
    fn sample_headings(intervals: &[HeadingInterval], angular_sampling: usize) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();

        for iv in intervals {
            out.push(iv.lo);
            out.push(iv.hi);

            let span = iv.hi - iv.lo;
            if span > 0.0 {
                let max_interior = angular_sampling.saturating_sub(2);
                let by_step = (span / Self::INTERIOR_ANGULAR_STEP).floor() as usize;
                let n_interior = max_interior.min(by_step);
                if n_interior > 0 {
                    let step = span / (n_interior + 1) as f64;
                    for i in 1..=n_interior {
                        out.push(iv.lo + step * i as f64);
                    }
                }
            }
        }

        let mut dedup: Vec<f64> = Vec::new();
        for h in out {
            if !dedup.iter().any(|&x: &f64| x == h) {
                dedup.push(h);
            }
        }
        dedup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StraightLineToY {
        goal_y: f64,
    }

    impl PlannerOracles for StraightLineToY {
        fn is_terminal(&self, node: &TreeNode) -> bool {
            node.pose.position.y >= self.goal_y
        }
        fn heuristic(&self, node: &TreeNode) -> f64 {
            (self.goal_y - node.pose.position.y).max(0.0)
        }
        fn cost_for_node(&self, _node: &TreeNode) -> f64 {
            1.0
        }
        fn next_directions(&self, _pose: &Pose, _safety: f64, _width: f64) -> Vec<HeadingInterval> {
            vec![HeadingInterval { lo: std::f64::consts::FRAC_PI_2, hi: std::f64::consts::FRAC_PI_2 }]
        }
        fn project_pose(&self, pose: &Pose, heading: f64, distance: f64) -> Option<Pose> {
            let dx = heading.cos() * distance;
            let dy = heading.sin() * distance;
            Some(Pose::from_xy_heading(pose.position.x + dx, pose.position.y + dy, heading))
        }
    }

    // a straight, unobstructed corridor reaches its goal in a predictable
    // number of unit steps.
    #[test]
    fn straight_line_reaches_goal_in_expected_waypoints() {
        let conf = TreeSearchConf {
            max_tree_size: 20,
            step_distance: 1.0,
            angular_sampling: 5,
            discount_factor: 1.0,
            ..TreeSearchConf::default()
        };
        let oracles = StraightLineToY { goal_y: 10.0 };
        let outcome = Planner::plan(Pose::from_xy_heading(0.0, 0.0, 0.0), &conf, &oracles);

        assert!(outcome.reached_goal);
        assert_eq!(outcome.waypoints.len(), 11);
        assert_eq!(outcome.waypoints.first().unwrap().position, Point3::new(0.0, 0.0, 0.0));
        let last = outcome.waypoints.last().unwrap();
        assert!((last.position.y - 10.0).abs() < 1e-9);
    }

    // S5: budget exhaustion yields best-so-far, not empty.
    #[test]
    fn budget_exhaustion_returns_best_so_far() {
        let conf = TreeSearchConf {
            max_tree_size: 5,
            step_distance: 1.0,
            angular_sampling: 5,
            discount_factor: 1.0,
            ..TreeSearchConf::default()
        };
        let oracles = StraightLineToY { goal_y: 10.0 };
        let outcome = Planner::plan(Pose::from_xy_heading(0.0, 0.0, 0.0), &conf, &oracles);

        assert!(!outcome.reached_goal);
        assert!(!outcome.waypoints.is_empty());
        assert!(outcome.waypoints.len() <= 5);
    }

    struct NoAdmissibleHeadings;
    impl PlannerOracles for NoAdmissibleHeadings {
        fn is_terminal(&self, _node: &TreeNode) -> bool {
            false
        }
        fn heuristic(&self, _node: &TreeNode) -> f64 {
            1.0
        }
        fn cost_for_node(&self, _node: &TreeNode) -> f64 {
            1.0
        }
        fn next_directions(&self, _pose: &Pose, _safety: f64, _width: f64) -> Vec<HeadingInterval> {
            vec![]
        }
        fn project_pose(&self, _pose: &Pose, _heading: f64, _distance: f64) -> Option<Pose> {
            None
        }
    }

    // EmptyResult: no feasible expansion from root at all.
    #[test]
    fn no_admissible_headings_from_root_yields_empty_result() {
        let conf = TreeSearchConf::default();
        let outcome = Planner::plan(Pose::identity(), &conf, &NoAdmissibleHeadings);
        assert!(outcome.waypoints.is_empty());
        assert!(!outcome.reached_goal);
    }

    #[test]
    fn sample_headings_emits_endpoints_and_bounded_interior_samples() {
        let intervals = vec![HeadingInterval { lo: 0.0, hi: 1.0 }];
        let samples = Planner::sample_headings(&intervals, 5);
        assert!(samples.contains(&0.0));
        assert!(samples.contains(&1.0));
        assert!(samples.len() <= 5);
    }

    #[test]
    fn sample_headings_zero_width_interval_yields_single_sample() {
        let intervals = vec![HeadingInterval { lo: 0.3, hi: 0.3 }];
        let samples = Planner::sample_headings(&intervals, 5);
        assert_eq!(samples, vec![0.3]);
    }

    // `is_terminal` is called exactly once per popped node, in pop order;
    // wrapping it records the queue's heuristic_cost sequence for free.
    struct RecordingOracles {
        inner: StraightLineToY,
        popped_hcosts: std::cell::RefCell<Vec<f64>>,
    }

    impl PlannerOracles for RecordingOracles {
        fn is_terminal(&self, node: &TreeNode) -> bool {
            self.popped_hcosts.borrow_mut().push(node.heuristic_cost());
            self.inner.is_terminal(node)
        }
        fn heuristic(&self, node: &TreeNode) -> f64 {
            self.inner.heuristic(node)
        }
        fn cost_for_node(&self, node: &TreeNode) -> f64 {
            self.inner.cost_for_node(node)
        }
        fn next_directions(&self, pose: &Pose, safety: f64, width: f64) -> Vec<HeadingInterval> {
            self.inner.next_directions(pose, safety, width)
        }
        fn project_pose(&self, pose: &Pose, heading: f64, distance: f64) -> Option<Pose> {
            self.inner.project_pose(pose, heading, distance)
        }
    }

    // Invariant 5: each popped node's heuristic_cost is >= every
    // previously popped node's (best-first monotonicity).
    #[test]
    fn prop_pop_order_is_monotone_nondecreasing() {
        let conf = TreeSearchConf {
            max_tree_size: 40,
            step_distance: 1.0,
            angular_sampling: 3,
            discount_factor: 1.0,
            ..TreeSearchConf::default()
        };
        let oracles = RecordingOracles {
            inner: StraightLineToY { goal_y: 10.0 },
            popped_hcosts: std::cell::RefCell::new(Vec::new()),
        };
        let _ = Planner::plan(Pose::from_xy_heading(0.0, 0.0, 0.0), &conf, &oracles);

        let seq = oracles.popped_hcosts.borrow();
        for w in seq.windows(2) {
            assert!(w[1] + 1e-9 >= w[0], "pop order not monotone: {:?}", *seq);
        }
    }
}

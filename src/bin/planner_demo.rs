//! Minimal end-to-end demo: ingest a handful of flat-ground scans, then run
//! the planner straight toward a goal line using a trivial oracle set.
//!
//! Process wiring (scan acquisition, transform plumbing) is out of scope
//! for the core crate; this binary exists only to exercise the public API
//! the way an embedding application would.

use log::info;

use trav_planner::{
    init_logging, LaserScan, MapConfig, MapPipeline, PlannerOracles, Pose, TreeSearchConf,
};
use trav_planner::planner::{HeadingInterval, Planner};
use trav_planner::tree::TreeNode;

struct StraightLineToGoal {
    goal_y: f64,
}

impl PlannerOracles for StraightLineToGoal {
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

fn flat_scan() -> LaserScan {
    let beams = 181;
    LaserScan {
        ranges: vec![3.0; beams],
        angle_min: -std::f64::consts::FRAC_PI_2 as f32,
        angle_step: (std::f64::consts::PI / (beams - 1) as f64) as f32,
        valid: vec![true; beams],
    }
}

fn main() {
    init_logging();

    let mut pipeline = MapPipeline::new(MapConfig::default(), vec![]);
    let identity = Pose::identity();
    let changed = pipeline.ingest(&flat_scan(), identity, identity);
    if changed {
        pipeline.compute_new_map();
    }
    info!("map ready, running planner");

    let conf = TreeSearchConf { step_distance: 1.0, max_tree_size: 200, ..TreeSearchConf::default() };
    let oracles = StraightLineToGoal { goal_y: 10.0 };
    let outcome = Planner::plan(identity, &conf, &oracles);

    info!("reached_goal={} waypoints={}", outcome.reached_goal, outcome.waypoints.len());
    for wp in &outcome.waypoints {
        println!("({:.2}, {:.2}) heading={:.2}", wp.position.x, wp.position.y, wp.heading);
    }
}

//! Arena-style search tree: flat node storage with non-owning parent links,
//! rather than a boxed/Rc tree.

use std::collections::HashSet;

use crate::error::PlannerError;
use crate::geometry::Pose;
use crate::planner::Waypoint;

/// One node of the kinodynamic search tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: usize,
    pub pose: Pose,
    /// Heading chosen by the parent -> this edge, radians. Meaningless (0)
    /// for the root.
    pub direction: f64,
    pub depth: u32,
    pub cost: f64,
    pub heuristic: f64,
    pub position_tolerance: f64,
    pub heading_tolerance: f64,
    pub is_leaf: bool,
    parent: Option<usize>,
    children: HashSet<usize>,
}

impl TreeNode {
    /// Builds a detached candidate node, not yet attached to any tree.
    /// [`SearchTree::add_child`] assigns its final `id` and `parent` link.
    pub fn candidate(
        pose: Pose,
        direction: f64,
        depth: u32,
        cost: f64,
        heuristic: f64,
        position_tolerance: f64,
        heading_tolerance: f64,
    ) -> Self {
        TreeNode {
            id: 0,
            pose,
            direction,
            depth,
            cost,
            heuristic,
            position_tolerance,
            heading_tolerance,
            is_leaf: true,
            parent: None,
            children: HashSet::new(),
        }
    }

    /// `cost + heuristic`: the key the planner's best-first queue orders by.
    pub fn heuristic_cost(&self) -> f64 {
        self.cost + self.heuristic
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &HashSet<usize> {
        &self.children
    }
}

/// Owns all nodes of a search tree. Non-root nodes are reached only through
/// their parent link; removing a node removes its entire subtree.
pub struct SearchTree {
    nodes: Vec<Option<TreeNode>>,
    root: usize,
    size: usize,
}

impl SearchTree {
    /// Creates a tree with a single root node.
    pub fn new(root_pose: Pose, root_heuristic: f64, position_tolerance: f64, heading_tolerance: f64) -> Self {
        let root = TreeNode {
            id: 0,
            pose: root_pose,
            direction: 0.0,
            depth: 0,
            cost: 0.0,
            heuristic: root_heuristic,
            position_tolerance,
            heading_tolerance,
            is_leaf: true,
            parent: None,
            children: HashSet::new(),
        };
        SearchTree { nodes: vec![Some(root)], root: 0, size: 1 }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of live nodes in the tree.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    /// All live nodes currently without children.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter_map(|n| n.as_ref()).filter(|n| n.is_leaf)
    }

    fn get_mut(&mut self, id: usize) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    /// Appends `child` to the tree under `parent`, returning the new node's
    /// id. Marks `parent` as no longer a leaf.
    pub fn add_child(&mut self, parent: usize, mut child: TreeNode) -> usize {
        let id = self.nodes.len();
        child.id = id;
        child.parent = Some(parent);
        self.nodes.push(Some(child));
        self.size += 1;

        if let Some(p) = self.get_mut(parent) {
            p.children.insert(id);
            p.is_leaf = false;
        }
        id
    }

    /// Removes the entire subtree rooted at `child` (post-order), updating
    /// `size`. `child` must not be the tree's root.
    pub fn remove_child(&mut self, child: usize) {
        let Some(parent) = self.get(child).and_then(|n| n.parent()) else {
            return; // root: nothing to detach from
        };

        let mut stack = vec![child];
        let mut to_remove = Vec::new();
        while let Some(id) = stack.pop() {
            if let Some(n) = self.get(id) {
                stack.extend(n.children().iter().copied());
                to_remove.push(id);
            }
        }

        for id in to_remove {
            self.nodes[id] = None;
            self.size -= 1;
        }

        if let Some(p) = self.get_mut(parent) {
            p.children.remove(&child);
            if p.children.is_empty() {
                p.is_leaf = true;
            }
        }
    }

    /// Walks parent links from `leaf` to the root, collecting waypoints,
    /// then reverses so the root comes first.
    pub fn build_trajectory_to(&self, leaf: usize) -> Vec<Waypoint> {
        let mut path = Vec::new();
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            let Some(n) = self.get(id) else { break };
            path.push(Waypoint {
                position: n.pose.position,
                heading: n.pose.heading(),
                position_tolerance: n.position_tolerance,
                heading_tolerance: n.heading_tolerance,
            });
            cur = n.parent();
        }
        path.reverse();
        path
    }

    /// Asserts `parent.heuristic <= edge_cost(parent,child) + child.heuristic`
    /// for every parent/child edge on the path from `from` back to the
    /// root. A violation means the caller's `Heuristic`/`Cost` oracles are
    /// not admissible/consistent.
    pub fn verify_heuristic_consistency(&self, from: usize) -> Result<(), PlannerError> {
        let mut cur = from;
        while let Some(parent_id) = self.get(cur).and_then(|n| n.parent()) {
            let child = self.get(cur).expect("checked above");
            let parent = self.get(parent_id).expect("parent must exist in tree");
            let edge_cost = child.cost - parent.cost;
            if parent.heuristic > edge_cost + child.heuristic + f64::EPSILON {
                return Err(PlannerError::BadOracle {
                    parent: parent_id,
                    child: cur,
                    parent_heuristic: parent.heuristic,
                    edge_cost,
                    child_heuristic: child.heuristic,
                });
            }
            cur = parent_id;
        }
        Ok(())
    }
}

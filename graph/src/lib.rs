//! Canopy Graph
//!
//! In-memory call graph: nodes with parent/child relations, stable
//! traversal order, and per-node depth metadata. The graph owns its nodes;
//! relations are id references.
//!
//! Responsibilities:
//! - Build call trees/graphs (roots, children)
//! - Deterministic sibling ordering via a stable sort key
//! - Full-graph preorder traversal visiting every node exactly once

use canopy_core::NodeId;
use std::collections::HashSet;

/// A single call site in the graph.
#[derive(Debug, Clone)]
pub struct CallNode {
    /// Unique identifier; doubles as the node's enumeration index.
    pub id: NodeId,
    /// Stable sort key. Siblings and roots are ordered by it.
    pub order: u64,
    /// Distance from the nearest root (roots have depth 0).
    pub depth: i64,
    /// Child nodes, kept sorted by their sort key.
    pub children: Vec<NodeId>,
    /// Parent nodes. More than one parent means the call site is shared
    /// between callers (a graph, not a tree).
    pub parents: Vec<NodeId>,
}

impl CallNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A call graph: a forest of call trees whose nodes may share children.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<CallNode>,
    roots: Vec<NodeId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a new root node. Roots have depth 0.
    pub fn add_root(&mut self) -> NodeId {
        let id = self.alloc_node(0);
        self.roots.push(id);
        id
    }

    /// Add a new node as a child of `parent`.
    ///
    /// Depth is the distance from the nearest root, so a child of a
    /// depth-2 node gets depth 3.
    pub fn add_child(&mut self, parent: NodeId) -> NodeId {
        let parent_depth = self.node(parent).depth;
        let id = self.alloc_node(parent_depth + 1);
        self.nodes[parent.value() as usize].children.push(id);
        self.nodes[id.value() as usize].parents.push(parent);
        id
    }

    /// Attach an existing node as an additional child of `parent`,
    /// turning the tree into a graph. If the new parent is closer to a
    /// root, the child's depth decreases, and so do its descendants'
    /// where the new route is the shorter one.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) {
        let parent_depth = self.node(parent).depth;
        self.nodes[child.value() as usize].parents.push(parent);
        self.nodes[parent.value() as usize].children.push(child);
        self.lower_depth(child, parent_depth + 1);
    }

    /// Lower `id`'s depth to `depth` if that is closer to a root, and
    /// propagate the decrease through its subtree. Nodes whose existing
    /// depth is already as small stop the propagation.
    fn lower_depth(&mut self, id: NodeId, depth: i64) {
        let mut work = vec![(id, depth)];
        while let Some((id, depth)) = work.pop() {
            let node = &mut self.nodes[id.value() as usize];
            if depth >= node.depth {
                continue;
            }
            node.depth = depth;
            for &child in &node.children {
                work.push((child, depth + 1));
            }
        }
    }

    fn alloc_node(&mut self, depth: i64) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u64);
        self.nodes.push(CallNode {
            id,
            order: id.value(),
            depth,
            children: Vec::new(),
            parents: Vec::new(),
        });
        id
    }

    /// Look up a node by id. Ids handed out by this graph are always valid.
    pub fn node(&self, id: NodeId) -> &CallNode {
        &self.nodes[id.value() as usize]
    }

    /// Root nodes ordered by their sort key.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `id` ordered by their sort key.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).is_leaf()
    }

    pub fn depth(&self, id: NodeId) -> i64 {
        self.node(id).depth
    }

    /// Preorder traversal from the roots, visiting every node exactly once
    /// even when nodes are shared between parents.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.traverse_from(root, &mut visited, &mut out);
        }
        out
    }

    fn traverse_from(&self, id: NodeId, visited: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
        if !visited.insert(id) {
            return;
        }
        out.push(id);
        for &child in &self.node(id).children {
            self.traverse_from(child, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tree() {
        // GIVEN a tree: root -> (a -> leaf, b)
        let mut g = CallGraph::new();
        let root = g.add_root();
        let a = g.add_child(root);
        let leaf = g.add_child(a);
        let b = g.add_child(root);

        // THEN depths follow distance from root
        assert_eq!(g.depth(root), 0);
        assert_eq!(g.depth(a), 1);
        assert_eq!(g.depth(leaf), 2);
        assert_eq!(g.depth(b), 1);
        assert!(g.is_leaf(leaf));
        assert!(!g.is_leaf(root));
        assert_eq!(g.children(root), &[a, b]);
    }

    #[test]
    fn test_traverse_visits_every_node_once() {
        // GIVEN a diamond: root -> a -> shared, root -> b -> shared
        let mut g = CallGraph::new();
        let root = g.add_root();
        let a = g.add_child(root);
        let b = g.add_child(root);
        let shared = g.add_child(a);
        g.add_edge(b, shared);

        // WHEN traversing
        let order = g.traverse();

        // THEN shared appears exactly once and all nodes are covered
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|&&n| n == shared).count(), 1);
        assert_eq!(order[0], root);
    }

    #[test]
    fn test_shared_child_keeps_shallowest_depth() {
        let mut g = CallGraph::new();
        let root = g.add_root();
        let mid = g.add_child(root);
        let deep = g.add_child(mid);
        let shared = g.add_child(deep);
        assert_eq!(g.depth(shared), 3);

        // Attaching under the root pulls depth up to 1
        g.add_edge(root, shared);
        assert_eq!(g.depth(shared), 1);
    }

    #[test]
    fn test_reattach_propagates_depth_to_descendants() {
        // GIVEN a chain root -> a -> b -> c -> d
        let mut g = CallGraph::new();
        let root = g.add_root();
        let a = g.add_child(root);
        let b = g.add_child(a);
        let c = g.add_child(b);
        let d = g.add_child(c);
        assert_eq!(g.depth(d), 4);

        // WHEN b is also attached directly under the root
        g.add_edge(root, b);

        // THEN the shorter route reaches b's whole subtree
        assert_eq!(g.depth(b), 1);
        assert_eq!(g.depth(c), 2);
        assert_eq!(g.depth(d), 3);
        // a still sits on its original route
        assert_eq!(g.depth(a), 1);
    }

    #[test]
    fn test_multiple_roots_ordered() {
        let mut g = CallGraph::new();
        let r0 = g.add_root();
        let r1 = g.add_root();
        assert_eq!(g.roots(), &[r0, r1]);
        assert!(g.node(r0).order < g.node(r1).order);
    }
}

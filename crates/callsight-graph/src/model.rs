use callsight_core::{Edge, Node, NodeId, NodePayload};
use std::collections::{HashMap, HashSet};

/// The mutable aggregate of all nodes and edges observed in a session.
///
/// Owned exclusively by the running visualization session. Invariants held at
/// all times: node ids are unique, edge (source, target) pairs are unique, and
/// every stored edge references nodes present in the graph (dangling edges
/// are dropped on insert, never stored).
#[derive(Debug, Default)]
pub struct GraphModel {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    node_index: HashMap<NodeId, usize>,
    edge_pairs: HashSet<(NodeId, NodeId)>,

    // Display-only overlay state; never affects positions.
    expanded: HashSet<NodeId>,
    highlighted: HashSet<NodeId>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire graph (a push from the analysis side).
    /// Overlay state is reset; the caller runs a full layout afterwards.
    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes.clear();
        self.edges.clear();
        self.node_index.clear();
        self.edge_pairs.clear();
        self.expanded.clear();
        self.highlighted.clear();

        for node in nodes {
            self.insert_node(node);
        }
        for edge in edges {
            self.insert_edge(edge);
        }
    }

    /// Insert a node unless its id is already present. First-seen wins: a
    /// later fragment never overwrites an existing node's position or data.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Insert an edge unless its (source, target) pair is already present or
    /// either endpoint is missing from the graph.
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        let pair = (edge.source.clone(), edge.target.clone());
        if self.edge_pairs.contains(&pair) {
            return false;
        }
        if !self.node_index.contains_key(&edge.source) {
            tracing::warn!(
                edge = %edge.id,
                source = %edge.source,
                "dropping edge because its source node is missing"
            );
            return false;
        }
        if !self.node_index.contains_key(&edge.target) {
            tracing::warn!(
                edge = %edge.id,
                target = %edge.target,
                "dropping edge because its target node is missing"
            );
            return false;
        }
        self.edge_pairs.insert(pair);
        self.edges.push(edge);
        true
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge_between(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edge_pairs
            .contains(&(source.clone(), target.clone()))
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.node_index.get(id).map(|&idx| &mut self.nodes[idx])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn mark_expanded(&mut self, id: &NodeId) {
        if self.node_index.contains_key(id) {
            self.expanded.insert(id.clone());
        }
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    /// Mark the file nodes matching `files` as highlighted, replacing the
    /// previous overlay. Returns how many nodes matched.
    pub fn set_highlighted(&mut self, files: &[String]) -> usize {
        self.highlighted.clear();
        let wanted: HashSet<&str> = files.iter().map(String::as_str).collect();
        for node in &self.nodes {
            if let NodePayload::File { path, .. } = &node.payload
                && wanted.contains(path.as_str())
            {
                self.highlighted.insert(node.id.clone());
            }
        }
        self.highlighted.len()
    }

    pub fn is_highlighted(&self, id: &NodeId) -> bool {
        self.highlighted.contains(id)
    }

    /// Symbols of the file node with the given path, if the graph has one.
    pub fn file_symbols(&self, filepath: &str) -> Option<&[callsight_core::Symbol]> {
        self.nodes.iter().find_map(|node| match &node.payload {
            NodePayload::File { path, symbols, .. } if path == filepath => {
                Some(symbols.as_slice())
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsight_core::{Edge, Node, NodeId};

    #[test]
    fn duplicate_node_ids_are_rejected_first_seen_wins() {
        let mut model = GraphModel::new();
        let mut first = Node::file("f1", "a.py", vec![]);
        first.x = 42.0;
        assert!(model.insert_node(first));
        assert!(!model.insert_node(Node::file("f1", "other.py", vec![])));

        let kept = model.node(&NodeId::from("f1")).unwrap();
        assert_eq!(kept.x, 42.0);
        assert_eq!(kept.origin_file(), "a.py");
    }

    #[test]
    fn dangling_edges_are_never_stored() {
        let mut model = GraphModel::new();
        model.insert_node(Node::file("f1", "a.py", vec![]));
        let dangling = Edge::between(NodeId::from("f1"), NodeId::from("ghost"));
        assert!(!model.insert_edge(dangling));
        assert_eq!(model.edge_count(), 0);
    }

    #[test]
    fn duplicate_edge_pairs_are_rejected() {
        let mut model = GraphModel::new();
        model.insert_node(Node::file("f1", "a.py", vec![]));
        model.insert_node(Node::file("f2", "b.py", vec![]));
        assert!(model.insert_edge(Edge::between(NodeId::from("f1"), NodeId::from("f2"))));
        assert!(!model.insert_edge(Edge::between(NodeId::from("f1"), NodeId::from("f2"))));
        assert_eq!(model.edge_count(), 1);
    }

    #[test]
    fn replace_resets_overlays() {
        let mut model = GraphModel::new();
        model.insert_node(Node::file("f1", "a.py", vec![]));
        model.mark_expanded(&NodeId::from("f1"));
        model.set_highlighted(&["a.py".to_string()]);

        model.replace(vec![Node::file("f1", "a.py", vec![])], vec![]);
        assert!(!model.is_expanded(&NodeId::from("f1")));
        assert!(!model.is_highlighted(&NodeId::from("f1")));
    }

    #[test]
    fn highlight_matches_file_paths_only() {
        let mut model = GraphModel::new();
        model.insert_node(Node::file("f1", "a.py", vec![]));
        model.insert_node(Node::symbol("s1", "run", "a.py", 3));

        let matched = model.set_highlighted(&["a.py".to_string(), "b.py".to_string()]);
        assert_eq!(matched, 1);
        assert!(model.is_highlighted(&NodeId::from("f1")));
        assert!(!model.is_highlighted(&NodeId::from("s1")));
    }
}

//! Full-graph layout: column layout when no edges are present, layered
//! (Sugiyama-style) layout otherwise.
//!
//! Deterministic by construction: every iteration order derives from input
//! order or sorted node ids, never from hash-map iteration.

use crate::geometry::{Size, estimate};
use crate::model::GraphModel;
use callsight_core::{Direction, Edge, Node, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Horizontal gap between file columns in the edge-less layout.
pub const COLUMN_GAP: f32 = 60.0;
/// Margin added to the widest node when separating layers.
pub const LAYER_MARGIN: f32 = 80.0;
/// Minimum separation between nodes within a layer.
pub const MIN_NODE_SEPARATION: f32 = 30.0;
const NODE_SEPARATION_FACTOR: f32 = 0.5;

const ROW_GAP: f32 = 20.0;
const GRID_MAX_ROW_WIDTH: f32 = 1600.0;
const GRID_TOP_GAP: f32 = 120.0;
const MAX_RANK_ITERATIONS: usize = 1000;

pub fn layout(nodes: &mut [Node], edges: &[Edge], direction: Direction) {
    if nodes.is_empty() {
        return;
    }
    if edges.is_empty() {
        columns(nodes);
    } else {
        layered(nodes, edges, direction);
    }
}

impl GraphModel {
    /// Full re-layout of the owned graph, used after a graph push. Incremental
    /// expansion goes through `merge_expansion` instead and never ends up here.
    pub fn relayout(&mut self, direction: Direction) {
        layout(&mut self.nodes, &self.edges, direction);
    }
}

/// Edge-less layout: file nodes as one row of columns, other nodes in a
/// wrapped grid below. Symbol-only graphs fall back to columns-by-file.
fn columns(nodes: &mut [Node]) {
    let sizes: Vec<Size> = nodes.iter().map(estimate).collect();
    let file_idx: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].is_file()).collect();

    if file_idx.is_empty() {
        columns_by_file(nodes, &sizes);
        return;
    }

    let max_file_width = file_idx
        .iter()
        .map(|&i| sizes[i].width)
        .fold(0.0f32, f32::max);
    let stride = max_file_width + COLUMN_GAP;
    for (column, &i) in file_idx.iter().enumerate() {
        nodes[i].x = column as f32 * stride;
        nodes[i].y = 0.0;
    }

    let max_file_height = file_idx
        .iter()
        .map(|&i| sizes[i].height)
        .fold(0.0f32, f32::max);
    let mut x = 0.0;
    let mut y = max_file_height + GRID_TOP_GAP;
    let mut row_height = 0.0f32;
    for i in 0..nodes.len() {
        if nodes[i].is_file() {
            continue;
        }
        let size = sizes[i];
        if x > 0.0 && x + size.width > GRID_MAX_ROW_WIDTH {
            x = 0.0;
            y += row_height + ROW_GAP;
            row_height = 0.0;
        }
        nodes[i].x = x;
        nodes[i].y = y;
        x += size.width + COLUMN_GAP;
        row_height = row_height.max(size.height);
    }
}

/// Legacy symbol-only graphs: one column per originating file (sorted by
/// path), rows in symbol order.
fn columns_by_file(nodes: &mut [Node], sizes: &[Size]) {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for i in 0..nodes.len() {
        groups
            .entry(nodes[i].origin_file().to_string())
            .or_default()
            .push(i);
    }

    let mut x = 0.0;
    for indices in groups.values() {
        let column_width = indices
            .iter()
            .map(|&i| sizes[i].width)
            .fold(0.0f32, f32::max);
        let mut y = 0.0;
        for &i in indices {
            nodes[i].x = x;
            nodes[i].y = y;
            y += sizes[i].height + ROW_GAP;
        }
        x += column_width + COLUMN_GAP;
    }
}

fn layered(nodes: &mut [Node], edges: &[Edge], direction: Direction) {
    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();

    // Self-loops carry no ranking information and would keep the ranking
    // pass from converging, so they are skipped here (still drawn later).
    let mut edge_pairs: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
    for edge in edges {
        let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) else {
            tracing::warn!(edge = %edge.id, "skipping layout edge with unknown endpoint");
            continue;
        };
        if s != t {
            edge_pairs.push((s, t));
        }
    }

    let ranks = assign_ranks(nodes.len(), &edge_pairs);
    let mut layers = build_layers(nodes, &ranks);

    let mut incoming: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(s, t) in &edge_pairs {
        incoming.entry(t).or_default().push(s);
        outgoing.entry(s).or_default().push(t);
    }

    run_barycenter_passes(&mut layers, &incoming, &outgoing);

    let sizes: Vec<Size> = nodes.iter().map(estimate).collect();
    let max_width = sizes.iter().map(|s| s.width).fold(0.0f32, f32::max);
    let max_height = sizes.iter().map(|s| s.height).fold(0.0f32, f32::max);
    let layer_stride = max_width + LAYER_MARGIN;
    let node_gap = (max_height * NODE_SEPARATION_FACTOR).max(MIN_NODE_SEPARATION);

    for (layer_pos, layer) in layers.values().enumerate() {
        let main_center = layer_pos as f32 * layer_stride;
        let extent: f32 = layer
            .iter()
            .map(|&i| match direction {
                Direction::LeftRight => sizes[i].height,
                Direction::TopDown => sizes[i].width,
            })
            .sum::<f32>()
            + layer.len().saturating_sub(1) as f32 * node_gap;

        let mut cursor = -extent / 2.0;
        for &i in layer {
            let size = sizes[i];
            // The engine works in centers; positions are stored top-left.
            match direction {
                Direction::LeftRight => {
                    let cross_center = cursor + size.height / 2.0;
                    nodes[i].x = main_center - size.width / 2.0;
                    nodes[i].y = cross_center - size.height / 2.0;
                    cursor += size.height + node_gap;
                }
                Direction::TopDown => {
                    let cross_center = cursor + size.width / 2.0;
                    nodes[i].x = cross_center - size.width / 2.0;
                    nodes[i].y = main_center - size.height / 2.0;
                    cursor += size.width + node_gap;
                }
            }
        }
    }
}

/// Iterative longest-path ranking over the edge list, bounded and compressed.
fn assign_ranks(node_count: usize, edge_pairs: &[(usize, usize)]) -> Vec<i32> {
    let mut ranks = vec![0i32; node_count];

    let max_iterations = (node_count + 2).min(MAX_RANK_ITERATIONS);
    let mut converged = false;
    for _ in 0..max_iterations {
        let mut changed = false;
        for &(source, target) in edge_pairs {
            if ranks[target] <= ranks[source] {
                ranks[target] = ranks[source] + 1;
                changed = true;
            }
        }
        if !changed {
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(
            "layer ranking did not converge after {} iterations",
            max_iterations
        );
    }

    compress_ranks(&mut ranks);
    ranks
}

fn compress_ranks(ranks: &mut [i32]) {
    if ranks.is_empty() {
        return;
    }
    let mut unique: Vec<i32> = ranks.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let remap: HashMap<i32, i32> = unique
        .iter()
        .enumerate()
        .map(|(i, &rank)| (rank, i as i32))
        .collect();
    for rank in ranks.iter_mut() {
        *rank = remap[rank];
    }
}

/// Layers keyed by rank, each initially ordered by node id for determinism.
fn build_layers(nodes: &[Node], ranks: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut layers: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &rank) in ranks.iter().enumerate() {
        layers.entry(rank).or_default().push(i);
    }
    for layer in layers.values_mut() {
        layer.sort_by(|&a, &b| nodes[a].id.cmp(&nodes[b].id));
    }
    layers
}

fn order_layer_by_barycenter(
    layer: &mut [usize],
    coords: &HashMap<usize, f32>,
    neighbors: &HashMap<usize, Vec<usize>>,
) {
    let mut barycenters: HashMap<usize, f32> = HashMap::new();
    for &i in layer.iter() {
        let mut sum = 0.0;
        let mut count = 0;
        if let Some(adjacent) = neighbors.get(&i) {
            for neighbor in adjacent {
                if let Some(&coord) = coords.get(neighbor) {
                    sum += coord;
                    count += 1;
                }
            }
        }
        let barycenter = if count > 0 {
            sum / count as f32
        } else {
            *coords.get(&i).unwrap_or(&0.0)
        };
        barycenters.insert(i, barycenter);
    }

    layer.sort_by(|a, b| {
        barycenters
            .get(a)
            .unwrap_or(&0.0)
            .partial_cmp(barycenters.get(b).unwrap_or(&0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Two down/up sweeps to reduce crossings between adjacent layers.
fn run_barycenter_passes(
    layers: &mut BTreeMap<i32, Vec<usize>>,
    incoming: &HashMap<usize, Vec<usize>>,
    outgoing: &HashMap<usize, Vec<usize>>,
) {
    let sorted_ranks: Vec<i32> = layers.keys().copied().collect();
    let mut coords: HashMap<usize, f32> = HashMap::new();
    for layer in layers.values() {
        for (j, &i) in layer.iter().enumerate() {
            coords.insert(i, j as f32);
        }
    }

    for _ in 0..2 {
        for &rank in sorted_ranks.iter().skip(1) {
            if let Some(layer) = layers.get_mut(&rank) {
                order_layer_by_barycenter(layer, &coords, incoming);
                for (j, &i) in layer.iter().enumerate() {
                    coords.insert(i, j as f32);
                }
            }
        }
        for i in (0..sorted_ranks.len().saturating_sub(1)).rev() {
            if let Some(layer) = layers.get_mut(&sorted_ranks[i]) {
                order_layer_by_barycenter(layer, &coords, outgoing);
                for (j, &i) in layer.iter().enumerate() {
                    coords.insert(i, j as f32);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsight_core::{Edge, NodeId};

    fn positions(nodes: &[Node]) -> Vec<(f32, f32)> {
        nodes.iter().map(|n| (n.x, n.y)).collect()
    }

    #[test]
    fn file_columns_are_spaced_by_widest_file() {
        let mut nodes = vec![
            Node::file("f1", "a.py", vec![]),
            Node::file("f2", "longer_name.py", vec![]),
            Node::file("f3", "b.py", vec![]),
        ];
        layout(&mut nodes, &[], Direction::LeftRight);

        let widest = nodes
            .iter()
            .map(|n| estimate(n).width)
            .fold(0.0f32, f32::max);
        assert_eq!(nodes[0].x, 0.0);
        assert_eq!(nodes[1].x, widest + COLUMN_GAP);
        assert_eq!(nodes[2].x, 2.0 * (widest + COLUMN_GAP));
        assert!(nodes.iter().all(|n| n.y == 0.0));
    }

    #[test]
    fn non_file_nodes_go_below_the_file_row() {
        let mut nodes = vec![
            Node::file("f1", "a.py", vec![]),
            Node::symbol("s1", "run", "a.py", 3),
        ];
        layout(&mut nodes, &[], Direction::LeftRight);
        assert!(nodes[1].y > nodes[0].y);
    }

    #[test]
    fn symbol_only_graph_groups_columns_by_file() {
        let mut nodes = vec![
            Node::symbol("s1", "alpha", "b.py", 1),
            Node::symbol("s2", "beta", "a.py", 1),
            Node::symbol("s3", "gamma", "a.py", 9),
        ];
        layout(&mut nodes, &[], Direction::LeftRight);

        // a.py sorts before b.py, so its column is leftmost.
        assert_eq!(nodes[1].x, nodes[2].x);
        assert!(nodes[0].x > nodes[1].x);
        // rows follow symbol order within the column
        assert!(nodes[2].y > nodes[1].y);
    }

    #[test]
    fn layered_layout_ranks_targets_after_sources() {
        let mut nodes = vec![
            Node::symbol("a", "a", "x.py", 1),
            Node::symbol("b", "b", "x.py", 2),
            Node::symbol("c", "c", "x.py", 3),
        ];
        let edges = vec![
            Edge::between(NodeId::from("a"), NodeId::from("b")),
            Edge::between(NodeId::from("b"), NodeId::from("c")),
        ];
        layout(&mut nodes, &edges, Direction::LeftRight);
        assert!(nodes[1].x > nodes[0].x);
        assert!(nodes[2].x > nodes[1].x);

        let mut top_down = vec![
            Node::symbol("a", "a", "x.py", 1),
            Node::symbol("b", "b", "x.py", 2),
            Node::symbol("c", "c", "x.py", 3),
        ];
        layout(&mut top_down, &edges, Direction::TopDown);
        assert!(top_down[1].y > top_down[0].y);
        assert!(top_down[2].y > top_down[1].y);
    }

    #[test]
    fn layered_layout_is_deterministic() {
        let build = || {
            vec![
                Node::symbol("n1", "one", "x.py", 1),
                Node::symbol("n2", "two", "x.py", 2),
                Node::symbol("n3", "three", "x.py", 3),
                Node::symbol("n4", "four", "y.py", 4),
            ]
        };
        let edges = vec![
            Edge::between(NodeId::from("n1"), NodeId::from("n2")),
            Edge::between(NodeId::from("n1"), NodeId::from("n3")),
            Edge::between(NodeId::from("n2"), NodeId::from("n4")),
            Edge::between(NodeId::from("n3"), NodeId::from("n4")),
        ];

        let mut first = build();
        let mut second = build();
        layout(&mut first, &edges, Direction::LeftRight);
        layout(&mut second, &edges, Direction::LeftRight);
        assert_eq!(positions(&first), positions(&second));
    }

    #[test]
    fn self_loop_does_not_break_ranking() {
        let mut nodes = vec![
            Node::symbol("a", "a", "x.py", 1),
            Node::symbol("b", "b", "x.py", 2),
        ];
        let edges = vec![
            Edge::between(NodeId::from("a"), NodeId::from("a")),
            Edge::between(NodeId::from("a"), NodeId::from("b")),
        ];
        layout(&mut nodes, &edges, Direction::LeftRight);
        assert!(nodes[1].x > nodes[0].x);
    }
}

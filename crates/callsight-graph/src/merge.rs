//! Incremental merge of expansion fragments into the running graph.
//!
//! A fragment produced by expanding one source node is folded in without a
//! full re-layout: new nodes are stacked in the column to the right of the
//! source, steered around the vertical intervals already occupied there. A
//! full re-layout would reflow parts of the graph the user has already
//! examined, so placement stays local even if dense regions end up with
//! minor overlap.

use crate::geometry::estimate;
use crate::model::GraphModel;
use callsight_core::{Edge, Node, NodeId};
use std::collections::HashSet;

/// Horizontal gap between a source node and its expansion column.
pub const H_GAP: f32 = 60.0;
/// Vertical gap between stacked nodes in an expansion column.
pub const V_GAP: f32 = 20.0;
/// Bound on the first-fit placement scan. Heuristic, kept tunable; when the
/// scan is exhausted the batch is placed at the last attempted position and
/// may overlap (a display degradation, not an error).
pub const MAX_PLACEMENT_ATTEMPTS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub nodes_added: usize,
    pub edges_added: usize,
}

/// Merge a just-fetched fragment into the graph.
///
/// Deduplication is by id with first-seen-wins semantics, which is also what
/// makes interleaved merges of sibling expansions safe: a node that arrived
/// through an earlier fragment keeps its position and payload no matter how
/// often later fragments repeat it.
pub fn merge_expansion(
    graph: &mut GraphModel,
    source: &NodeId,
    new_nodes: Vec<Node>,
    new_edges: Vec<Edge>,
) -> MergeOutcome {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut fresh: Vec<Node> = new_nodes
        .into_iter()
        .filter(|n| !graph.contains_node(&n.id) && seen.insert(n.id.clone()))
        .collect();

    let mut outcome = MergeOutcome::default();

    if fresh.is_empty() {
        graph.mark_expanded(source);
        outcome.edges_added = append_edges(graph, new_edges);
        return outcome;
    }

    place_batch(graph, source, &mut fresh);

    for node in fresh {
        if graph.insert_node(node) {
            outcome.nodes_added += 1;
        }
    }
    outcome.edges_added = append_edges(graph, new_edges);
    graph.mark_expanded(source);
    outcome
}

fn append_edges(graph: &mut GraphModel, edges: Vec<Edge>) -> usize {
    let mut added = 0;
    for edge in edges {
        if graph.contains_edge_between(&edge.source, &edge.target) {
            continue;
        }
        if graph.insert_edge(edge) {
            added += 1;
        }
    }
    added
}

/// Position the batch in the column right of the source, avoiding the
/// vertical intervals occupied by existing nodes near that column.
fn place_batch(graph: &mut GraphModel, source: &NodeId, batch: &mut [Node]) {
    let (x0, y0, source_width) = match graph.node(source) {
        Some(node) => (node.x, node.y, estimate(node).width),
        None => {
            tracing::warn!(source = %source, "expansion source missing, placing fragment at origin");
            (0.0, 0.0, 0.0)
        }
    };
    let x1 = x0 + source_width + H_GAP;

    let heights: Vec<f32> = batch.iter().map(|n| estimate(n).height).collect();
    let column_width = batch
        .iter()
        .map(|n| estimate(n).width)
        .fold(0.0f32, f32::max);

    // Occupied vertical intervals of existing nodes whose x falls within one
    // column-width of the target column.
    let mut occupied: Vec<(f32, f32)> = graph
        .nodes()
        .iter()
        .filter(|n| (n.x - x1).abs() < column_width)
        .map(|n| (n.y, n.y + estimate(n).height))
        .collect();
    occupied.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let step = heights[0] + V_GAP;
    let mut start_y = y0;
    for attempt in 0..MAX_PLACEMENT_ATTEMPTS {
        if fits(start_y, &heights, &occupied) {
            break;
        }
        start_y += step;
        if attempt + 1 == MAX_PLACEMENT_ATTEMPTS {
            tracing::debug!(
                source = %source,
                "placement scan exhausted, accepting overlap at y={start_y}"
            );
        }
    }

    let mut y = start_y;
    for (node, height) in batch.iter_mut().zip(&heights) {
        node.x = x1;
        node.y = y;
        y += height + V_GAP;
    }
}

/// Whether the whole stacked batch starting at `start_y` stays clear of every
/// occupied interval.
fn fits(start_y: f32, heights: &[f32], occupied: &[(f32, f32)]) -> bool {
    let mut y = start_y;
    for &height in heights {
        let bottom = y + height;
        for &(top, occ_bottom) in occupied {
            if y < occ_bottom && bottom > top {
                return false;
            }
        }
        y = bottom + V_GAP;
    }
    true
}

//! Validation of wire fragments into model types.
//!
//! Malformed entries are dropped individually; the rest of the fragment is
//! still usable. Nothing here is all-or-nothing.

use crate::protocol::{WireEdge, WireNode, WireSymbol};
use crate::{Edge, Node, NodeId, NodePayload, Symbol, SymbolKind};

pub fn symbol(raw: WireSymbol) -> Option<Symbol> {
    let name = raw.name?;
    let start_line = raw.start_line?;
    // Coerce inverted ranges instead of dropping the entry.
    let end_line = raw.end_line.unwrap_or(start_line).max(start_line);
    Some(Symbol {
        name,
        kind: raw.kind.as_deref().map(SymbolKind::parse).unwrap_or(SymbolKind::Other),
        start_line,
        end_line,
        column: raw.column.unwrap_or(1),
    })
}

pub fn node(raw: WireNode) -> Option<Node> {
    let Some(id) = raw.id else {
        tracing::warn!("dropping fragment node without an id");
        return None;
    };

    let payload = match raw.kind.as_deref() {
        Some("file") => {
            let Some(path) = raw.path else {
                tracing::warn!(id = %id, "dropping file node without a path");
                return None;
            };
            let label = raw.label.unwrap_or_else(|| {
                path.rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(path.as_str())
                    .to_string()
            });
            let symbols = raw.symbols.into_iter().filter_map(symbol).collect();
            NodePayload::File {
                path,
                label,
                symbols,
            }
        }
        Some("symbol") => {
            let (Some(label), Some(file), Some(line)) = (raw.label, raw.file, raw.line) else {
                tracing::warn!(id = %id, "dropping symbol node with missing fields");
                return None;
            };
            NodePayload::Symbol {
                label,
                file,
                line,
                end_line: raw.end_line,
                has_calls: raw.has_calls.unwrap_or(false),
            }
        }
        other => {
            tracing::warn!(id = %id, kind = ?other, "dropping node with unknown kind");
            return None;
        }
    };

    Some(Node {
        id: NodeId(id),
        x: 0.0,
        y: 0.0,
        payload,
    })
}

pub fn edge(raw: WireEdge) -> Option<Edge> {
    let (Some(source), Some(target)) = (raw.source, raw.target) else {
        tracing::warn!("dropping fragment edge with a missing endpoint");
        return None;
    };
    // Self-loops are passed through; if the analysis side reports a
    // self-call we show it.
    Some(Edge::between(NodeId(source), NodeId(target)))
}

/// Validate a whole fragment, keeping every well-formed entry.
pub fn fragment(nodes: Vec<WireNode>, edges: Vec<WireEdge>) -> (Vec<Node>, Vec<Edge>) {
    let nodes = nodes.into_iter().filter_map(node).collect();
    let edges = edges.into_iter().filter_map(edge).collect();
    (nodes, edges)
}

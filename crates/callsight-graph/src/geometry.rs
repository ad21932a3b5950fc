//! Expected on-screen size of a node, derived from its content.
//!
//! Pure functions of the node payload. Sizes are never cached on the node;
//! callers re-derive them whenever a symbol list may have changed.

use callsight_core::{Node, NodePayload, SymbolKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Approximate width of one label character at the default font size.
const CHAR_WIDTH: f32 = 8.0;

const SYMBOL_MIN_WIDTH: f32 = 180.0;
const SYMBOL_LABEL_PADDING: f32 = 80.0;
const SYMBOL_HEIGHT: f32 = 70.0;

const FILE_MIN_WIDTH: f32 = 280.0;
const FILE_LABEL_PADDING: f32 = 120.0;
/// Reserved for the expandable code-preview panel next to the symbol list.
const PREVIEW_PANEL_WIDTH: f32 = 300.0;
const FILE_HEADER_HEIGHT: f32 = 50.0;
const FILE_BODY_MAX_HEIGHT: f32 = 300.0;
const SYMBOL_ROW_HEIGHT: f32 = 28.0;
const KIND_GROUP_HEIGHT: f32 = 24.0;
const FILE_PADDING: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

pub fn estimate(node: &Node) -> Size {
    match &node.payload {
        NodePayload::Symbol { label, .. } => Size {
            width: (CHAR_WIDTH * label.len() as f32 + SYMBOL_LABEL_PADDING).max(SYMBOL_MIN_WIDTH),
            height: SYMBOL_HEIGHT,
        },
        NodePayload::File { label, symbols, .. } => {
            let longest_name = symbols
                .iter()
                .map(|s| s.name.len())
                .max()
                .unwrap_or(0)
                .max(label.len());
            let width = (CHAR_WIDTH * longest_name as f32 + FILE_LABEL_PADDING)
                .max(FILE_MIN_WIDTH)
                + PREVIEW_PANEL_WIDTH;

            let kinds: HashSet<SymbolKind> = symbols.iter().map(|s| s.kind).collect();
            let body = (SYMBOL_ROW_HEIGHT * symbols.len() as f32
                + KIND_GROUP_HEIGHT * kinds.len() as f32)
                .min(FILE_BODY_MAX_HEIGHT);

            Size {
                width,
                height: FILE_HEADER_HEIGHT + body + FILE_PADDING,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsight_core::{Node, Symbol, SymbolKind};

    fn sym(name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind,
            start_line: 1,
            end_line: 1,
            column: 1,
        }
    }

    #[test]
    fn empty_file_node_uses_minimum_width_plus_preview() {
        let node = Node::file("f1", "models.py", vec![]);
        let size = estimate(&node);
        // label 9 chars: 8*9 + 120 = 192, clamped to 280, plus the preview reserve
        assert_eq!(size.width, 280.0 + 300.0);
        assert_eq!(size.height, 50.0 + 0.0 + 16.0);
    }

    #[test]
    fn file_width_grows_with_longest_symbol_name() {
        let node = Node::file(
            "f1",
            "a.py",
            vec![sym(
                "a_very_long_function_name_indeed",
                SymbolKind::Function,
            )],
        );
        let size = estimate(&node);
        // 32 chars: 8*32 + 120 = 376 > 280
        assert_eq!(size.width, 376.0 + 300.0);
    }

    #[test]
    fn file_height_counts_rows_and_distinct_kinds_capped() {
        let node = Node::file(
            "f1",
            "a.py",
            vec![
                sym("a", SymbolKind::Function),
                sym("b", SymbolKind::Function),
                sym("C", SymbolKind::Class),
            ],
        );
        let size = estimate(&node);
        // 3 rows * 28 + 2 kinds * 24 = 132
        assert_eq!(size.height, 50.0 + 132.0 + 16.0);

        let many: Vec<Symbol> = (0..40)
            .map(|i| sym(&format!("f{i}"), SymbolKind::Function))
            .collect();
        let tall = Node::file("f2", "b.py", many);
        // body capped at 300
        assert_eq!(estimate(&tall).height, 50.0 + 300.0 + 16.0);
    }

    #[test]
    fn symbol_node_width_scales_with_label() {
        let short = Node::symbol("s1", "run", "a.py", 1);
        assert_eq!(estimate(&short).width, 180.0);
        assert_eq!(estimate(&short).height, 70.0);

        let long = Node::symbol("s2", "handle_incoming_request", "a.py", 1);
        // 23 chars: 8*23 + 80 = 264
        assert_eq!(estimate(&long).width, 264.0);
    }

    #[test]
    fn estimate_is_pure() {
        let node = Node::file("f1", "models.py", vec![]);
        assert_eq!(estimate(&node), estimate(&node));
    }
}

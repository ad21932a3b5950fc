//! Wire shapes exchanged with the editor-side collaborator.
//!
//! Fragments arrive with opportunistically filled fields, so the wire types
//! keep everything optional; `ingest` validates them into model types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSymbol {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub column: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireNode {
    pub id: Option<String>,
    /// "file" or "symbol"
    pub kind: Option<String>,

    // file variant
    pub path: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub symbols: Vec<WireSymbol>,

    // symbol variant
    pub file: Option<String>,
    pub line: Option<u32>,
    pub end_line: Option<u32>,
    pub has_calls: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEdge {
    pub source: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetLine {
    pub num: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    Ping {
        id: u64,
    },
    Pong {
        id: u64,
    },

    // editor -> callsight: replaces the whole displayed graph
    GraphPush {
        nodes: Vec<WireNode>,
        edges: Vec<WireEdge>,
    },

    // callsight -> editor, fire-and-forget with attached correlation id
    ExpandRequest {
        request_id: String,
        filepath: String,
        line: u32,
        column: u32,
    },
    // editor -> callsight, out-of-band, matched via request_id
    ExpandResult {
        request_id: String,
        nodes: Vec<WireNode>,
        edges: Vec<WireEdge>,
    },

    ReferencesRequest {
        request_id: String,
        filepath: String,
        line: u32,
        column: u32,
    },
    ReferencesResult {
        request_id: String,
        files: Vec<String>,
    },

    // callsight -> editor, best-effort, no correlation
    Navigate {
        filepath: String,
        line: u32,
    },

    // code-preview fetch, answered synchronously by the file-read side
    SnippetRequest {
        request_id: String,
        filepath: String,
        line: u32,
        end_line: Option<u32>,
        context_lines: Option<u32>,
    },
    SnippetResult {
        request_id: String,
        lines: Vec<SnippetLine>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization() {
        let msg = BridgeMessage::Ping { id: 123 };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Ping","id":123}"#);

        let msg = BridgeMessage::Navigate {
            filepath: "src/main.rs".to_string(),
            line: 10,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Navigate","filepath":"src/main.rs","line":10}"#
        );
    }

    #[test]
    fn test_deserialization() {
        let json = r#"{"type":"ExpandResult","request_id":"expand-1-a","nodes":[],"edges":[]}"#;
        let msg: BridgeMessage = serde_json::from_str(json).unwrap();
        match msg {
            BridgeMessage::ExpandResult {
                request_id,
                nodes,
                edges,
            } => {
                assert_eq!(request_id, "expand-1-a");
                assert!(nodes.is_empty());
                assert!(edges.is_empty());
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn wire_node_tolerates_missing_fields() {
        let json = r#"{"id":"n1","kind":"symbol","label":"run"}"#;
        let node: WireNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.id.as_deref(), Some("n1"));
        assert!(node.file.is_none());
        assert!(node.symbols.is_empty());
    }
}

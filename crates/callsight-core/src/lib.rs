use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod ingest;
pub mod protocol;

pub use error::SessionError;

/// Globally unique node identity within a graph session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Edge identity is derived from the endpoint pair, so the same
    /// (source, target) pair always maps to the same id.
    pub fn between(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("{}->{}", source.0, target.0))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Struct,
    Interface,
    Enum,
    Module,
    Function,
    Method,
    Variable,
    Constant,
    Property,
    Field,
    Other,
}

impl SymbolKind {
    /// Parse a wire kind tag. Unknown tags map to `Other` rather than
    /// failing the whole fragment.
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "class" => Self::Class,
            "struct" => Self::Struct,
            "interface" => Self::Interface,
            "enum" => Self::Enum,
            "module" => Self::Module,
            "function" => Self::Function,
            "method" => Self::Method,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            "property" => Self::Property,
            "field" => Self::Field,
            _ => Self::Other,
        }
    }
}

/// A symbol entry embedded in a file node.
///
/// All line and column numbers are 1-based. Invariant: `end_line >= start_line`;
/// wire entries that violate it are coerced at ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub end_line: u32,
    pub column: u32,
}

/// Kind-specific node payload with an explicit discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodePayload {
    File {
        path: String,
        label: String,
        symbols: Vec<Symbol>,
    },
    Symbol {
        label: String,
        file: String,
        /// 1-based line of the symbol definition
        line: u32,
        end_line: Option<u32>,
        has_calls: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Top-left coordinates, assigned by layout/merge.
    pub x: f32,
    pub y: f32,
    #[serde(flatten)]
    pub payload: NodePayload,
}

impl Node {
    pub fn file(id: impl Into<String>, path: impl Into<String>, symbols: Vec<Symbol>) -> Self {
        let path = path.into();
        let label = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        Self {
            id: NodeId::new(id),
            x: 0.0,
            y: 0.0,
            payload: NodePayload::File {
                path,
                label,
                symbols,
            },
        }
    }

    pub fn symbol(
        id: impl Into<String>,
        label: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            id: NodeId::new(id),
            x: 0.0,
            y: 0.0,
            payload: NodePayload::Symbol {
                label: label.into(),
                file: file.into(),
                line,
                end_line: None,
                has_calls: false,
            },
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.payload, NodePayload::File { .. })
    }

    pub fn label(&self) -> &str {
        match &self.payload {
            NodePayload::File { label, .. } => label,
            NodePayload::Symbol { label, .. } => label,
        }
    }

    /// The file this node originates from.
    pub fn origin_file(&self) -> &str {
        match &self.payload {
            NodePayload::File { path, .. } => path,
            NodePayload::Symbol { file, .. } => file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn between(source: NodeId, target: NodeId) -> Self {
        Self {
            id: EdgeId::between(&source, &target),
            source,
            target,
        }
    }
}

/// Flow direction for the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    LeftRight,
    TopDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_is_derived_from_endpoints() {
        let a = NodeId::from("fileA");
        let b = NodeId::from("fileB");
        let edge = Edge::between(a.clone(), b.clone());
        assert_eq!(edge.id, EdgeId::between(&a, &b));
        assert_eq!(edge.id.0, "fileA->fileB");
    }

    #[test]
    fn file_node_label_is_basename() {
        let node = Node::file("f1", "src/models.py", vec![]);
        assert_eq!(node.label(), "models.py");
        assert_eq!(node.origin_file(), "src/models.py");
        assert!(node.is_file());
    }

    #[test]
    fn symbol_kind_parse_tolerates_unknown_tags() {
        assert_eq!(SymbolKind::parse("Method"), SymbolKind::Method);
        assert_eq!(SymbolKind::parse("whatever"), SymbolKind::Other);
    }

    #[test]
    fn node_payload_roundtrips_with_kind_tag() {
        let node = Node::symbol("s1", "run", "src/main.rs", 12);
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""kind":"symbol""#));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}

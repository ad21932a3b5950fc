//! The visualization session: exclusive owner of the running graph.
//!
//! Expansion requests suspend at the provider boundary and resume when the
//! correlated response arrives or times out. Multiple expansions may be in
//! flight; each merges independently, which is safe because merging
//! deduplicates by id. Collaborator failures degrade to empty results here
//! and never surface to the display layer.

use crate::correlate::PendingRequests;
use callsight_core::protocol::{WireEdge, WireNode};
use callsight_core::{Direction, NodeId, SessionError, ingest};
use callsight_events::{Event, EventBus};
use callsight_graph::{GraphModel, MergeOutcome, merge_expansion};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Outbound, fire-and-forget side of the analysis collaborator. `Err` means
/// the provider cannot be reached right now.
pub trait AnalysisProvider: Send + Sync {
    fn request_expand(
        &self,
        request_id: &str,
        filepath: &str,
        line: u32,
        column: u32,
    ) -> Result<(), SessionError>;

    fn request_references(
        &self,
        request_id: &str,
        filepath: &str,
        line: u32,
        column: u32,
    ) -> Result<(), SessionError>;

    fn navigate(&self, filepath: &str, line: u32) -> Result<(), SessionError>;
}

/// A partial node/edge set produced by one expansion call, still in wire
/// shape; validated right before merging.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub nodes: Vec<WireNode>,
    pub edges: Vec<WireEdge>,
}

pub struct VizSession {
    graph: Mutex<GraphModel>,
    expansions: PendingRequests<Fragment>,
    references: PendingRequests<Vec<String>>,
    provider: Arc<dyn AnalysisProvider>,
    bus: EventBus,
    timeout: Duration,
    direction: Direction,
}

impl VizSession {
    pub fn new(provider: Arc<dyn AnalysisProvider>, bus: EventBus, timeout: Duration) -> Self {
        Self {
            graph: Mutex::new(GraphModel::new()),
            expansions: PendingRequests::new(),
            references: PendingRequests::new(),
            provider,
            bus,
            timeout,
            direction: Direction::LeftRight,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Run a read-only query against the graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&GraphModel) -> R) -> R {
        f(&self.graph.lock())
    }

    /// Replace the displayed graph with a push from the analysis side and run
    /// a full layout pass. This is the only operation that reflows existing
    /// nodes.
    pub fn load_graph(&self, nodes: Vec<WireNode>, edges: Vec<WireEdge>) {
        let (nodes, edges) = ingest::fragment(nodes, edges);
        let (node_count, edge_count) = {
            let mut graph = self.graph.lock();
            graph.replace(nodes, edges);
            graph.relayout(self.direction);
            (graph.node_count(), graph.edge_count())
        };
        tracing::info!(node_count, edge_count, "graph replaced");
        self.bus.publish(Event::GraphReplaced {
            node_count,
            edge_count,
        });
    }

    /// Expand a node: request its outgoing relationships from the analysis
    /// provider and merge the resulting fragment. Timeouts and an unreachable
    /// provider both come back as an empty outcome.
    pub async fn expand(
        &self,
        source: NodeId,
        filepath: &str,
        line: u32,
        column: u32,
    ) -> MergeOutcome {
        let (request_id, reply) = self.expansions.create("expand", self.timeout);
        if let Err(err) = self
            .provider
            .request_expand(&request_id, filepath, line, column)
        {
            tracing::warn!(source = %source, error = %err, "expand request not sent");
            self.expansions.cancel(&request_id);
            return MergeOutcome::default();
        }

        match reply.recv().await {
            Ok(fragment) => {
                let (nodes, edges) = ingest::fragment(fragment.nodes, fragment.edges);
                let outcome = {
                    let mut graph = self.graph.lock();
                    merge_expansion(&mut graph, &source, nodes, edges)
                };
                self.bus.publish(Event::NodesMerged {
                    source: source.clone(),
                    nodes_added: outcome.nodes_added,
                    edges_added: outcome.edges_added,
                });
                self.bus.publish(Event::NodeExpanded { id: source });
                outcome
            }
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "expansion yielded no data");
                MergeOutcome::default()
            }
        }
    }

    /// Hover-driven side query: which files reference the symbol at the given
    /// location. Marks the returned files highlighted; never moves nodes and
    /// never merges.
    pub async fn highlight_references(&self, filepath: &str, line: u32, column: u32) -> Vec<String> {
        let (request_id, reply) = self.references.create("refs", self.timeout);
        if let Err(err) = self
            .provider
            .request_references(&request_id, filepath, line, column)
        {
            tracing::warn!(error = %err, "references request not sent");
            self.references.cancel(&request_id);
            return Vec::new();
        }

        let files = match reply.recv().await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(error = %err, "references lookup yielded no data");
                Vec::new()
            }
        };

        self.graph.lock().set_highlighted(&files);
        self.bus.publish(Event::HighlightChanged {
            files: files.clone(),
        });
        files
    }

    /// Inbound routing for out-of-band expansion results.
    pub fn resolve_expansion(&self, request_id: &str, nodes: Vec<WireNode>, edges: Vec<WireEdge>) {
        self.expansions.resolve(request_id, Fragment { nodes, edges });
    }

    /// Inbound routing for out-of-band references results.
    pub fn resolve_references(&self, request_id: &str, files: Vec<String>) {
        self.references.resolve(request_id, files);
    }

    /// Best-effort jump-to-source command toward the editor. No correlation.
    pub fn navigate(&self, filepath: &str, line: u32) {
        if let Err(err) = self.provider.navigate(filepath, line) {
            tracing::warn!(filepath, line, error = %err, "navigate command not delivered");
        }
        self.bus.publish(Event::NavigateRequested {
            filepath: filepath.to_string(),
            line,
        });
    }

    /// Symbols of a file currently present in the graph, for the snippet
    /// fetcher's enclosing-range lookup.
    pub fn file_symbols(&self, filepath: &str) -> Option<Vec<callsight_core::Symbol>> {
        self.graph
            .lock()
            .file_symbols(filepath)
            .map(|symbols| symbols.to_vec())
    }
}

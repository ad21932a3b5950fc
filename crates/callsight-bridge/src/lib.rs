//! Newline-delimited-JSON TCP bridge toward the editor collaborator.
//!
//! Inbound messages (graph pushes, expand/references results) are routed into
//! the session; outbound messages (expand/references requests, navigate
//! commands) travel through the currently attached connection. With no editor
//! attached, outbound sends fail and the session treats the provider as
//! unavailable.

use callsight_core::SessionError;
use callsight_core::protocol::BridgeMessage;
use callsight_session::{AnalysisProvider, SnippetFetcher, VizSession};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Handle to the currently connected editor, if any. Doubles as the
/// session's `AnalysisProvider`.
#[derive(Clone, Default)]
pub struct EditorLink {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<BridgeMessage>>>>,
}

impl EditorLink {
    pub fn attach(&self, tx: mpsc::UnboundedSender<BridgeMessage>) {
        *self.tx.lock() = Some(tx);
    }

    pub fn detach(&self) {
        *self.tx.lock() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.tx.lock().is_some()
    }

    pub fn send(&self, message: BridgeMessage) -> Result<(), SessionError> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(SessionError::ProviderUnavailable(
                "no editor connected".to_string(),
            ));
        };
        tx.send(message)
            .map_err(|_| SessionError::ProviderUnavailable("editor connection closed".to_string()))
    }
}

impl AnalysisProvider for EditorLink {
    fn request_expand(
        &self,
        request_id: &str,
        filepath: &str,
        line: u32,
        column: u32,
    ) -> Result<(), SessionError> {
        self.send(BridgeMessage::ExpandRequest {
            request_id: request_id.to_string(),
            filepath: filepath.to_string(),
            line,
            column,
        })
    }

    fn request_references(
        &self,
        request_id: &str,
        filepath: &str,
        line: u32,
        column: u32,
    ) -> Result<(), SessionError> {
        self.send(BridgeMessage::ReferencesRequest {
            request_id: request_id.to_string(),
            filepath: filepath.to_string(),
            line,
            column,
        })
    }

    fn navigate(&self, filepath: &str, line: u32) -> Result<(), SessionError> {
        self.send(BridgeMessage::Navigate {
            filepath: filepath.to_string(),
            line,
        })
    }
}

/// Route one inbound message into the session. Outbound-only message types
/// arriving here are ignored with a warning.
pub fn handle_message(
    session: &VizSession,
    link: &EditorLink,
    snippets: &SnippetFetcher,
    message: BridgeMessage,
) {
    match message {
        BridgeMessage::Ping { id } => {
            let _ = link.send(BridgeMessage::Pong { id });
        }
        BridgeMessage::GraphPush { nodes, edges } => {
            session.load_graph(nodes, edges);
        }
        BridgeMessage::SnippetRequest {
            request_id,
            filepath,
            line,
            end_line,
            context_lines,
        } => {
            let lines = snippets.fetch(&filepath, line, end_line, context_lines);
            let _ = link.send(BridgeMessage::SnippetResult { request_id, lines });
        }
        BridgeMessage::ExpandResult {
            request_id,
            nodes,
            edges,
        } => {
            session.resolve_expansion(&request_id, nodes, edges);
        }
        BridgeMessage::ReferencesResult { request_id, files } => {
            session.resolve_references(&request_id, files);
        }
        other => {
            tracing::warn!(message = ?other, "ignoring outbound-only message on inbound channel");
        }
    }
}

pub struct BridgeServer {
    session: Arc<VizSession>,
    link: EditorLink,
    snippets: Arc<SnippetFetcher>,
    listener: TcpListener,
}

impl BridgeServer {
    /// Bind the bridge; the bound address is useful when the caller asked
    /// for port 0.
    pub async fn bind(
        session: Arc<VizSession>,
        link: EditorLink,
        snippets: Arc<SnippetFetcher>,
        addr: &str,
    ) -> std::io::Result<(Self, SocketAddr)> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "bridge listening");
        Ok((
            Self {
                session,
                link,
                snippets,
                listener,
            },
            local,
        ))
    }

    pub async fn serve(self) -> std::io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer)) => {
                    tracing::info!(peer = %peer, "editor connected");
                    let session = Arc::clone(&self.session);
                    let link = self.link.clone();
                    let snippets = Arc::clone(&self.snippets);
                    tokio::spawn(async move {
                        handle_connection(socket, session, link.clone(), snippets).await;
                        link.detach();
                        tracing::info!(peer = %peer, "editor disconnected");
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "accept failed");
                }
            }
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    session: Arc<VizSession>,
    link: EditorLink,
    snippets: Arc<SnippetFetcher>,
) {
    let (reader, mut writer) = socket.into_split();

    let (tx, mut rx) = mpsc::unbounded_channel::<BridgeMessage>();
    link.attach(tx);

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if writer.write_all(format!("{json}\n").as_bytes()).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode outbound message");
                }
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<BridgeMessage>(&line) {
            Ok(message) => handle_message(&session, &link, &snippets, message),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unparseable bridge line");
            }
        }
    }

    writer_task.abort();
}

use anyhow::Result;
use callsight_bridge::{BridgeServer, EditorLink};
use callsight_events::EventBus;
use callsight_session::{GraphSymbols, SnippetFetcher, VizSession};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port the editor bridge listens on
    #[arg(short, long, default_value_t = 6671)]
    port: u16,

    /// Timeout for correlated requests toward the editor, in milliseconds
    #[arg(long, default_value_t = 15_000)]
    timeout_ms: u64,

    /// Context lines around a snippet when no symbol range is known
    #[arg(long, default_value_t = 6)]
    context_lines: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let bus = EventBus::new();
    let link = EditorLink::default();
    let session = Arc::new(VizSession::new(
        Arc::new(link.clone()),
        bus,
        Duration::from_millis(args.timeout_ms),
    ));

    let snippets = Arc::new(SnippetFetcher::new(
        Arc::new(GraphSymbols::new(Arc::clone(&session))),
        args.context_lines,
    ));

    let (server, addr) = BridgeServer::bind(
        Arc::clone(&session),
        link,
        snippets,
        &format!("127.0.0.1:{}", args.port),
    )
    .await?;
    tracing::info!(addr = %addr, "callsight ready");
    server.serve().await?;
    Ok(())
}

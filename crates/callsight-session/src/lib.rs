pub mod correlate;
pub mod session;
pub mod snippets;

pub use correlate::{PendingReply, PendingRequests};
pub use session::{AnalysisProvider, Fragment, VizSession};
pub use snippets::{GraphSymbols, SnippetFetcher, SymbolSource};

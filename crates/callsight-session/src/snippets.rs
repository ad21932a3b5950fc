//! Code-snippet fetch for the preview panel.
//!
//! When the caller does not know the symbol's end line, the enclosing
//! symbol's true range is resolved through a symbols lookup cached per
//! filepath; only when no enclosing symbol is known does the fetch fall back
//! to a fixed context window around the line.

use callsight_core::Symbol;
use callsight_core::protocol::SnippetLine;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of document symbols for a file, e.g. the running graph or the
/// editor-side analysis provider.
pub trait SymbolSource: Send + Sync {
    fn document_symbols(&self, filepath: &str) -> Option<Vec<Symbol>>;
}

pub struct SnippetFetcher {
    source: Arc<dyn SymbolSource>,
    cache: Mutex<HashMap<String, Vec<Symbol>>>,
    default_context_lines: u32,
}

impl SnippetFetcher {
    pub fn new(source: Arc<dyn SymbolSource>, default_context_lines: u32) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
            default_context_lines,
        }
    }

    /// Read the requested lines from disk. I/O failures degrade to an empty
    /// list; the preview panel simply stays blank.
    pub fn fetch(
        &self,
        filepath: &str,
        line: u32,
        end_line: Option<u32>,
        context_lines: Option<u32>,
    ) -> Vec<SnippetLine> {
        let context_lines = context_lines.unwrap_or(self.default_context_lines);
        let text = match std::fs::read_to_string(filepath) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(filepath, error = %err, "snippet read failed");
                return Vec::new();
            }
        };
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let (start, end) = match end_line {
            Some(end) => (line, end.max(line)),
            None => match self.enclosing_range(filepath, line) {
                Some(range) => range,
                None => (
                    line.saturating_sub(context_lines).max(1),
                    line + context_lines,
                ),
            },
        };

        let start = start.max(1) as usize;
        let end = (end as usize).min(lines.len());
        if start > end {
            return Vec::new();
        }

        (start..=end)
            .map(|num| SnippetLine {
                num: num as u32,
                text: lines[num - 1].to_string(),
            })
            .collect()
    }

    /// The tightest symbol range containing `line`, from the cached per-file
    /// symbol list.
    fn enclosing_range(&self, filepath: &str, line: u32) -> Option<(u32, u32)> {
        let mut cache = self.cache.lock();
        if !cache.contains_key(filepath) {
            let fetched = self.source.document_symbols(filepath)?;
            cache.insert(filepath.to_string(), fetched);
        }

        cache[filepath]
            .iter()
            .filter(|s| s.start_line <= line && line <= s.end_line)
            .min_by_key(|s| s.end_line - s.start_line)
            .map(|s| (s.start_line, s.end_line))
    }

    /// Drop the cached symbols for a file, e.g. after it was re-pushed.
    pub fn invalidate(&self, filepath: &str) {
        self.cache.lock().remove(filepath);
    }
}

/// Answers symbol lookups from the file nodes of the running graph, which
/// already carry the extracted symbol ranges.
pub struct GraphSymbols {
    session: std::sync::Arc<crate::VizSession>,
}

impl GraphSymbols {
    pub fn new(session: std::sync::Arc<crate::VizSession>) -> Self {
        Self { session }
    }
}

impl SymbolSource for GraphSymbols {
    fn document_symbols(&self, filepath: &str) -> Option<Vec<Symbol>> {
        self.session.file_symbols(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsight_core::SymbolKind;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;

    struct FixedSymbols {
        symbols: Vec<Symbol>,
        lookups: AtomicUsize,
    }

    impl FixedSymbols {
        fn new(symbols: Vec<Symbol>) -> Self {
            Self {
                symbols,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl SymbolSource for FixedSymbols {
        fn document_symbols(&self, _filepath: &str) -> Option<Vec<Symbol>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Some(self.symbols.clone())
        }
    }

    fn sym(name: &str, start: u32, end: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            start_line: start,
            end_line: end,
            column: 1,
        }
    }

    fn ten_line_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(file, "line {i}").unwrap();
        }
        file
    }

    #[test]
    fn explicit_range_is_returned_verbatim() {
        let file = ten_line_file();
        let fetcher = SnippetFetcher::new(Arc::new(FixedSymbols::new(vec![])), 3);

        let lines = fetcher.fetch(file.path().to_str().unwrap(), 2, Some(4), None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].num, 2);
        assert_eq!(lines[0].text, "line 2");
        assert_eq!(lines[2].num, 4);
    }

    #[test]
    fn missing_end_line_resolves_enclosing_symbol_range() {
        let file = ten_line_file();
        let source = Arc::new(FixedSymbols::new(vec![
            sym("outer", 1, 9),
            sym("inner", 3, 6),
        ]));
        let fetcher = SnippetFetcher::new(source.clone(), 2);

        let path = file.path().to_str().unwrap().to_string();
        let lines = fetcher.fetch(&path, 4, None, None);
        // tightest enclosing symbol wins
        assert_eq!(lines.first().unwrap().num, 3);
        assert_eq!(lines.last().unwrap().num, 6);

        // second fetch hits the per-file cache
        fetcher.fetch(&path, 5, None, None);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);

        fetcher.invalidate(&path);
        fetcher.fetch(&path, 5, None, None);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn falls_back_to_context_window_without_symbols() {
        let file = ten_line_file();
        let fetcher = SnippetFetcher::new(Arc::new(FixedSymbols::new(vec![])), 2);

        let lines = fetcher.fetch(file.path().to_str().unwrap(), 5, None, None);
        assert_eq!(lines.first().unwrap().num, 3);
        assert_eq!(lines.last().unwrap().num, 7);

        // window is clamped at the top of the file
        let lines = fetcher.fetch(file.path().to_str().unwrap(), 1, None, None);
        assert_eq!(lines.first().unwrap().num, 1);
    }

    #[test]
    fn unreadable_file_degrades_to_empty() {
        let fetcher = SnippetFetcher::new(Arc::new(FixedSymbols::new(vec![])), 2);
        assert!(fetcher.fetch("/no/such/file.py", 1, None, None).is_empty());
    }
}

//! Semantic tokens server facade.
//!
//! [`SemanticTokensServer`] owns the open documents and answers the text synchronization
//! notifications and semantic token requests of one client. It is transport agnostic: the
//! host decodes JSON-RPC messages into the typed parameters below and serializes the
//! returned values.

use crate::encoder::{encode_batches, encode_full, encode_patch, encode_range, range_lines};
use crate::legend::SemanticTokensLegend;
use crate::protocol::{
    ContentChange, LspRange, SemanticTokens, SemanticTokensDelta, SemanticTokensPartialResult,
};
use semcolor_core::{
    AnalysisResult, AnalyzerError, AnalyzerOptions, Document, DocumentRegistry, Edit, EditError,
    LineTokenizer, split_lines,
};
use semcolor_grammar::ComparisonGrammar;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// `TextDocumentSyncKind.Incremental`.
const SYNC_INCREMENTAL: u32 = 2;

/// Server configuration, readable from the client's `initializationOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerOptions {
    /// Options of every document's analyzer.
    pub analyzer: AnalyzerOptions,
    /// Lines per progress report of partial full and range requests (at least 1).
    pub partial_batch_lines: usize,
    /// How long a token request waits for in-flight analysis before answering with the last
    /// completed pass. `None` answers immediately.
    pub settle_timeout_ms: Option<u64>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerOptions::default(),
            partial_batch_lines: 1,
            settle_timeout_ms: None,
        }
    }
}

impl ServerOptions {
    /// Read options from `initializationOptions`. Missing fields keep their defaults.
    pub fn from_initialization_options(value: Option<&Value>) -> Result<Self, serde_json::Error> {
        match value {
            Some(value) if !value.is_null() => Self::deserialize(value),
            _ => Ok(Self::default()),
        }
    }
}

/// Errors surfaced to the client.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request names a document that is not open.
    #[error("document is not open: {0}")]
    UnknownDocument(String),
    /// A content change spans more than one line.
    #[error("change spans lines {start_line}..={end_line}; only single-line changes are supported")]
    MultiLineChange {
        /// First line of the range.
        start_line: u32,
        /// Last line of the range.
        end_line: u32,
    },
    /// A content change ends before it starts.
    #[error("change range on line {line} ends before it starts")]
    InvertedRange {
        /// Line of the range.
        line: u32,
    },
    /// The translated edit batch was rejected by the buffer.
    #[error(transparent)]
    Edit(#[from] EditError),
    /// A document's analyzer could not be started.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    /// The grammar's lexer failed to build.
    #[error("invalid grammar: {0}")]
    Grammar(#[from] regex::Error),
}

/// Translate one single-line content change into a buffer edit.
fn edit_from_change(change: &ContentChange) -> Result<Edit, ServerError> {
    let LspRange { start, end } = change.range;
    if start.line != end.line {
        return Err(ServerError::MultiLineChange {
            start_line: start.line,
            end_line: end.line,
        });
    }
    let delete_len = end
        .character
        .checked_sub(start.character)
        .ok_or(ServerError::InvertedRange { line: start.line })?;
    Ok(Edit::new(
        start.line as usize,
        start.character as usize,
        delete_len as usize,
        change.text.as_str(),
    ))
}

/// Open documents plus the semantic token requests over them.
pub struct SemanticTokensServer {
    documents: DocumentRegistry,
    legend: SemanticTokensLegend,
    options: ServerOptions,
}

impl std::fmt::Debug for SemanticTokensServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticTokensServer")
            .field("documents", &self.documents)
            .field("options", &self.options)
            .finish()
    }
}

impl SemanticTokensServer {
    /// Create a server colorizing with [`ComparisonGrammar`].
    pub fn new(options: ServerOptions) -> Result<Self, ServerError> {
        let grammar = ComparisonGrammar::new()?;
        Ok(Self::with_tokenizer(Arc::new(grammar), options))
    }

    /// Create a server colorizing with a custom tokenizer.
    pub fn with_tokenizer(tokenizer: Arc<dyn LineTokenizer>, options: ServerOptions) -> Self {
        Self {
            documents: DocumentRegistry::new(tokenizer, options.analyzer.clone()),
            legend: SemanticTokensLegend::standard(),
            options,
        }
    }

    /// Server configuration.
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Legend advertised in the capabilities.
    pub fn legend(&self) -> &SemanticTokensLegend {
        &self.legend
    }

    /// The open documents.
    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    /// `capabilities` of the `initialize` result.
    pub fn capabilities(&self) -> Value {
        json!({
            "positionEncoding": "utf-32",
            "textDocumentSync": {
                "openClose": true,
                "change": SYNC_INCREMENTAL,
            },
            "semanticTokensProvider": {
                "legend": self.legend,
                "full": { "delta": true },
                "range": true,
            },
        })
    }

    /// `textDocument/didOpen`: load `text` into a fresh document.
    ///
    /// Opening an already open URI discards the previous document.
    pub fn did_open(&mut self, uri: &str, text: &str) -> Result<(), ServerError> {
        if self.documents.remove(uri) {
            debug!(uri, "document reopened; discarding previous state");
        }
        let document = self.documents.get_or_create(uri)?;

        let edits: Vec<Edit> = split_lines(text)
            .into_iter()
            .enumerate()
            .map(|(line, text)| Edit::insert_line(line, text))
            .collect();
        document.buffer().replace(&edits)?;
        debug!(uri, lines = edits.len(), "didOpen");
        Ok(())
    }

    /// `textDocument/didChange`: apply all `changes` as one batch.
    ///
    /// Ranges are interpreted against the document before the notification. Multi-line
    /// ranges are rejected and nothing is applied.
    pub fn did_change(&self, uri: &str, changes: &[ContentChange]) -> Result<(), ServerError> {
        let document = self.document(uri)?;
        let edits = changes
            .iter()
            .map(edit_from_change)
            .collect::<Result<Vec<_>, _>>()?;
        let changed = document.buffer().replace(&edits)?;
        debug!(uri, changes = changes.len(), lines = changed.len(), "didChange");
        Ok(())
    }

    /// `textDocument/didClose`. Returns `false` if the document was not open.
    pub fn did_close(&mut self, uri: &str) -> bool {
        self.documents.remove(uri)
    }

    fn document(&self, uri: &str) -> Result<Arc<Document>, ServerError> {
        self.documents
            .get(uri)
            .ok_or_else(|| ServerError::UnknownDocument(uri.to_string()))
    }

    /// The table to answer from, after waiting for in-flight analysis if configured.
    fn settled(&self, document: &Document) -> Arc<AnalysisResult> {
        if let Some(timeout_ms) = self.options.settle_timeout_ms {
            let analyzer = document.analyzer();
            if !analyzer.wait_idle(Duration::from_millis(timeout_ms)) {
                debug!(
                    uri = document.uri(),
                    timeout_ms, "analysis still running; answering with last completed pass"
                );
            }
        }
        document.analyzer().current()
    }

    fn batch_lines(&self) -> usize {
        self.options.partial_batch_lines.max(1)
    }

    /// `textDocument/semanticTokens/full`.
    pub fn semantic_tokens_full(&self, uri: &str) -> Result<SemanticTokens, ServerError> {
        let result = self.settled(&*self.document(uri)?);
        Ok(SemanticTokens {
            result_id: Some(result.version.to_string()),
            data: encode_full(&result.tokens),
        })
    }

    /// `textDocument/semanticTokens/full` with a partial result token: one report per batch
    /// of [`ServerOptions::partial_batch_lines`] lines.
    pub fn semantic_tokens_full_partial(
        &self,
        uri: &str,
    ) -> Result<Vec<SemanticTokensPartialResult>, ServerError> {
        let result = self.settled(&*self.document(uri)?);
        let lines = 0..result.tokens.len();
        Ok(partial_results(encode_batches(
            &result.tokens,
            lines,
            self.batch_lines(),
        )))
    }

    /// `textDocument/semanticTokens/range`. Only the range's line numbers are used; at least
    /// one line is covered.
    pub fn semantic_tokens_range(
        &self,
        uri: &str,
        range: LspRange,
    ) -> Result<SemanticTokens, ServerError> {
        let result = self.settled(&*self.document(uri)?);
        Ok(SemanticTokens {
            result_id: None,
            data: encode_range(
                &result.tokens,
                range.start.line as usize,
                range.end.line as usize,
            ),
        })
    }

    /// `textDocument/semanticTokens/range` with a partial result token.
    pub fn semantic_tokens_range_partial(
        &self,
        uri: &str,
        range: LspRange,
    ) -> Result<Vec<SemanticTokensPartialResult>, ServerError> {
        let result = self.settled(&*self.document(uri)?);
        let lines = range_lines(
            range.start.line as usize,
            range.end.line as usize,
            result.tokens.len(),
        );
        Ok(partial_results(encode_batches(
            &result.tokens,
            lines,
            self.batch_lines(),
        )))
    }

    /// `textDocument/semanticTokens/full/delta`: drain the document's pending patch.
    ///
    /// A patch tagged `v` applies on top of version `v - 1`. If the client already holds `v`
    /// (from a full request) no edits are sent. Any other `previous_result_id` means the
    /// client missed a pass; the patch is still sent and the client is expected to recover
    /// with a full request.
    pub fn semantic_tokens_delta(
        &self,
        uri: &str,
        previous_result_id: &str,
    ) -> Result<SemanticTokensDelta, ServerError> {
        let document = self.document(uri)?;
        self.settled(&document);
        let patch = document.analyzer().take_patch();

        let version = patch.version.to_string();
        if previous_result_id == version {
            return Ok(SemanticTokensDelta {
                result_id: version,
                edits: Vec::new(),
            });
        }

        let base = if patch.is_empty() {
            patch.version
        } else {
            patch.version.saturating_sub(1)
        };
        if previous_result_id != base.to_string() {
            warn!(
                uri,
                previous_result_id,
                expected = base,
                "delta request does not follow the last delivered version"
            );
        }
        Ok(encode_patch(&patch))
    }
}

fn partial_results(batches: Vec<Vec<u32>>) -> Vec<SemanticTokensPartialResult> {
    batches
        .into_iter()
        .map(|data| SemanticTokensPartialResult { data })
        .collect()
}

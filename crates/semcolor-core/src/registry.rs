//! Open documents keyed by URI.
//!
//! Each [`Document`] pairs a [`TextBuffer`] with the [`IncrementalAnalyzer`] subscribed to it.
//! Documents are created lazily on first use and share no state with each other.

use crate::analyzer::{AnalyzerError, AnalyzerOptions, IncrementalAnalyzer};
use crate::text_buffer::TextBuffer;
use crate::tokenizer::LineTokenizer;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// An open document: its text and the analysis that follows it.
#[derive(Debug)]
pub struct Document {
    uri: String,
    buffer: TextBuffer,
    analyzer: IncrementalAnalyzer,
}

impl Document {
    /// Create an empty document whose analyzer is already subscribed to its buffer.
    pub fn open(
        uri: impl Into<String>,
        tokenizer: Arc<dyn LineTokenizer>,
        options: &AnalyzerOptions,
    ) -> Result<Self, AnalyzerError> {
        let mut buffer = TextBuffer::new();
        let analyzer = IncrementalAnalyzer::attach(&mut buffer, tokenizer, options)?;
        Ok(Self {
            uri: uri.into(),
            buffer,
            analyzer,
        })
    }

    /// Document URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The document text.
    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// The analysis of the document text.
    pub fn analyzer(&self) -> &IncrementalAnalyzer {
        &self.analyzer
    }
}

/// All open documents.
pub struct DocumentRegistry {
    tokenizer: Arc<dyn LineTokenizer>,
    options: AnalyzerOptions,
    documents: HashMap<String, Arc<Document>>,
}

impl std::fmt::Debug for DocumentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRegistry")
            .field("document_count", &self.documents.len())
            .field("options", &self.options)
            .finish()
    }
}

impl DocumentRegistry {
    /// Create an empty registry. Every document it opens is analysed with `tokenizer`.
    pub fn new(tokenizer: Arc<dyn LineTokenizer>, options: AnalyzerOptions) -> Self {
        Self {
            tokenizer,
            options,
            documents: HashMap::new(),
        }
    }

    /// Returns the number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if no document is open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up an open document.
    pub fn get(&self, uri: &str) -> Option<Arc<Document>> {
        self.documents.get(uri).cloned()
    }

    /// Look up a document, opening an empty one if `uri` is unknown.
    pub fn get_or_create(&mut self, uri: &str) -> Result<Arc<Document>, AnalyzerError> {
        if let Some(document) = self.documents.get(uri) {
            return Ok(Arc::clone(document));
        }

        let document = Arc::new(Document::open(
            uri,
            Arc::clone(&self.tokenizer),
            &self.options,
        )?);
        debug!(uri, "opened document");
        self.documents.insert(uri.to_string(), Arc::clone(&document));
        Ok(document)
    }

    /// Close a document. Returns `false` if it was not open.
    ///
    /// The document's analysis worker stops once the last handle to it is dropped.
    pub fn remove(&mut self, uri: &str) -> bool {
        let removed = self.documents.remove(uri).is_some();
        if removed {
            debug!(uri, "closed document");
        }
        removed
    }

    /// URIs of all open documents, in no particular order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_buffer::Edit;
    use crate::token::Token;
    use std::time::Duration;

    fn no_tokens(_line: usize, _text: &str) -> Option<Token> {
        None
    }

    #[test]
    fn test_get_or_create_is_lazy_and_stable() {
        let mut registry = DocumentRegistry::new(Arc::new(no_tokens), AnalyzerOptions::default());
        assert!(registry.is_empty());
        assert!(registry.get("file:///a.calc").is_none());

        let a = registry.get_or_create("file:///a.calc").unwrap();
        let again = registry.get_or_create("file:///a.calc").unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(a.uri(), "file:///a.calc");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_uris_lists_open_documents() {
        let mut registry = DocumentRegistry::new(Arc::new(no_tokens), AnalyzerOptions::default());
        registry.get_or_create("file:///b.calc").unwrap();
        registry.get_or_create("file:///a.calc").unwrap();
        registry.get_or_create("file:///c.calc").unwrap();
        registry.remove("file:///c.calc");

        let mut uris: Vec<&str> = registry.uris().collect();
        uris.sort_unstable();
        assert_eq!(uris, vec!["file:///a.calc", "file:///b.calc"]);
    }

    #[test]
    fn test_documents_do_not_share_state() {
        let mut registry = DocumentRegistry::new(Arc::new(no_tokens), AnalyzerOptions::default());
        let a = registry.get_or_create("file:///a.calc").unwrap();
        let b = registry.get_or_create("file:///b.calc").unwrap();

        a.buffer().replace(&[Edit::insert_line(0, "only in a")]).unwrap();
        assert!(a.analyzer().wait_idle(Duration::from_secs(5)));

        assert_eq!(a.buffer().line_count(), 1);
        assert_eq!(b.buffer().line_count(), 0);
        assert_eq!(a.analyzer().version(), 1);
        assert_eq!(b.analyzer().version(), 0);
    }

    #[test]
    fn test_remove_then_reopen_starts_fresh() {
        let mut registry = DocumentRegistry::new(Arc::new(no_tokens), AnalyzerOptions::default());
        let doc = registry.get_or_create("file:///a.calc").unwrap();
        doc.buffer().replace(&[Edit::insert_line(0, "x")]).unwrap();
        drop(doc);

        assert!(registry.remove("file:///a.calc"));
        assert!(!registry.remove("file:///a.calc"));

        let reopened = registry.get_or_create("file:///a.calc").unwrap();
        assert_eq!(reopened.buffer().line_count(), 0);
        assert_eq!(reopened.analyzer().version(), 0);
    }
}

#![warn(missing_docs)]
//! semcolor core - incremental line analysis for semantic colorization
//!
//! # Overview
//!
//! `semcolor-core` keeps a live, versioned model of an open document and re-tokenizes only the
//! lines an edit touches. It knows nothing about the wire protocol; `semcolor-lsp` turns its
//! token tables into LSP semantic tokens.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  DocumentRegistry (uri -> Document)         │  ← Entry point
//! ├─────────────────────────────────────────────┤
//! │  IncrementalAnalyzer (worker + patches)     │  ← Token table
//! ├─────────────────────────────────────────────┤
//! │  LineTokenizer (grammar seam)               │  ← Per-line tokens
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (CAS-committed snapshots)       │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use semcolor_core::{AnalyzerOptions, DocumentRegistry, Edit, Token, TokenKind};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! // Highlight the first '!' of every line.
//! let tokenizer = |line: usize, text: &str| {
//!     text.find('!').map(|at| Token::new(line, at, 1, TokenKind::Match))
//! };
//! let mut registry = DocumentRegistry::new(Arc::new(tokenizer), AnalyzerOptions::default());
//! let doc = registry.get_or_create("file:///demo.txt").unwrap();
//!
//! doc.buffer()
//!     .replace(&[Edit::insert_line(0, "hey!"), Edit::insert_line(1, "quiet")])
//!     .unwrap();
//! assert!(doc.analyzer().wait_idle(Duration::from_secs(5)));
//!
//! let current = doc.analyzer().current();
//! assert_eq!(current.tokens.get(0).map(|t| t.start), Some(3));
//! assert_eq!(current.tokens.get(1), None);
//! ```
//!
//! # Module Description
//!
//! - [`text_buffer`] - snapshots, edits and the lock-free replace loop
//! - [`token`] - tokens and the per-line token table
//! - [`tokenizer`] - the per-line grammar trait
//! - [`analyzer`] - background passes, cancellation and pending patches
//! - [`registry`] - open documents
//! - [`text`] - line splitting

pub mod analyzer;
pub mod registry;
pub mod text;
pub mod text_buffer;
pub mod token;
pub mod tokenizer;

pub use analyzer::{
    AnalysisResult, AnalyzerError, AnalyzerOptions, CancellationFlag, IncrementalAnalyzer,
    PatchEntry, PendingPatch,
};
pub use registry::{Document, DocumentRegistry};
pub use text::split_lines;
pub use text_buffer::{BufferChange, ChangeObserver, Edit, EditError, Snapshot, TextBuffer};
pub use token::{LineTokenTable, Token, TokenKind};
pub use tokenizer::LineTokenizer;

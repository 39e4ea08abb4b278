#![warn(missing_docs)]
//! `semcolor-lsp` - LSP semantic tokens on top of `semcolor-core`.
//!
//! This crate turns the per-line token tables maintained by `semcolor-core` into the
//! `textDocument/semanticTokens/*` wire format: the legend, delta encoding of full, range and
//! partial results, and patch-based delta responses. [`SemanticTokensServer`] ties it together
//! with text synchronization; JSON-RPC framing and dispatch are left to the host.

pub mod encoder;
pub mod legend;
pub mod protocol;
pub mod server;

pub use encoder::{
    RECORD_WIDTH, encode_batches, encode_full, encode_patch, encode_range, encode_tokens,
    range_lines,
};
pub use legend::{SemanticTokenType, SemanticTokensLegend, TOKEN_MODIFIERS, type_id};
pub use protocol::{
    ContentChange, LspPosition, LspRange, SemanticTokens, SemanticTokensDelta, SemanticTokensEdit,
    SemanticTokensPartialResult,
};
pub use server::{SemanticTokensServer, ServerError, ServerOptions};

//! Wire types of the semantic tokens requests.
//!
//! Field names follow the LSP JSON (camelCase). Positions use the `utf-32` position encoding
//! negotiated in the capabilities, so a `character` is a char column.

use serde::{Deserialize, Serialize};

/// LSP position (utf-32 encoding: `character` counts chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspPosition {
    /// Line number (0-based).
    pub line: u32,
    /// Character offset (0-based).
    pub character: u32,
}

impl LspPosition {
    /// Create a position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// LSP range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspRange {
    /// Range start position (inclusive).
    pub start: LspPosition,
    /// Range end position (exclusive).
    pub end: LspPosition,
}

impl LspRange {
    /// Create a range.
    pub fn new(start: LspPosition, end: LspPosition) -> Self {
        Self { start, end }
    }
}

/// One entry of `textDocument/didChange` `contentChanges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// Replaced range.
    pub range: LspRange,
    /// Replacement text.
    pub text: String,
}

/// Response of a full or range request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokens {
    /// Id a later delta request refers to. Absent for range results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    /// Records of `[deltaLine, deltaStart, length, tokenType, tokenModifiers]`.
    pub data: Vec<u32>,
}

/// One progress report of a partial full or range request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticTokensPartialResult {
    /// Records of the batch, relative to the batch's own sentinel.
    pub data: Vec<u32>,
}

/// Splice into a previously delivered `data` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokensEdit {
    /// Index of the first replaced element.
    pub start: u32,
    /// Number of replaced elements.
    pub delete_count: u32,
    /// Inserted elements.
    pub data: Vec<u32>,
}

/// Response of a delta request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokensDelta {
    /// Id of the analysis version the edits lead to.
    pub result_id: String,
    /// Edits, in ascending line order.
    pub edits: Vec<SemanticTokensEdit>,
}

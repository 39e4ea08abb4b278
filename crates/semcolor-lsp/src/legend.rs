//! Semantic token legend.
//!
//! The legend is the ordered list of token type and modifier names a client receives once in
//! the server capabilities. Encoded tokens refer to types by their index in that list.

use semcolor_core::TokenKind;
use serde::{Deserialize, Serialize};

/// Token types of the advertised legend. The discriminant is the index a client sees in
/// `tokenType`; only [`Keyword`](Self::Keyword) and [`String`](Self::String) are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticTokenType {
    /// `namespace`.
    Namespace = 0,
    /// `type`.
    Type = 1,
    /// `class`.
    Class = 2,
    /// `enum`.
    Enum = 3,
    /// `interface`.
    Interface = 4,
    /// `struct`.
    Struct = 5,
    /// `typeParameter`.
    TypeParameter = 6,
    /// `parameter`.
    Parameter = 7,
    /// `variable`.
    Variable = 8,
    /// `property`.
    Property = 9,
    /// `enumMember`.
    EnumMember = 10,
    /// `event`.
    Event = 11,
    /// `function`.
    Function = 12,
    /// `method`.
    Method = 13,
    /// `macro`.
    Macro = 14,
    /// `keyword`: comparisons that hold.
    Keyword = 15,
    /// `modifier`.
    Modifier = 16,
    /// `comment`.
    Comment = 17,
    /// `string`: comparisons that do not hold.
    String = 18,
    /// `number`.
    Number = 19,
    /// `regexp`.
    Regexp = 20,
    /// `operator`.
    Operator = 21,
}

impl SemanticTokenType {
    /// Every type, in legend order.
    pub const ALL: [SemanticTokenType; 22] = [
        Self::Namespace,
        Self::Type,
        Self::Class,
        Self::Enum,
        Self::Interface,
        Self::Struct,
        Self::TypeParameter,
        Self::Parameter,
        Self::Variable,
        Self::Property,
        Self::EnumMember,
        Self::Event,
        Self::Function,
        Self::Method,
        Self::Macro,
        Self::Keyword,
        Self::Modifier,
        Self::Comment,
        Self::String,
        Self::Number,
        Self::Regexp,
        Self::Operator,
    ];

    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Type => "type",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::TypeParameter => "typeParameter",
            Self::Parameter => "parameter",
            Self::Variable => "variable",
            Self::Property => "property",
            Self::EnumMember => "enumMember",
            Self::Event => "event",
            Self::Function => "function",
            Self::Method => "method",
            Self::Macro => "macro",
            Self::Keyword => "keyword",
            Self::Modifier => "modifier",
            Self::Comment => "comment",
            Self::String => "string",
            Self::Number => "number",
            Self::Regexp => "regexp",
            Self::Operator => "operator",
        }
    }

    /// Index of the type in the legend.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Type used to color a token of `kind`.
    pub fn for_kind(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Match => Self::Keyword,
            TokenKind::Mismatch => Self::String,
        }
    }
}

/// Standard LSP semantic token modifiers, in legend (bit) order.
///
/// The grammar never sets a modifier; they are advertised so clients see the full standard
/// legend.
pub const TOKEN_MODIFIERS: [&str; 10] = [
    "declaration",
    "definition",
    "readonly",
    "static",
    "deprecated",
    "abstract",
    "async",
    "modification",
    "documentation",
    "defaultLibrary",
];

/// Legend advertised in `semanticTokensProvider.legend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokensLegend {
    /// Token type names, indexed by `tokenType` in encoded data.
    pub token_types: Vec<String>,
    /// Token modifier names, indexed by bit position in `tokenModifiers`.
    pub token_modifiers: Vec<String>,
}

impl SemanticTokensLegend {
    /// All standard types and modifiers.
    pub fn standard() -> Self {
        Self {
            token_types: SemanticTokenType::ALL
                .iter()
                .map(|ty| ty.as_str().to_string())
                .collect(),
            token_modifiers: TOKEN_MODIFIERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Legend index used for tokens of `kind`.
pub fn type_id(kind: TokenKind) -> u32 {
    SemanticTokenType::for_kind(kind).id()
}

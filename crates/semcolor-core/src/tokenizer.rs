//! The per-line tokenization seam used by the analyzer.
//!
//! Grammars live in their own crates (see `semcolor-grammar`) and plug into
//! [`IncrementalAnalyzer`](crate::IncrementalAnalyzer) through [`LineTokenizer`].

use crate::token::Token;

/// Produces the token of a single line.
///
/// Implementations must be pure with respect to `(line, text)`: the analyzer only
/// re-tokenizes lines whose text changed and reuses earlier results for the rest.
pub trait LineTokenizer: Send + Sync {
    /// Tokenize one line. `None` means the line gets no colorization, including lines the
    /// grammar cannot parse.
    fn tokenize_line(&self, line: usize, text: &str) -> Option<Token>;
}

impl<F> LineTokenizer for F
where
    F: Fn(usize, &str) -> Option<Token> + Send + Sync,
{
    fn tokenize_line(&self, line: usize, text: &str) -> Option<Token> {
        self(line, text)
    }
}

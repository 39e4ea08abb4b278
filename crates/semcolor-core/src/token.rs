//! Line tokens and the per-line token table.

use std::ops::Range;
use std::sync::Arc;

/// Classification of a line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The line's comparison holds.
    Match,
    /// The line's comparison does not hold.
    Mismatch,
}

impl TokenKind {
    /// Every kind, in legend order.
    pub const ALL: [TokenKind; 2] = [TokenKind::Match, TokenKind::Mismatch];

    /// Map a boolean comparison result to a kind.
    pub fn from_outcome(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}

/// A classified span on one line. A line carries at most one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    /// Line index (0-based).
    pub line: usize,
    /// Start column in characters.
    pub start: usize,
    /// Length in characters.
    pub length: usize,
    /// Classification.
    pub kind: TokenKind,
}

impl Token {
    /// Create a token.
    pub fn new(line: usize, start: usize, length: usize, kind: TokenKind) -> Self {
        Self {
            line,
            start,
            length,
            kind,
        }
    }
}

/// Lines per copy-on-write chunk of a [`LineTokenTable`].
const CHUNK_LINES: usize = 256;

/// One slot per document line, each holding the line's token if it has one.
///
/// The table grows when lines are appended and never shrinks. Slots live in shared chunks:
/// cloning a table copies chunk pointers, and a write copies only the chunk it lands in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTokenTable {
    chunks: Vec<Arc<Vec<Option<Token>>>>,
    len: usize,
}

impl LineTokenTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of line slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Token of `line`, if the line exists and has one.
    pub fn get(&self, line: usize) -> Option<&Token> {
        self.chunks
            .get(line / CHUNK_LINES)?
            .get(line % CHUNK_LINES)?
            .as_ref()
    }

    /// All slots in line order.
    pub fn slots(&self) -> impl Iterator<Item = Option<Token>> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter().copied())
    }

    /// Present tokens in line order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.chunks.iter().flat_map(|chunk| chunk.iter().flatten())
    }

    /// Present tokens of `lines` in line order. Lines past the end are ignored.
    pub fn tokens_in(&self, lines: Range<usize>) -> impl Iterator<Item = &Token> {
        let end = lines.end.min(self.len);
        (lines.start..end).filter_map(move |line| self.get(line))
    }

    /// Grow the table to `line_count` slots. Never shrinks.
    pub fn ensure_lines(&mut self, line_count: usize) {
        while self.len < line_count {
            if self.len % CHUNK_LINES == 0 {
                self.chunks.push(Arc::new(Vec::with_capacity(CHUNK_LINES)));
            }
            let Some(last) = self.chunks.last_mut() else {
                return;
            };
            let last = Arc::make_mut(last);
            let added = (CHUNK_LINES - last.len()).min(line_count - self.len);
            last.resize(last.len() + added, None);
            self.len += added;
        }
    }

    /// Store `token` in the slot of `line`, growing the table if needed.
    pub fn set(&mut self, line: usize, token: Option<Token>) {
        self.ensure_lines(line + 1);
        let Some(chunk) = self.chunks.get_mut(line / CHUNK_LINES) else {
            return;
        };
        if chunk.get(line % CHUNK_LINES) == Some(&token) {
            return;
        }
        if let Some(slot) = Arc::make_mut(chunk).get_mut(line % CHUNK_LINES) {
            *slot = token;
        }
    }
}

impl FromIterator<Option<Token>> for LineTokenTable {
    fn from_iter<I: IntoIterator<Item = Option<Token>>>(iter: I) -> Self {
        let mut table = Self::new();
        for (line, token) in iter.into_iter().enumerate() {
            table.set(line, token);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_grows_and_never_shrinks() {
        let mut table = LineTokenTable::new();
        table.set(2, Some(Token::new(2, 0, 3, TokenKind::Match)));
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(2).map(|t| t.kind), Some(TokenKind::Match));

        table.ensure_lines(1);
        assert_eq!(table.len(), 3);
        assert_eq!(table.tokens().count(), 1);
    }

    #[test]
    fn test_clone_shares_untouched_chunks() {
        let mut table = LineTokenTable::new();
        table.ensure_lines(3 * CHUNK_LINES + 10);
        assert_eq!(table.len(), 3 * CHUNK_LINES + 10);
        assert_eq!(table.chunks.len(), 4);

        let base = table.clone();
        let line = CHUNK_LINES + 5;
        table.set(line, Some(Token::new(line, 1, 2, TokenKind::Mismatch)));

        let shared: Vec<bool> = base
            .chunks
            .iter()
            .zip(&table.chunks)
            .map(|(a, b)| Arc::ptr_eq(a, b))
            .collect();
        assert_eq!(shared, vec![true, false, true, true]);
        assert_eq!(base.get(line), None);
        assert_eq!(table.get(line).map(|t| t.start), Some(1));
        assert_eq!(table.tokens_in(line..line + 1).count(), 1);
        assert_eq!(table.tokens_in(0..CHUNK_LINES).count(), 0);
    }

    #[test]
    fn test_equal_contents_compare_equal() {
        let mut grown = LineTokenTable::new();
        grown.ensure_lines(CHUNK_LINES - 1);
        grown.set(CHUNK_LINES + 1, Some(Token::new(CHUNK_LINES + 1, 0, 1, TokenKind::Match)));

        let collected: LineTokenTable = grown.slots().collect();
        assert_eq!(collected, grown);
        assert_eq!(collected.slots().count(), CHUNK_LINES + 2);
    }
}

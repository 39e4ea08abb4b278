//! Versioned, line-structured text buffer.
//!
//! A [`TextBuffer`] holds the current [`Snapshot`] of a document behind an atomically
//! swappable pointer. A replace call builds a new snapshot from the current one (the rope
//! clone shares every untouched node) and publishes it with a compare-and-swap. If another
//! writer committed in between, the whole batch is rebuilt against the newer snapshot.
//!
//! Readers call [`TextBuffer::snapshot`] and keep working on that immutable value while new
//! snapshots are committed.

use crate::text::contains_line_break;
use arc_swap::ArcSwap;
use ropey::Rope;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::trace;

/// One contiguous replacement within a single line.
///
/// Columns and lengths are measured in characters (Unicode scalar values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Target line (0-based).
    pub line: usize,
    /// Column where the replacement starts.
    pub column: usize,
    /// Number of characters removed at `column`.
    pub delete_len: usize,
    /// Text inserted at `column` after the removal. Must not contain line breaks.
    pub inserted_text: String,
}

impl Edit {
    /// Create a replacement edit.
    pub fn new(
        line: usize,
        column: usize,
        delete_len: usize,
        inserted_text: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            delete_len,
            inserted_text: inserted_text.into(),
        }
    }

    /// An edit that appends `text` as a new line when `line` equals the line count.
    pub fn insert_line(line: usize, text: impl Into<String>) -> Self {
        Self::new(line, 0, 0, text)
    }

    /// Returns `true` if this edit neither removes nor inserts anything.
    pub fn is_noop(&self) -> bool {
        self.delete_len == 0 && self.inserted_text.is_empty()
    }
}

/// Reasons a replace batch is rejected. A rejected batch leaves the buffer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The edit addresses a line or column range that does not exist.
    #[error(
        "edit at line {line}, column {column} deleting {delete_len} chars is outside the document"
    )]
    OutOfRange {
        /// Line of the offending edit.
        line: usize,
        /// Column of the offending edit.
        column: usize,
        /// Delete length of the offending edit.
        delete_len: usize,
    },
    /// The inserted text would split the line.
    #[error("edit at line {line} inserts a line break")]
    LineBreak {
        /// Line of the offending edit.
        line: usize,
    },
}

impl EditError {
    fn out_of_range(edit: &Edit) -> Self {
        Self::OutOfRange {
            line: edit.line,
            column: edit.column,
            delete_len: edit.delete_len,
        }
    }
}

/// Immutable document text at one point of the buffer's history.
///
/// Lines are stored in a rope joined by `'\n'`; line count and total length are tracked
/// separately because an empty rope is both "no lines" and "one empty line".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    text: Rope,
    line_count: usize,
    /// Total characters over all lines, newlines excluded.
    len: usize,
    version: u64,
}

impl Snapshot {
    /// An empty snapshot with no lines.
    pub fn empty() -> Self {
        Self {
            text: Rope::new(),
            line_count: 0,
            len: 0,
            version: 0,
        }
    }

    /// Commit sequence number (0 for the initial empty snapshot).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total number of characters over all lines (line breaks excluded).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no line holds any character.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Length of `line` in characters.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        line_bounds(&self.text, self.line_count, line).map(|(start, end)| end - start)
    }

    /// Text of `line`, without a line terminator.
    pub fn line(&self, line: usize) -> Option<String> {
        line_bounds(&self.text, self.line_count, line)
            .map(|(start, end)| self.text.slice(start..end).to_string())
    }

    /// Iterate over all lines in order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.line_count).filter_map(move |line| self.line(line))
    }

    /// Whole document joined with `'\n'`.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Build the snapshot that results from applying `edits`.
    ///
    /// Returns `Ok(None)` when the batch changes nothing.
    fn apply(&self, edits: &[Edit]) -> Result<Option<(Snapshot, BTreeSet<usize>)>, EditError> {
        // Descending start column keeps earlier columns of the same line valid.
        // `sort_by` is stable, so appended lines keep their batch order.
        let mut ordered: Vec<&Edit> = edits.iter().collect();
        ordered.sort_by(|a, b| b.column.cmp(&a.column));

        let mut text = self.text.clone();
        let mut line_count = self.line_count;
        let mut len = self.len;
        let mut changed_lines = BTreeSet::new();

        for edit in ordered {
            if contains_line_break(&edit.inserted_text) {
                return Err(EditError::LineBreak { line: edit.line });
            }
            let inserted_len = edit.inserted_text.chars().count();

            match line_bounds(&text, line_count, edit.line) {
                Some((start, end)) => {
                    let fits = edit
                        .column
                        .checked_add(edit.delete_len)
                        .is_some_and(|edit_end| edit_end <= end - start);
                    if !fits {
                        return Err(EditError::out_of_range(edit));
                    }
                    if edit.is_noop() {
                        continue;
                    }

                    let at = start + edit.column;
                    text.remove(at..at + edit.delete_len);
                    text.insert(at, &edit.inserted_text);
                    len = len - edit.delete_len + inserted_len;
                    changed_lines.insert(edit.line);
                }
                None if edit.line == line_count && edit.column == 0 && edit.delete_len == 0 => {
                    if line_count > 0 {
                        text.insert_char(text.len_chars(), '\n');
                    }
                    text.insert(text.len_chars(), &edit.inserted_text);
                    line_count += 1;
                    len += inserted_len;
                    changed_lines.insert(edit.line);
                }
                None => return Err(EditError::out_of_range(edit)),
            }
        }

        if changed_lines.is_empty() {
            return Ok(None);
        }

        let next = Snapshot {
            text,
            line_count,
            len,
            version: self.version + 1,
        };
        debug_assert_eq!(
            next.len,
            next.text.len_chars() - next.line_count.saturating_sub(1)
        );
        Ok(Some((next, changed_lines)))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Char range of `line` in `text`, terminator excluded.
fn line_bounds(text: &Rope, line_count: usize, line: usize) -> Option<(usize, usize)> {
    if line >= line_count {
        return None;
    }
    let start = text.line_to_char(line);
    let end = if line + 1 < line_count {
        text.line_to_char(line + 1) - 1
    } else {
        text.len_chars()
    };
    Some((start, end))
}

/// Notification sent to observers after a successful replace.
#[derive(Debug, Clone)]
pub struct BufferChange {
    /// The buffer's current snapshot, loaded after the commit.
    pub snapshot: Arc<Snapshot>,
    /// Lines that were modified or appended by the batch.
    pub changed_lines: BTreeSet<usize>,
}

/// Callback invoked for every [`BufferChange`].
pub type ChangeObserver = Box<dyn Fn(&BufferChange) + Send + Sync>;

/// Text of an open document.
///
/// Mutated only through [`TextBuffer::replace`], which is safe to call from several threads
/// at once without external locking.
pub struct TextBuffer {
    snapshot: ArcSwap<Snapshot>,
    observers: Vec<ChangeObserver>,
    /// Serializes deliveries so observers never see an older snapshot after a newer one.
    delivery: Mutex<()>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("TextBuffer")
            .field("version", &snapshot.version())
            .field("line_count", &snapshot.line_count())
            .field("len", &snapshot.len())
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

impl TextBuffer {
    /// Create an empty buffer (no lines).
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            observers: Vec::new(),
            delivery: Mutex::new(()),
        }
    }

    /// Register a change observer.
    ///
    /// Observers run on the thread that called [`TextBuffer::replace`], after the new
    /// snapshot is visible to readers. Deliveries from concurrent writers are serialized,
    /// and each one carries a snapshot at least as new as the previous delivery. An observer
    /// must not call [`TextBuffer::replace`] on the same buffer.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&BufferChange) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Total characters of the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns `true` if the current snapshot holds no characters.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Line count of the current snapshot.
    pub fn line_count(&self) -> usize {
        self.snapshot.load().line_count()
    }

    /// Commit sequence number of the current snapshot.
    pub fn version(&self) -> u64 {
        self.snapshot.load().version()
    }

    /// Text of the current snapshot joined with `'\n'`.
    pub fn text(&self) -> String {
        self.snapshot.load().text()
    }

    /// Apply a batch of edits as one transaction.
    ///
    /// Returns the lines that changed. The batch is validated completely before anything is
    /// committed; on error the buffer is unchanged. A batch that changes nothing commits
    /// nothing and notifies nobody.
    pub fn replace(&self, edits: &[Edit]) -> Result<BTreeSet<usize>, EditError> {
        let mut retries = 0usize;
        loop {
            let current = self.snapshot.load_full();
            let Some((next, changed_lines)) = current.apply(edits)? else {
                return Ok(BTreeSet::new());
            };

            let next = Arc::new(next);
            let previous = self.snapshot.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &current) {
                trace!(
                    version = next.version(),
                    retries,
                    lines = changed_lines.len(),
                    "committed snapshot"
                );
                self.notify(&changed_lines);
                return Ok(changed_lines);
            }

            retries += 1;
            trace!(retries, "snapshot commit raced with another writer; retrying");
        }
    }

    fn notify(&self, changed_lines: &BTreeSet<usize>) {
        if self.observers.is_empty() {
            return;
        }
        // Loading under the lock orders deliveries by commit.
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let change = BufferChange {
            snapshot: self.snapshot.load_full(),
            changed_lines: changed_lines.clone(),
        };
        for observer in &self.observers {
            observer(&change);
        }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

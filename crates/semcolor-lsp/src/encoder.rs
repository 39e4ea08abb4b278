//! Delta encoding of line tokens into LSP semantic token data.
//!
//! Every token becomes a record of [`RECORD_WIDTH`] integers
//! `[deltaLine, deltaStart, length, tokenType, tokenModifiers]`. `deltaLine` is relative to
//! the previously emitted token, `deltaStart` too when both sit on the same line and absolute
//! otherwise. The previous token starts out as the sentinel `(0, 0)`; every independent unit
//! (a whole response, one partial batch, one patch entry) restarts from it.

use crate::legend::type_id;
use crate::protocol::{SemanticTokensDelta, SemanticTokensEdit};
use semcolor_core::{LineTokenTable, PendingPatch, Token};
use std::ops::Range;

/// Integers per encoded token.
pub const RECORD_WIDTH: usize = 5;

/// Clamp a count to the `u32` wire range.
fn wire(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Appends records, tracking the previously emitted token.
struct DeltaWriter {
    data: Vec<u32>,
    prev_line: usize,
    prev_start: usize,
}

impl DeltaWriter {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            prev_line: 0,
            prev_start: 0,
        }
    }

    fn push(&mut self, token: &Token) {
        let delta_line = token.line.saturating_sub(self.prev_line);
        let delta_start = if delta_line == 0 {
            token.start.saturating_sub(self.prev_start)
        } else {
            token.start
        };
        self.data.extend_from_slice(&[
            wire(delta_line),
            wire(delta_start),
            wire(token.length),
            type_id(token.kind),
            0,
        ]);
        self.prev_line = token.line;
        self.prev_start = token.start;
    }

    fn finish(self) -> Vec<u32> {
        self.data
    }
}

/// Encode `tokens` (in line order) from the sentinel.
pub fn encode_tokens<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> Vec<u32> {
    let mut writer = DeltaWriter::new();
    for token in tokens {
        writer.push(token);
    }
    writer.finish()
}

/// Encode every token of the table.
pub fn encode_full(table: &LineTokenTable) -> Vec<u32> {
    encode_tokens(table.tokens())
}

/// Lines covered by a range request for `[start, end)`.
///
/// At least one line is covered (`end` is raised to `start + 1`), and the result is clamped
/// to `line_count`.
pub fn range_lines(start: usize, end: usize, line_count: usize) -> Range<usize> {
    let end = end.max(start.saturating_add(1)).min(line_count);
    start.min(end)..end
}

/// Encode the tokens of lines `[start, max(end, start + 1))`.
pub fn encode_range(table: &LineTokenTable, start: usize, end: usize) -> Vec<u32> {
    encode_tokens(table.tokens_in(range_lines(start, end, table.len())))
}

/// Split `lines` into batches of `lines_per_batch` lines and encode each batch from the
/// sentinel. Batches without a token are skipped.
pub fn encode_batches(
    table: &LineTokenTable,
    lines: Range<usize>,
    lines_per_batch: usize,
) -> Vec<Vec<u32>> {
    let step = lines_per_batch.max(1);
    let end = lines.end.min(table.len());
    (lines.start..end)
        .step_by(step)
        .map(|batch_start| {
            let batch = batch_start..(batch_start + step).min(end);
            encode_tokens(table.tokens_in(batch))
        })
        .filter(|data| !data.is_empty())
        .collect()
}

/// Encode a drained patch as delta edits.
///
/// Each entry splices `[line * 5, line * 5 + replaced * 5)`; its tokens are encoded from the
/// sentinel. The result id is the patch version.
pub fn encode_patch(patch: &PendingPatch) -> SemanticTokensDelta {
    let edits = patch
        .entries
        .iter()
        .map(|entry| SemanticTokensEdit {
            start: wire(entry.line.saturating_mul(RECORD_WIDTH)),
            delete_count: wire(entry.replaced_lines * RECORD_WIDTH),
            data: encode_tokens(&entry.tokens),
        })
        .collect();
    SemanticTokensDelta {
        result_id: patch.version.to_string(),
        edits,
    }
}

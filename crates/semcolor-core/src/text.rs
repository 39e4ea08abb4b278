//! Line splitting helpers.

/// Split `text` into logical lines.
///
/// `"\r\n"`, `"\r"` and `"\n"` all terminate a line. Like `str::split`, a trailing
/// terminator yields a trailing empty line (N terminators => N+1 lines), so an empty text is
/// a single empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }

    lines.push(&text[start..]);
    lines
}

/// Returns `true` if `text` contains a character that would start a new line.
pub(crate) fn contains_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

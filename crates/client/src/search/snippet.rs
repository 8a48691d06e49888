//! Context windows around query matches.

use super::Query;

/// Characters of context kept around a match.
const WINDOW_CHARS: usize = 150;

const ELLIPSIS: &str = "...";

/// About [`WINDOW_CHARS`] characters of `text` centred on the first match.
///
/// Cut ends are marked with `...`. Without a match in `text` the window is
/// taken from the start. Line breaks become spaces.
pub fn snippet(query: &Query, text: &str) -> String {
    let (start, end) = match query.find(text) {
        Some((match_start, match_end)) => {
            let half = WINDOW_CHARS / 2;
            (back(text, match_start, half), forward(text, match_end, half))
        }
        None => (0, forward(text, 0, WINDOW_CHARS)),
    };

    let mut out = String::with_capacity(end - start + 2 * ELLIPSIS.len());
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&text[start..end].replace('\n', " "));
    if end < text.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Byte offset `chars` characters before `from`, or 0.
fn back(text: &str, from: usize, chars: usize) -> usize {
    if chars == 0 {
        return from;
    }
    text[..from].char_indices().rev().nth(chars - 1).map_or(0, |(i, _)| i)
}

/// Byte offset `chars` characters after `from`, or the end.
fn forward(text: &str, from: usize, chars: usize) -> usize {
    text[from..].char_indices().nth(chars).map_or(text.len(), |(i, _)| from + i)
}

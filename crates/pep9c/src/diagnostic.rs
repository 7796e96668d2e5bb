//! Source locations for error reporting.
//!
//! Compilation works on byte offsets (the ranges carried by the AST); the
//! line/column conversion happens once, when an error is rendered for the
//! terminal.

use ruff_text_size::TextRange;

/// A span in the source code (byte offsets).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<TextRange> for Span {
    fn from(range: TextRange) -> Self {
        Self::new(
            range.start().to_u32() as usize,
            range.end().to_u32() as usize,
        )
    }
}

/// Find the 1-indexed line and column for a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

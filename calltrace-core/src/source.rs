//! Mapping syn spans back to byte offsets in the canonical text

use proc_macro2::{LineColumn, Span};

/// Line-start table for one source text.
///
/// syn's spans (with `proc-macro2/span-locations`) carry 1-indexed lines and
/// 0-indexed columns counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex {
            source,
            line_starts,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Convert a line/column pair to a byte offset.
    ///
    /// Columns past the end of the line clamp to the line end; lines past the
    /// end of the text clamp to the text length.
    pub fn offset(&self, at: LineColumn) -> usize {
        let Some(&line_start) = at.line.checked_sub(1).and_then(|l| self.line_starts.get(l))
        else {
            return self.source.len();
        };

        let line_text = self.source[line_start..].lines().next().unwrap_or("");
        line_text
            .char_indices()
            .nth(at.column)
            .map(|(byte_idx, _)| line_start + byte_idx)
            .unwrap_or(line_start + line_text.len())
    }

    pub fn start_of(&self, span: Span) -> usize {
        self.offset(span.start())
    }

    pub fn end_of(&self, span: Span) -> usize {
        self.offset(span.end())
    }
}

/// Human-readable `file:line:col` descriptor, column 1-indexed
pub fn position(unit: &str, span: Span) -> String {
    let start = span.start();
    format!("{}:{}:{}", unit, start.line, start.column + 1)
}
